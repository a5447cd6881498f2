//! Explicit query text attached to a repository method.
//!
//! ```text
//! query      := [ ( select projection | delete ) from ident ]
//!               [ where expr ] [ order by sort ( , sort )* ]
//!               [ skip int ] [ limit int ]
//! projection := * | ident ( , ident )*
//! expr       := and ( or and )*
//! and        := unary ( and unary )*
//! unary      := not unary | ( expr ) | comparison
//! comparison := ident ( = | > | >= | < | <= | like ) operand
//!             | ident between operand and operand
//!             | ident in ( ( operand ( , operand )* ) | operand )
//! operand    := @name | ?index | string | number | true | false | null
//! ```
//!
//! Keywords are case-insensitive. Identifiers are entity field names and
//! are translated to storage names; parameters resolve against the
//! method's value parameters.

use crate::{
    error::DefinitionReason,
    model::EntityModel,
    query::{CompareOp, Direction, Sort},
    repository::{
        MethodDescriptor,
        plan::{ConditionPlan, Operand, QueryPlan},
    },
    value::{Float64, Value},
};
use std::{iter::Peekable, str::CharIndices};

///
/// TextKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TextKind {
    Select,
    Delete,
}

///
/// TextQuery
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct TextQuery {
    pub kind: TextKind,
    pub plan: QueryPlan,
}

pub(crate) fn parse(
    text: &str,
    model: &EntityModel,
    method: &MethodDescriptor,
) -> Result<TextQuery, DefinitionReason> {
    let tokens = Lexer::new(text).tokens()?;

    Parser {
        tokens,
        pos: 0,
        end: text.len(),
        model,
        params: method.value_params().map(|p| p.name.as_str()).collect(),
    }
    .query()
}

fn syntax(position: usize, message: impl Into<String>) -> DefinitionReason {
    DefinitionReason::QuerySyntax {
        position,
        message: message.into(),
    }
}

// ============================================================================
// LEXER
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Named(String),
    Positional(usize),
    Symbol(&'static str),
}

#[derive(Clone, Debug)]
struct Spanned {
    token: Token,
    position: usize,
}

struct Lexer<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    fn tokens(mut self) -> Result<Vec<Spanned>, DefinitionReason> {
        let mut tokens = Vec::new();
        while let Some(&(position, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }

            let token = match c {
                '\'' | '"' => self.string(position, c)?,
                '@' => {
                    self.chars.next();
                    let name = self.word();
                    if name.is_empty() {
                        return Err(syntax(position, "expected a parameter name after '@'"));
                    }
                    Token::Named(name.to_string())
                }
                '?' => {
                    self.chars.next();
                    let digits = self.word();
                    let index = digits
                        .parse()
                        .map_err(|_| syntax(position, "expected a parameter index after '?'"))?;
                    Token::Positional(index)
                }
                '-' | '0'..='9' => self.number(position)?,
                c if c.is_alphabetic() || c == '_' => Token::Ident(self.word().to_string()),
                _ => self.symbol(position, c)?,
            };
            tokens.push(Spanned { token, position });
        }

        Ok(tokens)
    }

    /// Identifier characters from the current position; dots allow
    /// embedded paths.
    fn word(&mut self) -> &'a str {
        let start = self.offset();
        while self
            .chars
            .next_if(|&(_, c)| c.is_alphanumeric() || c == '_' || c == '.')
            .is_some()
        {}

        &self.text[start..self.offset()]
    }

    fn string(&mut self, position: usize, quote: char) -> Result<Token, DefinitionReason> {
        self.chars.next();
        let mut value = String::new();
        loop {
            match self.chars.next() {
                // doubled quote escapes itself
                Some((_, c)) if c == quote => {
                    if self.chars.next_if(|&(_, n)| n == quote).is_some() {
                        value.push(quote);
                    } else {
                        return Ok(Token::Str(value));
                    }
                }
                Some((_, c)) => value.push(c),
                None => return Err(syntax(position, "unterminated string")),
            }
        }
    }

    fn number(&mut self, position: usize) -> Result<Token, DefinitionReason> {
        let start = self.offset();
        self.chars.next_if(|&(_, c)| c == '-');
        while self
            .chars
            .next_if(|&(_, c)| c.is_ascii_digit() || c == '.')
            .is_some()
        {}
        let literal = &self.text[start..self.offset()];

        if literal.contains('.') {
            literal
                .parse()
                .map(Token::Float)
                .map_err(|_| syntax(position, format!("invalid number '{literal}'")))
        } else {
            literal
                .parse()
                .map(Token::Int)
                .map_err(|_| syntax(position, format!("invalid number '{literal}'")))
        }
    }

    fn symbol(&mut self, position: usize, c: char) -> Result<Token, DefinitionReason> {
        self.chars.next();
        let symbol = match c {
            '=' => "=",
            ',' => ",",
            '(' => "(",
            ')' => ")",
            '*' => "*",
            '>' | '<' => {
                let or_equal = self.chars.next_if(|&(_, n)| n == '=').is_some();
                match (c, or_equal) {
                    ('>', true) => ">=",
                    ('>', false) => ">",
                    ('<', true) => "<=",
                    _ => "<",
                }
            }
            other => return Err(syntax(position, format!("unexpected character '{other}'"))),
        };

        Ok(Token::Symbol(symbol))
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.text.len(), |&(i, _)| i)
    }
}

// ============================================================================
// PARSER
// ============================================================================

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    model: &'a EntityModel,
    params: Vec<&'a str>,
}

impl Parser<'_> {
    fn query(mut self) -> Result<TextQuery, DefinitionReason> {
        let mut kind = TextKind::Select;
        let mut plan = QueryPlan::default();

        if self.eat_keyword("select") {
            plan.projection = self.projection()?;
            self.from()?;
        } else if self.eat_keyword("delete") {
            kind = TextKind::Delete;
            self.from()?;
        }

        if self.eat_keyword("where") {
            plan.condition = Some(self.expr()?);
        }
        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            loop {
                plan.sorts.push(self.sort()?);
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }
        if self.eat_keyword("skip") {
            plan.first_result = Some(self.count("skip")?);
        }
        if self.eat_keyword("limit") {
            plan.max_result = Some(self.count("limit")?);
        }

        match self.tokens.get(self.pos) {
            None => Ok(TextQuery { kind, plan }),
            Some(spanned) => Err(syntax(spanned.position, "unexpected trailing input")),
        }
    }

    fn projection(&mut self) -> Result<Vec<String>, DefinitionReason> {
        if self.eat_symbol("*") {
            return Ok(Vec::new());
        }

        let mut columns = vec![self.column()?];
        while self.eat_symbol(",") {
            columns.push(self.column()?);
        }

        Ok(columns)
    }

    fn from(&mut self) -> Result<(), DefinitionReason> {
        self.expect_keyword("from")?;
        let name = self.ident()?;

        let model = self.model;
        if name.eq_ignore_ascii_case(model.entity_name()) || name.eq_ignore_ascii_case(model.name())
        {
            Ok(())
        } else {
            Err(DefinitionReason::EntityMismatch { found: name })
        }
    }

    fn sort(&mut self) -> Result<Sort, DefinitionReason> {
        let column = self.column()?;
        let direction = if self.eat_keyword("desc") {
            Direction::Desc
        } else {
            self.eat_keyword("asc");
            Direction::Asc
        };

        Ok(Sort::new(column, direction))
    }

    fn count(&mut self, clause: &str) -> Result<u64, DefinitionReason> {
        let position = self.position();
        match self.next() {
            Some(Token::Int(n)) => u64::try_from(n)
                .map_err(|_| syntax(position, format!("{clause} must not be negative"))),
            _ => Err(syntax(position, format!("expected a count after '{clause}'"))),
        }
    }

    // expressions

    fn expr(&mut self) -> Result<ConditionPlan, DefinitionReason> {
        let mut parts = vec![self.and()?];
        while self.eat_keyword("or") {
            parts.push(self.and()?);
        }

        Ok(join(parts, ConditionPlan::Or))
    }

    fn and(&mut self) -> Result<ConditionPlan, DefinitionReason> {
        let mut parts = vec![self.unary()?];
        while self.eat_keyword("and") {
            parts.push(self.unary()?);
        }

        Ok(join(parts, ConditionPlan::And))
    }

    fn unary(&mut self) -> Result<ConditionPlan, DefinitionReason> {
        if self.eat_keyword("not") {
            return Ok(ConditionPlan::Not(Box::new(self.unary()?)));
        }
        if self.eat_symbol("(") {
            let inner = self.expr()?;
            self.expect_symbol(")")?;
            return Ok(inner);
        }

        self.comparison()
    }

    fn comparison(&mut self) -> Result<ConditionPlan, DefinitionReason> {
        let column = self.column()?;

        if self.eat_keyword("between") {
            let low = self.operand()?;
            self.expect_keyword("and")?;
            let high = self.operand()?;

            return Ok(ConditionPlan::compare(
                column,
                CompareOp::Between,
                Operand::Range(Box::new(low), Box::new(high)),
            ));
        }
        if self.eat_keyword("in") {
            let operand = if self.eat_symbol("(") {
                let mut items = vec![self.operand()?];
                while self.eat_symbol(",") {
                    items.push(self.operand()?);
                }
                self.expect_symbol(")")?;
                Operand::List(items)
            } else {
                self.operand()?
            };

            return Ok(ConditionPlan::compare(column, CompareOp::In, operand));
        }

        let position = self.position();
        let op = match self.next() {
            Some(Token::Symbol("=")) => CompareOp::Equals,
            Some(Token::Symbol(">")) => CompareOp::GreaterThan,
            Some(Token::Symbol(">=")) => CompareOp::GreaterEquals,
            Some(Token::Symbol("<")) => CompareOp::LesserThan,
            Some(Token::Symbol("<=")) => CompareOp::LesserEquals,
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("like") => CompareOp::Like,
            _ => return Err(syntax(position, "expected a comparison operator")),
        };

        Ok(ConditionPlan::compare(column, op, self.operand()?))
    }

    fn operand(&mut self) -> Result<Operand, DefinitionReason> {
        let position = self.position();
        let operand = match self.next() {
            Some(Token::Named(name)) => {
                let index = self
                    .params
                    .iter()
                    .position(|p| *p == name)
                    .ok_or_else(|| DefinitionReason::UnknownParameter {
                        name: format!("@{name}"),
                    })?;
                Operand::Param(index)
            }
            Some(Token::Positional(n)) => {
                if n == 0 || n > self.params.len() {
                    return Err(DefinitionReason::UnknownParameter {
                        name: format!("?{n}"),
                    });
                }
                Operand::Param(n - 1)
            }
            Some(Token::Str(s)) => Operand::Literal(Value::Text(s)),
            Some(Token::Int(n)) => Operand::Literal(Value::Int(n)),
            Some(Token::Float(f)) => Operand::Literal(
                Float64::try_new(f)
                    .map(Value::Float)
                    .ok_or_else(|| syntax(position, "number is not finite"))?,
            ),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("true") => {
                Operand::Literal(Value::Bool(true))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("false") => {
                Operand::Literal(Value::Bool(false))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("null") => {
                Operand::Literal(Value::Null)
            }
            _ => return Err(syntax(position, "expected a value or parameter")),
        };

        Ok(operand)
    }

    // tokens

    fn column(&mut self) -> Result<String, DefinitionReason> {
        let field = self.ident()?;

        Ok(self.model.column_name(&field).to_string())
    }

    fn ident(&mut self) -> Result<String, DefinitionReason> {
        let position = self.position();
        match self.next() {
            Some(Token::Ident(word)) => Ok(word),
            _ => Err(syntax(position, "expected an identifier")),
        }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        self.pos += 1;
        token
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.position)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some(Spanned {
                token: Token::Ident(word),
                ..
            }) if word.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), DefinitionReason> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(syntax(self.position(), format!("expected '{keyword}'")))
        }
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some(Spanned {
                token: Token::Symbol(s),
                ..
            }) if *s == symbol => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), DefinitionReason> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(syntax(self.position(), format!("expected '{symbol}'")))
        }
    }
}

fn join(parts: Vec<ConditionPlan>, combine: fn(Vec<ConditionPlan>) -> ConditionPlan) -> ConditionPlan {
    match <[ConditionPlan; 1]>::try_from(parts) {
        Ok([only]) => only,
        Err(parts) => combine(parts),
    }
}
