//! Query derivation from method names.
//!
//! Names are read as snake_case words:
//!
//! ```text
//! method    := subject [ by predicate ] [ order by ordering+ ]
//! subject   := find | find all | exists | count | delete
//! predicate := and_part ( or and_part )*
//! and_part  := term ( and term )*
//! term      := field [ not ] [ operator ]
//! ordering  := field [ asc | desc ] [ and ]
//! ```
//!
//! Field names are matched longest first, so a field whose name contains
//! `and` or `or` wins over the combinator reading.

use crate::{
    error::DefinitionReason,
    query::{CompareOp, Direction},
};
use convert_case::{Case, Casing};

/// Operator phrases, longest first within each family.
const OPERATORS: &[(&[&str], CompareOp)] = &[
    (&["greater", "than", "equals"], CompareOp::GreaterEquals),
    (&["greater", "than", "equal"], CompareOp::GreaterEquals),
    (&["less", "than", "equals"], CompareOp::LesserEquals),
    (&["less", "than", "equal"], CompareOp::LesserEquals),
    (&["lesser", "than", "equals"], CompareOp::LesserEquals),
    (&["lesser", "than", "equal"], CompareOp::LesserEquals),
    (&["greater", "equals"], CompareOp::GreaterEquals),
    (&["greater", "than"], CompareOp::GreaterThan),
    (&["lesser", "equals"], CompareOp::LesserEquals),
    (&["less", "than"], CompareOp::LesserThan),
    (&["lesser", "than"], CompareOp::LesserThan),
    (&["equals"], CompareOp::Equals),
    (&["like"], CompareOp::Like),
    (&["in"], CompareOp::In),
    (&["between"], CompareOp::Between),
];

/// Method name in the snake_case form every lookup uses.
pub(crate) fn normalize(name: &str) -> String {
    name.to_case(Case::Snake)
}

///
/// Subject
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Subject {
    Find,
    Exists,
    Count,
    Delete,
}

///
/// Term
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Term {
    pub field: String,
    pub negated: bool,
    pub op: CompareOp,
}

///
/// Derived
///
/// Parsed method name. `predicate` is a disjunction of conjunctions;
/// field names are entity field names, not storage names.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Derived {
    pub subject: Subject,
    pub predicate: Vec<Vec<Term>>,
    pub order: Vec<(String, Direction)>,
}

impl Derived {
    /// Value arguments the predicate consumes.
    pub(crate) fn arity(&self) -> usize {
        self.predicate
            .iter()
            .flatten()
            .map(|term| term.op.arity())
            .sum()
    }
}

pub(crate) fn parse<'a>(
    name: &str,
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<Derived, DefinitionReason> {
    let normalized = normalize(name);
    let words: Vec<&str> = normalized.split('_').filter(|w| !w.is_empty()).collect();

    let mut fields: Vec<(Vec<String>, &str)> = fields
        .into_iter()
        .map(|field| {
            let tokens = normalize(field).split('_').map(str::to_string).collect();
            (tokens, field)
        })
        .collect();
    fields.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    Parser {
        words: &words,
        fields: &fields,
        pos: 0,
    }
    .method()
}

struct Parser<'a> {
    words: &'a [&'a str],
    fields: &'a [(Vec<String>, &'a str)],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn method(mut self) -> Result<Derived, DefinitionReason> {
        let subject = self.subject()?;

        let predicate = if self.eat(&["by"]) {
            if self.at_end() || self.at_order_by() {
                return Err(DefinitionReason::EmptyPredicate);
            }
            self.predicate()?
        } else {
            Vec::new()
        };

        let order = if self.eat(&["order", "by"]) {
            self.orderings()?
        } else {
            Vec::new()
        };

        match self.peek() {
            None => Ok(Derived {
                subject,
                predicate,
                order,
            }),
            Some(_) if predicate.is_empty() && order.is_empty() => {
                Err(DefinitionReason::UnknownShape)
            }
            Some(word) => Err(DefinitionReason::UnexpectedToken {
                token: word.to_string(),
            }),
        }
    }

    fn subject(&mut self) -> Result<Subject, DefinitionReason> {
        let subject = match self.peek() {
            Some("find") => Subject::Find,
            Some("exists") => Subject::Exists,
            Some("count") => Subject::Count,
            Some("delete") => Subject::Delete,
            _ => return Err(DefinitionReason::UnknownShape),
        };
        self.pos += 1;
        if subject == Subject::Find {
            self.eat(&["all"]);
        }

        Ok(subject)
    }

    fn predicate(&mut self) -> Result<Vec<Vec<Term>>, DefinitionReason> {
        let mut parts = vec![self.and_part()?];
        while self.eat(&["or"]) {
            if self.at_end() || self.at_order_by() {
                return Err(DefinitionReason::DanglingCombinator { combinator: "or" });
            }
            parts.push(self.and_part()?);
        }

        Ok(parts)
    }

    fn and_part(&mut self) -> Result<Vec<Term>, DefinitionReason> {
        let mut terms = vec![self.term()?];
        while self.eat(&["and"]) {
            if self.at_end() || self.at_order_by() {
                return Err(DefinitionReason::DanglingCombinator { combinator: "and" });
            }
            terms.push(self.term()?);
        }

        Ok(terms)
    }

    fn term(&mut self) -> Result<Term, DefinitionReason> {
        let field = self.field()?;
        let negated = self.eat(&["not"]);
        let op = OPERATORS
            .iter()
            .find(|(phrase, _)| self.eat(phrase))
            .map_or(CompareOp::Equals, |(_, op)| *op);

        Ok(Term {
            field,
            negated,
            op,
        })
    }

    fn orderings(&mut self) -> Result<Vec<(String, Direction)>, DefinitionReason> {
        if self.at_end() {
            return Err(DefinitionReason::UnknownShape);
        }

        let mut order = Vec::new();
        loop {
            let field = self.field()?;
            let direction = if self.eat(&["desc"]) {
                Direction::Desc
            } else {
                self.eat(&["asc"]);
                Direction::Asc
            };
            order.push((field, direction));

            if self.eat(&["and"]) {
                if self.at_end() {
                    return Err(DefinitionReason::DanglingCombinator { combinator: "and" });
                }
                continue;
            }
            if self.at_end() || self.match_field().is_none() {
                break;
            }
        }

        Ok(order)
    }

    fn field(&mut self) -> Result<String, DefinitionReason> {
        let (len, name) = self
            .match_field()
            .ok_or_else(|| DefinitionReason::UnknownField {
                tokens: self.words[self.pos..].join("_"),
            })?;
        self.pos += len;

        Ok(name.to_string())
    }

    fn match_field(&self) -> Option<(usize, &'a str)> {
        let rest = &self.words[self.pos..];

        self.fields
            .iter()
            .find(|(tokens, _)| {
                tokens.len() <= rest.len() && tokens.iter().zip(rest).all(|(t, w)| t == w)
            })
            .map(|(tokens, name)| (tokens.len(), *name))
    }

    fn eat(&mut self, phrase: &[&str]) -> bool {
        let end = self.pos + phrase.len();
        if end <= self.words.len() && self.words[self.pos..end] == *phrase {
            self.pos = end;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<&str> {
        self.words.get(self.pos).copied()
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.words.len()
    }

    fn at_order_by(&self) -> bool {
        self.words.get(self.pos..self.pos + 2) == Some(&["order", "by"][..])
    }
}
