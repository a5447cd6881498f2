use crate::{
    error::Error,
    mapping::EntityMapper,
    model::{EntityModel, MetadataRegistry},
    page::{CursoredPage, Cursor, Page, PageMode, PageRequest},
    query::{CompareOp, Condition, Direction, Query, Sort, merge_sorts},
    repository::{Argument, Outcome, ParamDescriptor, ParamShape, ReturnShape},
    template::Key,
    traits::Entity,
    value::{Record, Value},
};

///
/// Operand
///
/// Right-hand side of a planned comparison. Parameters are indexes into
/// the call's value arguments, in declaration order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Operand {
    Param(usize),
    Literal(Value),
    /// Inclusive bounds of a BETWEEN.
    Range(Box<Self>, Box<Self>),
    /// Candidates of an IN.
    List(Vec<Self>),
}

impl Operand {
    fn bind(&self, values: &[Value]) -> Value {
        match self {
            Self::Param(index) => values.get(*index).cloned().unwrap_or(Value::Null),
            Self::Literal(value) => value.clone(),
            Self::Range(low, high) => Value::List(vec![low.bind(values), high.bind(values)]),
            Self::List(items) => Value::List(items.iter().map(|item| item.bind(values)).collect()),
        }
    }
}

///
/// ConditionPlan
///
/// Condition tree with unbound operands; bound once per call.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum ConditionPlan {
    Compare {
        column: String,
        op: CompareOp,
        operand: Operand,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl ConditionPlan {
    pub(crate) fn compare(column: impl Into<String>, op: CompareOp, operand: Operand) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            operand,
        }
    }

    pub(crate) fn bind(&self, values: &[Value]) -> Condition {
        match self {
            Self::Compare {
                column,
                op,
                operand,
            } => {
                let mut value = operand.bind(values);
                // a single bound value still means one candidate
                if *op == CompareOp::In && !matches!(value, Value::List(_)) {
                    value = Value::List(vec![value]);
                }

                Condition::compare(column.clone(), *op, value)
            }
            Self::And(parts) => Condition::and(parts.iter().map(|p| p.bind(values)).collect()),
            Self::Or(parts) => Condition::or(parts.iter().map(|p| p.bind(values)).collect()),
            Self::Not(inner) => Condition::not(inner.bind(values)),
        }
    }

    /// AND `other` onto an optional plan.
    pub(crate) fn and_with(base: Option<Self>, other: Self) -> Self {
        match base {
            None => other,
            Some(Self::And(mut parts)) => {
                parts.push(other);
                Self::And(parts)
            }
            Some(base) => Self::And(vec![base, other]),
        }
    }
}

impl From<Condition> for ConditionPlan {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::Compare(comparison) => Self::compare(
                comparison.field,
                comparison.op,
                Operand::Literal(comparison.value),
            ),
            Condition::And(parts) => Self::And(parts.into_iter().map(Self::from).collect()),
            Condition::Or(parts) => Self::Or(parts.into_iter().map(Self::from).collect()),
            Condition::Not(inner) => Self::Not(Box::new(Self::from(*inner))),
        }
    }
}

///
/// QueryPlan
///
/// Everything about a query that is fixed at synthesis. Sorts and the
/// projection are already in storage names.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct QueryPlan {
    pub condition: Option<ConditionPlan>,
    pub sorts: Vec<Sort>,
    pub projection: Vec<String>,
    pub first_result: Option<u64>,
    pub max_result: Option<u64>,
}

impl QueryPlan {
    pub(crate) fn filtered(condition: ConditionPlan) -> Self {
        Self {
            condition: Some(condition),
            ..Self::default()
        }
    }

    pub(crate) fn restrict(&mut self, filter: ConditionPlan) {
        self.condition = Some(ConditionPlan::and_with(self.condition.take(), filter));
    }
}

///
/// Action
///
/// What a method does, decided once per method.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Action {
    Save,
    Delete,
    DeleteById,
    FindById,
    ExistsById,
    Count,
    Select(QueryPlan),
    Exists(QueryPlan),
    CountWhere(QueryPlan),
    DeleteWhere(QueryPlan),
}

impl Action {
    pub(crate) const fn label(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Delete => "delete",
            Self::DeleteById => "delete-by-id",
            Self::FindById => "find-by-id",
            Self::ExistsById => "exists-by-id",
            Self::Count | Self::CountWhere(_) => "count",
            Self::Select(_) => "select",
            Self::Exists(_) => "exists",
            Self::DeleteWhere(_) => "delete-where",
        }
    }
}

///
/// Fetch
///
/// Buffered wrapping of selected rows.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Fetch {
    One,
    Optional,
    List,
    Page,
    CursoredPage,
}

impl Fetch {
    const fn of(shape: ReturnShape) -> Option<Self> {
        match shape {
            ReturnShape::One => Some(Self::One),
            ReturnShape::Optional => Some(Self::Optional),
            ReturnShape::List => Some(Self::List),
            ReturnShape::Page => Some(Self::Page),
            ReturnShape::CursoredPage => Some(Self::CursoredPage),
            _ => None,
        }
    }
}

///
/// MethodPlan
///
/// One synthesized repository method.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MethodPlan {
    pub name: String,
    pub collection: String,
    pub action: Action,
    pub returns: ReturnShape,
    pub params: Vec<ParamDescriptor>,
}

///
/// Operation
///
/// A method plan with this call's arguments bound in.
///

pub(crate) enum Operation<E> {
    Save(E),
    Delete(E),
    DeleteById(Key),
    FindById(Key),
    ExistsById(Key),
    Count,
    Select(Selection),
    Stream(Query),
    Exists(Query),
    CountWhere(Query),
    DeleteWhere(Query),
}

/// Arguments of one call, split by shape.
struct Bound<E> {
    values: Vec<Value>,
    page: Option<PageRequest>,
    sorts: Vec<Sort>,
    entity: Option<E>,
}

impl MethodPlan {
    pub(crate) fn prepare<E: Entity>(
        &self,
        model: &EntityModel,
        args: Vec<Argument>,
    ) -> Result<Operation<E>, Error> {
        let bound = self.split::<E>(model, args)?;

        let operation = match &self.action {
            Action::Save => Operation::Save(self.entity(bound)?),
            Action::Delete => Operation::Delete(self.entity(bound)?),
            Action::DeleteById => Operation::DeleteById(self.key(model, bound)?),
            Action::FindById => Operation::FindById(self.key(model, bound)?),
            Action::ExistsById => Operation::ExistsById(self.key(model, bound)?),
            Action::Count => Operation::Count,
            Action::Select(plan) => self.select(model, plan, bound)?,
            Action::Exists(plan) => Operation::Exists(self.unpaged(plan, &bound)?),
            Action::CountWhere(plan) => Operation::CountWhere(self.unpaged(plan, &bound)?),
            Action::DeleteWhere(plan) => Operation::DeleteWhere(self.unpaged(plan, &bound)?),
        };

        Ok(operation)
    }

    fn split<E: Entity>(&self, model: &EntityModel, args: Vec<Argument>) -> Result<Bound<E>, Error> {
        if args.len() > self.params.len() {
            return Err(Error::argument_mismatch(
                &self.name,
                format!(
                    "expected {} arguments, got {}",
                    self.params.len(),
                    args.len()
                ),
            ));
        }
        if let Some(missing) = self.params.get(args.len()) {
            return Err(Error::NullArgument {
                argument: missing.name.clone(),
            });
        }

        let mut bound = Bound {
            values: Vec::new(),
            page: None,
            sorts: Vec::new(),
            entity: None,
        };
        for (param, arg) in self.params.iter().zip(args) {
            match (param.shape, arg) {
                (ParamShape::Value, Argument::Value(value)) => bound.values.push(value),
                (ParamShape::PageRequest, Argument::Page(request)) => bound.page = Some(request),
                (ParamShape::Sort, Argument::Sort(sorts)) => {
                    merge_sorts(&mut bound.sorts, to_columns(model, &sorts));
                }
                (ParamShape::Entity, Argument::Entity(boxed)) => {
                    let entity = boxed.downcast::<E>().map_err(|_| {
                        Error::argument_mismatch(
                            &self.name,
                            format!(
                                "parameter '{}' expects a {}",
                                param.name,
                                std::any::type_name::<E>()
                            ),
                        )
                    })?;
                    bound.entity = Some(*entity);
                }
                (expected, arg) => {
                    return Err(Error::argument_mismatch(
                        &self.name,
                        format!(
                            "parameter '{}' expects a {expected}, got a {}",
                            param.name,
                            arg.shape()
                        ),
                    ));
                }
            }
        }

        Ok(bound)
    }

    fn entity<E>(&self, bound: Bound<E>) -> Result<E, Error> {
        bound.entity.ok_or_else(|| Error::NullArgument {
            argument: self.param_name(ParamShape::Entity),
        })
    }

    fn key<E>(&self, model: &EntityModel, bound: Bound<E>) -> Result<Key, Error> {
        let id = model.require_id()?;
        match bound.values.into_iter().next() {
            Some(value) if !value.is_null() => Ok(Key::new(id.column(), value)),
            _ => Err(Error::NullArgument {
                argument: self.param_name(ParamShape::Value),
            }),
        }
    }

    fn param_name(&self, shape: ParamShape) -> String {
        self.params
            .iter()
            .find(|p| p.shape == shape)
            .map_or_else(|| self.name.clone(), |p| p.name.clone())
    }

    fn unpaged<E>(&self, plan: &QueryPlan, bound: &Bound<E>) -> Result<Query, Error> {
        let mut sorts = plan.sorts.clone();
        merge_sorts(&mut sorts, bound.sorts.iter().cloned());

        build_query(
            &self.collection,
            plan.condition.as_ref().map(|c| c.bind(&bound.values)),
            sorts,
            &plan.projection,
            plan.first_result,
            plan.max_result,
        )
    }

    fn select<E>(
        &self,
        model: &EntityModel,
        plan: &QueryPlan,
        bound: Bound<E>,
    ) -> Result<Operation<E>, Error> {
        let mut sorts = plan.sorts.clone();
        merge_sorts(&mut sorts, bound.sorts);

        let mut condition = plan.condition.as_ref().map(|c| c.bind(&bound.values));
        let mut first_result = plan.first_result;
        let mut max_result = plan.max_result;
        let mut reverse = false;
        let mut cursor_columns = Vec::new();

        if let Some(request) = &bound.page {
            merge_sorts(&mut sorts, to_columns(model, request.sorts()));
            cursor_columns = sorts.iter().map(|s| s.field.clone()).collect();

            match request.mode() {
                PageMode::Offset { .. } => {
                    first_result = Some(request.skip());
                }
                PageMode::After(cursor) | PageMode::Before(cursor) => {
                    if self.returns == ReturnShape::Page {
                        return Err(Error::invalid_page(
                            "page results do not accept cursor requests",
                        ));
                    }
                    let before = matches!(request.mode(), PageMode::Before(_));
                    if before && self.returns == ReturnShape::Stream {
                        return Err(Error::invalid_page("streams cannot page backwards"));
                    }

                    condition = Some(Condition::and_with(
                        condition,
                        keyset(&sorts, cursor, before)?,
                    ));
                    if before {
                        sorts = sorts.iter().map(Sort::reversed).collect();
                        reverse = true;
                    }
                    first_result = None;
                }
            }
            max_result = Some(request.size());
        }

        if self.returns == ReturnShape::CursoredPage && cursor_columns.is_empty() {
            return Err(Error::invalid_page("cursored pages need at least one sort"));
        }

        let Some(fetch) = Fetch::of(self.returns) else {
            let query = build_query(
                &self.collection,
                condition,
                sorts,
                &plan.projection,
                first_result,
                max_result,
            )?;

            return Ok(Operation::Stream(query));
        };

        // one extra row is enough to detect a non-unique result
        if matches!(fetch, Fetch::One | Fetch::Optional) {
            max_result = Some(max_result.map_or(2, |max| max.min(2)));
        }

        let query = build_query(
            &self.collection,
            condition,
            sorts,
            &plan.projection,
            first_result,
            max_result,
        )?;

        Ok(Operation::Select(Selection {
            query,
            fetch,
            page: bound.page,
            reverse,
            cursor_columns,
        }))
    }
}

///
/// Selection
///
/// A bound select whose rows are buffered before wrapping.
///

pub(crate) struct Selection {
    pub query: Query,
    fetch: Fetch,
    page: Option<PageRequest>,
    reverse: bool,
    cursor_columns: Vec<String>,
}

impl Selection {
    /// Map `records` (store order) and wrap them in the method's shape.
    pub(crate) fn collect<E: Entity, S>(
        self,
        method: &str,
        registry: &MetadataRegistry,
        mut records: Vec<Record>,
    ) -> Result<Outcome<E, S>, Error> {
        if self.reverse {
            records.reverse();
        }
        let mapper = EntityMapper::new(registry);

        match self.fetch {
            Fetch::One | Fetch::Optional if records.len() > 1 => Err(Error::NonUniqueResult {
                method: method.to_string(),
                count: records.len(),
            }),
            Fetch::One => match records.first() {
                Some(record) => Ok(Outcome::One(mapper.from_record(record)?)),
                None => Err(Error::EmptyResult {
                    method: method.to_string(),
                }),
            },
            Fetch::Optional => {
                let entity = records
                    .first()
                    .map(|record| mapper.from_record(record))
                    .transpose()?;

                Ok(Outcome::Optional(entity))
            }
            Fetch::List => Ok(Outcome::List(map_all(&mapper, &records)?)),
            Fetch::Page => {
                let request = self.request()?;

                Ok(Outcome::Page(Page::of(map_all(&mapper, &records)?, request)?))
            }
            Fetch::CursoredPage => {
                let cursors = records
                    .iter()
                    .map(|record| {
                        Cursor::new(
                            self.cursor_columns
                                .iter()
                                .map(|column| record.value(column).clone())
                                .collect(),
                        )
                    })
                    .collect();
                let content = map_all(&mapper, &records)?;
                let request = self.request()?;

                Ok(Outcome::CursoredPage(CursoredPage::of(
                    content, cursors, request,
                )?))
            }
        }
    }

    fn request(&self) -> Result<PageRequest, Error> {
        self.page
            .clone()
            .ok_or_else(|| Error::invalid_page("paged results need a page request"))
    }
}

fn map_all<E: Entity>(mapper: &EntityMapper<'_>, records: &[Record]) -> Result<Vec<E>, Error> {
    records.iter().map(|record| mapper.from_record(record)).collect()
}

/// Translate field-named sorts into storage names.
fn to_columns(model: &EntityModel, sorts: &[Sort]) -> Vec<Sort> {
    sorts
        .iter()
        .map(|sort| Sort::new(model.column_name(&sort.field), sort.direction))
        .collect()
}

///
/// Keyset condition for a cursor over `sorts`:
/// OR over i of (s_1 = c_1 AND .. AND s_{i-1} = c_{i-1} AND s_i CMP c_i),
/// where CMP follows the sort direction, inverted for `before`.
///
/// Nulls sort before every other value, so "after null" means "not null"
/// and nothing sorts before null.
///

pub(crate) fn keyset(sorts: &[Sort], cursor: &Cursor, before: bool) -> Result<Condition, Error> {
    let Some(first) = sorts.first() else {
        return Err(Error::invalid_page("cursor requests need at least one sort"));
    };
    if cursor.len() != sorts.len() {
        return Err(Error::invalid_page(format!(
            "cursor carries {} values for {} sorts",
            cursor.len(),
            sorts.len()
        )));
    }

    let pairs: Vec<(&Sort, &Value)> = sorts.iter().zip(cursor.values()).collect();
    let branches: Vec<Condition> = (0..pairs.len())
        .filter_map(|i| {
            let (sort, value) = pairs[i];
            let greater = (sort.direction == Direction::Asc) != before;
            let beyond = beyond(&sort.field, value, greater)?;

            let mut terms: Vec<Condition> = pairs[..i]
                .iter()
                .map(|(sort, value)| Condition::eq(sort.field.clone(), (*value).clone()))
                .collect();
            terms.push(beyond);

            Some(collapse(terms, Condition::and))
        })
        .collect();

    if branches.is_empty() {
        return Ok(Condition::in_(first.field.clone(), Vec::<Value>::new()));
    }

    Ok(collapse(branches, Condition::or))
}

/// Values strictly past `value` in null-first order; `None` when nothing is.
fn beyond(field: &str, value: &Value, greater: bool) -> Option<Condition> {
    match (value.is_null(), greater) {
        (true, true) => Some(Condition::not(Condition::eq(field, Value::Null))),
        (true, false) => None,
        (false, true) => Some(Condition::gt(field, value.clone())),
        (false, false) => Some(Condition::or(vec![
            Condition::lt(field, value.clone()),
            Condition::eq(field, Value::Null),
        ])),
    }
}

fn collapse(terms: Vec<Condition>, join: fn(Vec<Condition>) -> Condition) -> Condition {
    match <[Condition; 1]>::try_from(terms) {
        Ok([only]) => only,
        Err(terms) => join(terms),
    }
}

fn build_query(
    collection: &str,
    condition: Option<Condition>,
    sorts: Vec<Sort>,
    projection: &[String],
    first_result: Option<u64>,
    max_result: Option<u64>,
) -> Result<Query, Error> {
    let mut builder = Query::select(collection)
        .columns(projection.iter().cloned())
        .sorts(sorts);
    if let Some(condition) = condition {
        builder = builder.filter(condition);
    }
    if let Some(first_result) = first_result {
        builder = builder.skip(first_result);
    }
    if let Some(max_result) = max_result {
        builder = builder.limit(i64::try_from(max_result).unwrap_or(i64::MAX));
    }

    builder.build()
}

/// Record and key of an entity about to be written or deleted.
pub(crate) fn keyed_record<E: Entity>(
    registry: &MetadataRegistry,
    model: &EntityModel,
    entity: &E,
) -> Result<(Record, Key), Error> {
    let id = model.require_id()?;
    let record = EntityMapper::new(registry).to_record(entity)?;
    let key = Key::new(id.column(), record.value(id.column()).clone());

    Ok((record, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyset_single_sort_is_a_plain_comparison() {
        let cursor = Cursor::new(vec![Value::Uint(30)]);

        assert_eq!(
            keyset(&[Sort::asc("age")], &cursor, false).unwrap(),
            Condition::gt("age", 30u64)
        );
        assert_eq!(
            keyset(&[Sort::asc("age")], &cursor, true).unwrap(),
            Condition::or(vec![
                Condition::lt("age", 30u64),
                Condition::eq("age", Value::Null),
            ])
        );
    }

    #[test]
    fn keyset_expands_ties_per_sort() {
        let cursor = Cursor::new(vec![Value::Uint(30), Value::from("Bo")]);
        let sorts = [Sort::asc("age"), Sort::desc("name")];

        assert_eq!(
            keyset(&sorts, &cursor, false).unwrap(),
            Condition::or(vec![
                Condition::gt("age", 30u64),
                Condition::and(vec![
                    Condition::eq("age", 30u64),
                    Condition::or(vec![
                        Condition::lt("name", "Bo"),
                        Condition::eq("name", Value::Null),
                    ]),
                ]),
            ])
        );
    }

    #[test]
    fn keyset_places_nulls_first() {
        let cursor = Cursor::new(vec![Value::Null]);

        assert_eq!(
            keyset(&[Sort::asc("nick")], &cursor, false).unwrap(),
            Condition::not(Condition::eq("nick", Value::Null))
        );
        assert_eq!(
            keyset(&[Sort::asc("nick")], &cursor, true).unwrap(),
            Condition::in_("nick", Vec::<Value>::new())
        );

        let cursor = Cursor::new(vec![Value::Null, Value::Uint(4)]);
        assert_eq!(
            keyset(&[Sort::desc("nick"), Sort::asc("_id")], &cursor, false).unwrap(),
            Condition::and(vec![
                Condition::eq("nick", Value::Null),
                Condition::gt("_id", 4u64),
            ])
        );
    }

    #[test]
    fn keyset_rejects_mismatched_cursors() {
        let cursor = Cursor::new(vec![Value::Uint(30)]);

        assert!(matches!(
            keyset(&[], &cursor, false),
            Err(Error::InvalidPage { .. })
        ));
        assert!(matches!(
            keyset(&[Sort::asc("a"), Sort::asc("b")], &cursor, false),
            Err(Error::InvalidPage { .. })
        ));
    }

    #[test]
    fn in_wraps_a_single_bound_value() {
        let plan = ConditionPlan::compare("age", CompareOp::In, Operand::Param(0));

        assert_eq!(
            plan.bind(&[Value::Uint(3)]),
            Condition::compare("age", CompareOp::In, Value::List(vec![Value::Uint(3)]))
        );
    }

    #[test]
    fn between_binds_two_params_as_bounds() {
        let plan = ConditionPlan::compare(
            "age",
            CompareOp::Between,
            Operand::Range(Box::new(Operand::Param(0)), Box::new(Operand::Param(1))),
        );

        assert_eq!(
            plan.bind(&[Value::Uint(1), Value::Uint(9)]),
            Condition::between("age", 1u64, 9u64)
        );
    }

    #[test]
    fn and_with_extends_an_existing_conjunction() {
        let a = ConditionPlan::compare("a", CompareOp::Equals, Operand::Param(0));
        let b = ConditionPlan::compare("b", CompareOp::Equals, Operand::Param(1));
        let c = ConditionPlan::compare("c", CompareOp::Equals, Operand::Param(2));

        let joined = ConditionPlan::and_with(
            Some(ConditionPlan::And(vec![a.clone(), b.clone()])),
            c.clone(),
        );

        assert_eq!(joined, ConditionPlan::And(vec![a, b, c]));
    }
}
