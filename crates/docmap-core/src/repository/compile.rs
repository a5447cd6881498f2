use crate::{
    error::{DefinitionReason, Error, RepositoryDefinitionError},
    model::EntityModel,
    query::{CompareOp, Sort},
    repository::{
        MethodDescriptor, ParamDescriptor, ParamShape, RepositoryDescriptor, ReturnShape,
        derived::{self, Derived, Subject},
        plan::{Action, ConditionPlan, MethodPlan, Operand, QueryPlan},
        text::{self, TextKind},
    },
};
use std::collections::HashMap;

///
/// DispatchTable
///
/// Every declared method, synthesized once and keyed by its snake_case
/// name so both spellings of a name reach the same plan.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct DispatchTable {
    methods: HashMap<String, MethodPlan>,
}

impl DispatchTable {
    pub(crate) fn compile(
        model: &EntityModel,
        descriptor: &RepositoryDescriptor,
    ) -> Result<Self, RepositoryDefinitionError> {
        let mut methods = HashMap::with_capacity(descriptor.methods.len());
        for method in &descriptor.methods {
            let plan = compile(model, method)
                .map_err(|reason| RepositoryDefinitionError::new(&method.name, reason))?;
            methods.insert(derived::normalize(&method.name), plan);
        }

        Ok(Self { methods })
    }

    pub(crate) fn get(&self, name: &str) -> Result<&MethodPlan, Error> {
        self.methods
            .get(&derived::normalize(name))
            .ok_or_else(|| {
                RepositoryDefinitionError::new(name, DefinitionReason::NotDeclared).into()
            })
    }

    pub(crate) fn len(&self) -> usize {
        self.methods.len()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.values().map(|plan| plan.name.as_str())
    }
}

/// Classify, validate and plan one method.
pub(crate) fn compile(
    model: &EntityModel,
    method: &MethodDescriptor,
) -> Result<MethodPlan, DefinitionReason> {
    let action = match &method.query {
        Some(text) => from_text(model, method, text)?,
        None => match fixed(&derived::normalize(&method.name)) {
            Some(action) => action,
            None => from_name(model, method)?,
        },
    };

    check_returns(&action, method)?;
    check_params(&action, method)?;

    Ok(MethodPlan {
        name: method.name.clone(),
        collection: model.name().to_string(),
        action: restrict_to_subtype(model, action),
        returns: method.returns,
        params: method.params.clone(),
    })
}

fn fixed(name: &str) -> Option<Action> {
    let action = match name {
        "save" => Action::Save,
        "delete" => Action::Delete,
        "delete_by_id" => Action::DeleteById,
        "find_by_id" => Action::FindById,
        "exists_by_id" => Action::ExistsById,
        "count" => Action::Count,
        "find_all" => Action::Select(QueryPlan::default()),
        _ => return None,
    };

    Some(action)
}

fn from_text(
    model: &EntityModel,
    method: &MethodDescriptor,
    text: &str,
) -> Result<Action, DefinitionReason> {
    let query = text::parse(text, model, method)?;

    let action = match (query.kind, method.returns) {
        (TextKind::Delete, _) => Action::DeleteWhere(query.plan),
        (TextKind::Select, ReturnShape::Exists) => Action::Exists(query.plan),
        (TextKind::Select, ReturnShape::Count) => Action::CountWhere(query.plan),
        (TextKind::Select, _) => Action::Select(query.plan),
    };

    Ok(action)
}

fn from_name(model: &EntityModel, method: &MethodDescriptor) -> Result<Action, DefinitionReason> {
    let derived = derived::parse(&method.name, model.field_names())?;

    let found = method.value_params().count();
    if found != derived.arity() {
        return Err(DefinitionReason::ParameterCount {
            expected: derived.arity(),
            found,
        });
    }

    let plan = QueryPlan {
        condition: condition(model, &derived),
        sorts: derived
            .order
            .iter()
            .map(|(field, direction)| Sort::new(model.column_name(field), *direction))
            .collect(),
        ..QueryPlan::default()
    };

    let action = match derived.subject {
        Subject::Find => Action::Select(plan),
        Subject::Exists => Action::Exists(plan),
        Subject::Count => Action::CountWhere(plan),
        Subject::Delete => Action::DeleteWhere(plan),
    };

    Ok(action)
}

/// Condition of a derived name; value parameters bind in token order.
fn condition(model: &EntityModel, derived: &Derived) -> Option<ConditionPlan> {
    let mut next = 0;
    let mut disjuncts: Vec<ConditionPlan> = derived
        .predicate
        .iter()
        .map(|terms| {
            let mut conjuncts: Vec<ConditionPlan> = terms
                .iter()
                .map(|term| {
                    let operand = if term.op == CompareOp::Between {
                        Operand::Range(
                            Box::new(Operand::Param(next)),
                            Box::new(Operand::Param(next + 1)),
                        )
                    } else {
                        Operand::Param(next)
                    };
                    next += term.op.arity();

                    let compare =
                        ConditionPlan::compare(model.column_name(&term.field), term.op, operand);
                    if term.negated {
                        ConditionPlan::Not(Box::new(compare))
                    } else {
                        compare
                    }
                })
                .collect();

            if conjuncts.len() == 1 {
                conjuncts.remove(0)
            } else {
                ConditionPlan::And(conjuncts)
            }
        })
        .collect();

    match disjuncts.len() {
        0 => None,
        1 => Some(disjuncts.remove(0)),
        _ => Some(ConditionPlan::Or(disjuncts)),
    }
}

fn check_returns(action: &Action, method: &MethodDescriptor) -> Result<(), DefinitionReason> {
    let shape = method.returns;
    let valid = match action {
        Action::Save => matches!(shape, ReturnShape::One | ReturnShape::Unit),
        Action::Delete | Action::DeleteById => shape == ReturnShape::Unit,
        Action::FindById => matches!(shape, ReturnShape::One | ReturnShape::Optional),
        Action::ExistsById | Action::Exists(_) => shape == ReturnShape::Exists,
        Action::Count | Action::CountWhere(_) => shape == ReturnShape::Count,
        Action::Select(_) => shape.is_fetch(),
        Action::DeleteWhere(_) => matches!(shape, ReturnShape::Unit | ReturnShape::Count),
    };
    if !valid {
        return Err(DefinitionReason::UnsupportedReturn {
            shape,
            action: action.label(),
        });
    }

    let pages = method
        .params
        .iter()
        .filter(|p| p.shape == ParamShape::PageRequest)
        .count();
    if pages > 1 {
        return Err(DefinitionReason::DuplicatePageRequest);
    }
    if shape.is_paged() && pages == 0 {
        return Err(DefinitionReason::MissingPageRequest { shape });
    }

    Ok(())
}

fn check_params(action: &Action, method: &MethodDescriptor) -> Result<(), DefinitionReason> {
    let params = &method.params;
    let only = |shape: ParamShape, expected: &'static str| {
        if params.len() != 1 {
            return Err(DefinitionReason::ParameterCount {
                expected: 1,
                found: params.len(),
            });
        }
        match params.iter().find(|p| p.shape != shape) {
            Some(param) => Err(DefinitionReason::ParameterShape {
                parameter: param.name.clone(),
                expected,
            }),
            None => Ok(()),
        }
    };

    match action {
        Action::Save | Action::Delete => only(ParamShape::Entity, "entity"),
        Action::DeleteById | Action::FindById | Action::ExistsById => {
            only(ParamShape::Value, "value")
        }
        Action::Count if !params.is_empty() => Err(DefinitionReason::ParameterCount {
            expected: 0,
            found: params.len(),
        }),
        Action::Count => Ok(()),
        Action::Select(_) => reject(params, &[ParamShape::Entity], "value, sort or page request"),
        Action::Exists(_) | Action::CountWhere(_) | Action::DeleteWhere(_) => reject(
            params,
            &[ParamShape::Entity, ParamShape::PageRequest],
            "value or sort",
        ),
    }
}

fn reject(
    params: &[ParamDescriptor],
    shapes: &[ParamShape],
    expected: &'static str,
) -> Result<(), DefinitionReason> {
    match params.iter().find(|p| shapes.contains(&p.shape)) {
        Some(param) => Err(DefinitionReason::ParameterShape {
            parameter: param.name.clone(),
            expected,
        }),
        None => Ok(()),
    }
}

///
/// Subtype repositories only ever see records carrying their
/// discriminator, so every action that reads or deletes by identifier or
/// by count is rewritten into a filtered query.
///

fn restrict_to_subtype(model: &EntityModel, action: Action) -> Action {
    let Some(filter) = model.discriminator_filter().map(ConditionPlan::from) else {
        return action;
    };
    let by_id = || {
        model.id().map(|id| {
            let key = ConditionPlan::compare(id.column(), CompareOp::Equals, Operand::Param(0));
            QueryPlan::filtered(ConditionPlan::And(vec![key, filter.clone()]))
        })
    };

    match action {
        Action::Count => Action::CountWhere(QueryPlan::filtered(filter)),
        Action::DeleteById => by_id().map_or(Action::DeleteById, Action::DeleteWhere),
        Action::FindById => by_id().map_or(Action::FindById, Action::Select),
        Action::ExistsById => by_id().map_or(Action::ExistsById, Action::Exists),
        Action::Select(mut plan) => {
            plan.restrict(filter);
            Action::Select(plan)
        }
        Action::Exists(mut plan) => {
            plan.restrict(filter);
            Action::Exists(plan)
        }
        Action::CountWhere(mut plan) => {
            plan.restrict(filter);
            Action::CountWhere(plan)
        }
        Action::DeleteWhere(mut plan) => {
            plan.restrict(filter);
            Action::DeleteWhere(plan)
        }
        action @ (Action::Save | Action::Delete) => action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::MetadataRegistry,
        test_fixtures::{self, Dog, Person},
    };

    fn plan_for<E: 'static>(
        registry: &MetadataRegistry,
        method: &MethodDescriptor,
    ) -> Result<MethodPlan, DefinitionReason> {
        compile(registry.model::<E>().unwrap(), method)
    }

    #[test]
    fn derived_name_builds_the_condition_in_token_order() {
        let registry = test_fixtures::registry();
        let method = MethodDescriptor::new("findByAgeGreaterThanAndName", ReturnShape::List)
            .param("age", ParamShape::Value)
            .param("name", ParamShape::Value);

        let plan = plan_for::<Person>(&registry, &method).unwrap();

        let Action::Select(query) = plan.action else {
            panic!("expected a select");
        };
        assert_eq!(
            query.condition,
            Some(ConditionPlan::And(vec![
                ConditionPlan::compare("age", CompareOp::GreaterThan, Operand::Param(0)),
                ConditionPlan::compare("full_name", CompareOp::Equals, Operand::Param(1)),
            ]))
        );
    }

    #[test]
    fn order_by_uses_storage_names() {
        let registry = test_fixtures::registry();
        let method = MethodDescriptor::new("find_all_order_by_name_desc", ReturnShape::List);

        let plan = plan_for::<Person>(&registry, &method).unwrap();

        let Action::Select(query) = plan.action else {
            panic!("expected a select");
        };
        assert_eq!(query.sorts, vec![Sort::desc("full_name")]);
    }

    #[test]
    fn subtype_actions_filter_by_discriminator() {
        let registry = test_fixtures::registry();
        let count = MethodDescriptor::new("count", ReturnShape::Count);
        let find = MethodDescriptor::new("findById", ReturnShape::Optional)
            .param("id", ParamShape::Value);

        let plan = plan_for::<Dog>(&registry, &count).unwrap();
        assert_eq!(
            plan.action,
            Action::CountWhere(QueryPlan::filtered(ConditionPlan::compare(
                "kind",
                CompareOp::Equals,
                Operand::Literal("dog".into())
            )))
        );
        assert_eq!(plan.collection, "animals");

        let plan = plan_for::<Dog>(&registry, &find).unwrap();
        assert!(matches!(plan.action, Action::Select(_)));

        let plan = plan_for::<Person>(&registry, &find).unwrap();
        assert_eq!(plan.action, Action::FindById);
    }

    #[test]
    fn return_shapes_are_checked_per_action() {
        let registry = test_fixtures::registry();

        let method = MethodDescriptor::new("count", ReturnShape::List);
        assert_eq!(
            plan_for::<Person>(&registry, &method),
            Err(DefinitionReason::UnsupportedReturn {
                shape: ReturnShape::List,
                action: "count"
            })
        );

        let method = MethodDescriptor::new("find_by_age", ReturnShape::Page)
            .param("age", ParamShape::Value);
        assert_eq!(
            plan_for::<Person>(&registry, &method),
            Err(DefinitionReason::MissingPageRequest {
                shape: ReturnShape::Page
            })
        );

        let method = MethodDescriptor::new("find_all", ReturnShape::Page)
            .param("a", ParamShape::PageRequest)
            .param("b", ParamShape::PageRequest);
        assert_eq!(
            plan_for::<Person>(&registry, &method),
            Err(DefinitionReason::DuplicatePageRequest)
        );
    }

    #[test]
    fn parameters_are_checked_per_action() {
        let registry = test_fixtures::registry();

        let method = MethodDescriptor::new("find_by_age_between", ReturnShape::List)
            .param("low", ParamShape::Value);
        assert_eq!(
            plan_for::<Person>(&registry, &method),
            Err(DefinitionReason::ParameterCount {
                expected: 2,
                found: 1
            })
        );

        let method =
            MethodDescriptor::new("save", ReturnShape::Unit).param("person", ParamShape::Value);
        assert_eq!(
            plan_for::<Person>(&registry, &method),
            Err(DefinitionReason::ParameterShape {
                parameter: "person".to_string(),
                expected: "entity"
            })
        );

        let method = MethodDescriptor::new("count_by_age", ReturnShape::Count)
            .param("age", ParamShape::Value)
            .param("page", ParamShape::PageRequest);
        assert!(matches!(
            plan_for::<Person>(&registry, &method),
            Err(DefinitionReason::ParameterShape { .. })
        ));
    }

    #[test]
    fn query_text_picks_the_action_from_the_return_shape() {
        let registry = test_fixtures::registry();

        let method = MethodDescriptor::new("adults", ReturnShape::Count).query("where age >= 18");
        let plan = plan_for::<Person>(&registry, &method).unwrap();
        assert!(matches!(plan.action, Action::CountWhere(_)));

        let method = MethodDescriptor::new("purge", ReturnShape::Count)
            .query("delete from person where age < 18");
        let plan = plan_for::<Person>(&registry, &method).unwrap();
        assert!(matches!(plan.action, Action::DeleteWhere(_)));
    }

    #[test]
    fn unknown_methods_are_not_declared() {
        let registry = test_fixtures::registry();
        let descriptor = RepositoryDescriptor::new()
            .method(MethodDescriptor::new("findAll", ReturnShape::List));
        let table = DispatchTable::compile(registry.model::<Person>().unwrap(), &descriptor).unwrap();

        assert!(table.get("find_all").is_ok());
        assert!(matches!(
            table.get("findByName"),
            Err(Error::RepositoryDefinition(RepositoryDefinitionError {
                reason: DefinitionReason::NotDeclared,
                ..
            }))
        ));
    }

    #[test]
    fn synthesis_errors_name_the_method() {
        let registry = test_fixtures::registry();
        let descriptor = RepositoryDescriptor::new()
            .method(MethodDescriptor::new("findByShoeSize", ReturnShape::List));

        let err = DispatchTable::compile(registry.model::<Person>().unwrap(), &descriptor)
            .unwrap_err();

        assert_eq!(err.method, "findByShoeSize");
    }
}
