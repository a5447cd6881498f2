use crate::{error::MappingError, traits::FieldValue, value::Value};
use std::{fmt, sync::Arc};

///
/// ConstructorMetadata
///
/// How instances of an entity come into being when a record is read.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConstructorMetadata {
    /// No-argument constructor; every present column is applied by setter.
    Default,

    /// Constructor taking the listed fields, in order. Columns not bound
    /// to a parameter are applied by setter afterwards.
    Parameterized { parameters: Vec<String> },

    /// Hierarchy root that is only ever read through one of its subtypes.
    Abstract,
}

impl ConstructorMetadata {
    #[must_use]
    pub fn parameters(&self) -> &[String] {
        match self {
            Self::Parameterized { parameters } => parameters,
            Self::Default | Self::Abstract => &[],
        }
    }
}

///
/// InstanceFactory
///

pub(crate) type DefaultFactory<E> = Arc<dyn Fn() -> E + Send + Sync>;
pub(crate) type ParameterizedFactory<E> =
    Arc<dyn Fn(&mut Arguments<'_>) -> Result<E, MappingError> + Send + Sync>;

pub(crate) enum InstanceFactory<E> {
    Default(DefaultFactory<E>),
    Parameterized(ParameterizedFactory<E>),
    Abstract,
}

impl<E> Clone for InstanceFactory<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Default(f) => Self::Default(Arc::clone(f)),
            Self::Parameterized(f) => Self::Parameterized(Arc::clone(f)),
            Self::Abstract => Self::Abstract,
        }
    }
}

impl<E> fmt::Debug for InstanceFactory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(_) => f.write_str("Default"),
            Self::Parameterized(_) => f.write_str("Parameterized"),
            Self::Abstract => f.write_str("Abstract"),
        }
    }
}

///
/// Arguments
///
/// Constructor arguments in declaration order, pulled one at a time with
/// [`Arguments::take`]. An absent column reads as `Null`, so optional
/// parameters simply become `None`.
///

pub struct Arguments<'a> {
    entity: &'static str,
    values: Vec<(&'a str, Option<&'a Value>)>,
    position: usize,
}

impl<'a> Arguments<'a> {
    pub(crate) const fn new(entity: &'static str, values: Vec<(&'a str, Option<&'a Value>)>) -> Self {
        Self {
            entity,
            values,
            position: 0,
        }
    }

    /// Convert the next argument.
    pub fn take<T: FieldValue>(&mut self) -> Result<T, MappingError> {
        let Some(&(column, value)) = self.values.get(self.position) else {
            return Err(MappingError::ConstructorArity {
                entity: self.entity,
                expected: self.values.len(),
                consumed: self.position + 1,
            });
        };
        self.position += 1;

        let value = value.unwrap_or(&crate::value::NULL);
        if let Some(converted) = T::from_value(value) {
            return Ok(converted);
        }

        if value.is_null() {
            Err(MappingError::MissingColumn {
                entity: self.entity,
                column: column.to_string(),
            })
        } else {
            Err(MappingError::Conversion {
                entity: self.entity,
                column: column.to_string(),
                expected: std::any::type_name::<T>(),
                value: value.clone(),
            })
        }
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.values.len() - self.position
    }

    pub(crate) const fn consumed(&self) -> usize {
        self.position
    }

    pub(crate) const fn expected(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_converts_in_order() {
        let name = Value::from("Ana");
        let age = Value::Int(30);
        let mut args = Arguments::new("Person", vec![("name", Some(&name)), ("age", Some(&age))]);

        assert_eq!(args.take::<String>(), Ok("Ana".to_string()));
        assert_eq!(args.take::<u32>(), Ok(30));
        assert_eq!(args.remaining(), 0);
    }

    #[test]
    fn absent_column_is_none_for_options_and_missing_otherwise() {
        let mut args = Arguments::new("Person", vec![("nick", None), ("name", None)]);

        assert_eq!(args.take::<Option<String>>(), Ok(None));
        assert_eq!(
            args.take::<String>(),
            Err(MappingError::MissingColumn {
                entity: "Person",
                column: "name".to_string(),
            })
        );
    }

    #[test]
    fn over_taking_reports_arity() {
        let mut args = Arguments::new("Person", Vec::new());

        assert!(matches!(
            args.take::<String>(),
            Err(MappingError::ConstructorArity { expected: 0, consumed: 1, .. })
        ));
    }

    #[test]
    fn wrong_type_is_a_conversion_error() {
        let age = Value::from("thirty");
        let mut args = Arguments::new("Person", vec![("age", Some(&age))]);

        assert!(matches!(
            args.take::<u32>(),
            Err(MappingError::Conversion { expected: "u32", .. })
        ));
    }
}
