pub use crate::repository::{FromOutcome, IntoArgument};

use crate::{
    model::EntityMetadataBuilder,
    value::{Float64, Record, Value},
};

// ============================================================================
// ENTITY
// ============================================================================

///
/// Entity
///
/// A type that maps onto one storage record.
///
/// `metadata` is the static replacement for runtime introspection: it
/// returns a descriptor naming every field, its accessors and the way an
/// instance is constructed. The registry calls it once per type.
///

pub trait Entity: Sized + Send + 'static {
    fn metadata() -> EntityMetadataBuilder<Self>;
}

// ============================================================================
// FIELD VALUES
// ============================================================================

///
/// FieldValueKind
///
/// Structural classification of a field's Rust type.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldValueKind {
    /// Scalar stored in a single column.
    Atomic,

    /// Ordered list of values.
    Collection,

    /// Nested record with its own columns.
    Embedded,
}

///
/// FieldValue
///
/// Conversion boundary between Rust field types and `Value`.
///

pub trait FieldValue {
    fn kind() -> FieldValueKind
    where
        Self: Sized,
    {
        FieldValueKind::Atomic
    }

    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>
    where
        Self: Sized;
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for Float64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            _ => f64::from_value(value).and_then(Self::try_new),
        }
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Float64::try_new(*self).map_or(Value::Null, Value::Float)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v.get()),
            Value::Int(v) => Some(*v as Self),
            Value::Uint(v) => Some(*v as Self),
            _ => None,
        }
    }
}

impl FieldValue for Record {
    fn kind() -> FieldValueKind {
        FieldValueKind::Embedded
    }

    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_record().cloned()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> FieldValueKind {
        T::kind()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if matches!(value, Value::Null) {
            return Some(None);
        }

        T::from_value(value).map(Some)
    }
}

impl<T: FieldValue> FieldValue for Box<T> {
    fn kind() -> FieldValueKind {
        T::kind()
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn from_value(value: &Value) -> Option<Self> {
        T::from_value(value).map(Self::new)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn kind() -> FieldValueKind {
        FieldValueKind::Collection
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        let Value::List(items) = value else {
            return None;
        };

        items.iter().map(T::from_value).collect()
    }
}

// impl_field_value
#[macro_export]
macro_rules! impl_field_value {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl FieldValue for $type {
                fn to_value(&self) -> Value {
                    Value::$variant((*self).into())
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => Self::try_from(*v).ok(),
                        Value::Uint(v) => Self::try_from(*v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_field_value!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_accept_either_signedness() {
        assert_eq!(i32::from_value(&Value::Uint(7)), Some(7));
        assert_eq!(u8::from_value(&Value::Int(-1)), None);
        assert_eq!(u64::from_value(&Value::Int(12)), Some(12));
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<String>::from_value(&Value::Null), Some(None));
        assert_eq!(
            Option::<String>::from_value(&Value::from("a")),
            Some(Some("a".to_string()))
        );
        assert_eq!(Option::<String>::from_value(&Value::Int(1)), None);
    }

    #[test]
    fn vec_round_trips_through_list() {
        let tags = vec!["a".to_string(), "b".to_string()];

        assert_eq!(Vec::<String>::from_value(&tags.to_value()), Some(tags));
        assert_eq!(Vec::<String>::kind(), FieldValueKind::Collection);
    }
}
