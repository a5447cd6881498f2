use crate::value::Value;
use std::cmp::Ordering;

///
/// Ordering between values of comparable families.
///
/// Numbers compare across `Int`, `Uint` and `Float`; text, bools and blobs
/// compare within their own family. Everything else is incomparable.
///

impl Value {
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Uint(a), Self::Uint(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Uint(b)) => Some(compare_int_uint(*a, *b)),
            (Self::Uint(a), Self::Int(b)) => Some(compare_int_uint(*b, *a).reverse()),
            (Self::Float(a), Self::Float(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Blob(a), Self::Blob(b)) => Some(a.cmp(b)),
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            _ => self.as_f64().zip(other.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        }
    }

    /// Equality that lets numeric families meet; falls back to structural.
    #[must_use]
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match self.compare(other) {
            Some(ordering) => ordering == Ordering::Equal,
            None => self == other,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Uint(n) => Some(*n as f64),
            Self::Float(f) => Some(f.get()),
            _ => None,
        }
    }
}

fn compare_int_uint(a: i64, b: u64) -> Ordering {
    u64::try_from(a).map_or(Ordering::Less, |a| a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use crate::value::{Float64, Value};
    use std::cmp::Ordering;

    #[test]
    fn numbers_compare_across_families() {
        assert_eq!(Value::Int(-1).compare(&Value::Uint(0)), Some(Ordering::Less));
        assert_eq!(Value::Uint(5).compare(&Value::Int(5)), Some(Ordering::Equal));

        let half = Value::Float(Float64::try_new(0.5).expect("finite"));
        assert_eq!(Value::Int(1).compare(&half), Some(Ordering::Greater));
    }

    #[test]
    fn mixed_families_are_incomparable() {
        assert_eq!(Value::from("1").compare(&Value::Int(1)), None);
        assert!(!Value::from("1").loosely_equals(&Value::Int(1)));
    }
}
