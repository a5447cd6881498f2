use crate::{
    traits::{FieldValue, FieldValueKind},
    value::Value,
};
use std::{fmt, sync::Arc};

///
/// FieldKind
///
/// Structural role of a mapped field.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldKind {
    Collection,
    Embedded,
    Id,
    Plain,
}

impl From<FieldValueKind> for FieldKind {
    fn from(kind: FieldValueKind) -> Self {
        match kind {
            FieldValueKind::Atomic => Self::Plain,
            FieldValueKind::Collection => Self::Collection,
            FieldValueKind::Embedded => Self::Embedded,
        }
    }
}

///
/// FieldMapping
///
/// One mapped field: its in-memory name and the name the store uses.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FieldMapping {
    name: String,
    column: String,
    kind: FieldKind,
}

impl FieldMapping {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();

        Self {
            column: name.clone(),
            name,
            kind,
        }
    }

    /// Builder-style storage name override.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// In-memory field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage-native name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub const fn is_id(&self) -> bool {
        matches!(self.kind, FieldKind::Id)
    }

    pub(crate) fn set_column(&mut self, column: impl Into<String>) {
        self.column = column.into();
    }
}

///
/// FieldAccessor
///
/// Statically registered getter/setter pair for one field of `E`.
/// Setters report the Rust type they expected when conversion fails.
///

pub(crate) type Getter<E> = Arc<dyn Fn(&E) -> Value + Send + Sync>;
pub(crate) type Setter<E> = Arc<dyn Fn(&mut E, &Value) -> Result<(), &'static str> + Send + Sync>;

pub struct FieldAccessor<E> {
    get: Getter<E>,
    set: Setter<E>,
}

impl<E: 'static> FieldAccessor<E> {
    pub(crate) fn new<T, G, S>(get: G, set: S) -> Self
    where
        T: FieldValue + 'static,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        S: Fn(&mut E) -> &mut T + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(move |entity: &E| get(entity).to_value()),
            set: Arc::new(move |entity: &mut E, value: &Value| {
                let converted = T::from_value(value).ok_or(std::any::type_name::<T>())?;
                *set(entity) = converted;

                Ok(())
            }),
        }
    }

    /// Read the field as a `Value`.
    pub fn get(&self, entity: &E) -> Value {
        (self.get)(entity)
    }

    /// Write a `Value` into the field; `Err` carries the expected type name.
    pub fn set(&self, entity: &mut E, value: &Value) -> Result<(), &'static str> {
        (self.set)(entity, value)
    }
}

impl<E> Clone for FieldAccessor<E> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<E> fmt::Debug for FieldAccessor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldAccessor")
    }
}
