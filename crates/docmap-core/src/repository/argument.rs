use crate::{
    page::PageRequest,
    query::{Order, Sort},
    repository::ParamShape,
    traits::FieldValue,
    value::Value,
};
use std::{any::Any, fmt};

///
/// Argument
///
/// One dynamically passed repository argument.
///

pub enum Argument {
    Value(Value),
    Page(PageRequest),
    Sort(Vec<Sort>),
    Entity(Box<dyn Any + Send>),
}

impl Argument {
    #[must_use]
    pub fn entity<E: Any + Send>(entity: E) -> Self {
        Self::Entity(Box::new(entity))
    }

    #[must_use]
    pub const fn shape(&self) -> ParamShape {
        match self {
            Self::Value(_) => ParamShape::Value,
            Self::Page(_) => ParamShape::PageRequest,
            Self::Sort(_) => ParamShape::Sort,
            Self::Entity(_) => ParamShape::Entity,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Page(request) => f.debug_tuple("Page").field(request).finish(),
            Self::Sort(sorts) => f.debug_tuple("Sort").field(sorts).finish(),
            Self::Entity(_) => f.write_str("Entity(..)"),
        }
    }
}

///
/// IntoArgument
///
/// Conversion of a typed repository parameter into an [`Argument`].
/// `SHAPE` lets typed declarations derive their parameter shapes.
///

pub trait IntoArgument {
    const SHAPE: ParamShape;

    fn into_argument(self) -> Argument;
}

impl<T: FieldValue> IntoArgument for T {
    const SHAPE: ParamShape = ParamShape::Value;

    fn into_argument(self) -> Argument {
        Argument::Value(self.to_value())
    }
}

impl IntoArgument for &str {
    const SHAPE: ParamShape = ParamShape::Value;

    fn into_argument(self) -> Argument {
        Argument::Value(Value::from(self))
    }
}

impl IntoArgument for PageRequest {
    const SHAPE: ParamShape = ParamShape::PageRequest;

    fn into_argument(self) -> Argument {
        Argument::Page(self)
    }
}

impl IntoArgument for Sort {
    const SHAPE: ParamShape = ParamShape::Sort;

    fn into_argument(self) -> Argument {
        Argument::Sort(vec![self])
    }
}

impl IntoArgument for Order {
    const SHAPE: ParamShape = ParamShape::Sort;

    fn into_argument(self) -> Argument {
        Argument::Sort(self.0)
    }
}
