use std::fmt;

///
/// ParamShape
///
/// What kind of argument a repository method parameter receives.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParamShape {
    /// Bound into the query condition.
    Value,
    /// Folded into paging and sorting.
    PageRequest,
    /// Appended to the sort list.
    Sort,
    /// A whole entity (`save`, `delete`).
    Entity,
}

impl ParamShape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::PageRequest => "page request",
            Self::Sort => "sort",
            Self::Entity => "entity",
        }
    }
}

impl fmt::Display for ParamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// ReturnShape
///
/// How a method's result is wrapped. Fixed per method at synthesis.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReturnShape {
    Unit,
    One,
    Optional,
    List,
    Page,
    CursoredPage,
    Stream,
    Exists,
    Count,
}

impl ReturnShape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::One => "single",
            Self::Optional => "optional",
            Self::List => "list",
            Self::Page => "page",
            Self::CursoredPage => "cursored page",
            Self::Stream => "stream",
            Self::Exists => "existence",
            Self::Count => "count",
        }
    }

    /// Shapes that yield entities from a select.
    #[must_use]
    pub const fn is_fetch(self) -> bool {
        matches!(
            self,
            Self::One | Self::Optional | Self::List | Self::Page | Self::CursoredPage | Self::Stream
        )
    }

    #[must_use]
    pub const fn is_paged(self) -> bool {
        matches!(self, Self::Page | Self::CursoredPage)
    }
}

impl fmt::Display for ReturnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// ParamDescriptor
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub shape: ParamShape,
}

///
/// MethodDescriptor
///
/// Static declaration of one repository method: its name, parameters,
/// return shape and, optionally, an explicit query text.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<ParamDescriptor>,
    pub returns: ReturnShape,
    pub query: Option<String>,
}

impl MethodDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, returns: ReturnShape) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns,
            query: None,
        }
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, shape: ParamShape) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            shape,
        });
        self
    }

    #[must_use]
    pub fn query(mut self, text: impl Into<String>) -> Self {
        self.query = Some(text.into());
        self
    }

    /// Parameters bound into conditions, in declaration order.
    pub fn value_params(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.params.iter().filter(|p| p.shape == ParamShape::Value)
    }
}

///
/// RepositoryDescriptor
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RepositoryDescriptor {
    pub methods: Vec<MethodDescriptor>,
}

impl RepositoryDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}
