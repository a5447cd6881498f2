use crate::{config::ConfigError, repository::ReturnShape, value::Value};
use thiserror::Error as ThisError;

///
/// BoxError
///
/// Failure type handed back by template collaborators. It is passed through
/// unmodified by every layer of this crate.
///

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

///
/// Error
///
/// Every failure surfaced by metadata lookup, query construction, paging and
/// repository dispatch. None of them are retried at this layer.
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("argument mismatch in '{method}': {reason}")]
    ArgumentMismatch { method: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("'{method}' expected exactly one result, found none")]
    EmptyResult { method: String },

    #[error("entity '{entity}' has no identifier field")]
    IdNotFound { entity: &'static str },

    #[error("invalid page request: {reason}")]
    InvalidPage { reason: String },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("no metadata registered for entity '{entity}'")]
    MetadataNotFound { entity: &'static str },

    #[error("'{method}' expected at most one result, found {count} or more")]
    NonUniqueResult { method: String, count: usize },

    #[error("required argument '{argument}' is missing")]
    NullArgument { argument: String },

    #[error("outcome mismatch: expected {expected}, found {found}")]
    OutcomeMismatch {
        expected: ReturnShape,
        found: ReturnShape,
    },

    #[error(transparent)]
    RepositoryDefinition(#[from] RepositoryDefinitionError),

    #[error(transparent)]
    Template(#[from] BoxError),

    #[error("{capability} is not supported: pages are served without a count query")]
    UnsupportedCapability { capability: &'static str },
}

impl Error {
    pub(crate) fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_page(reason: impl Into<String>) -> Self {
        Self::InvalidPage {
            reason: reason.into(),
        }
    }

    pub(crate) fn argument_mismatch(method: &str, reason: impl Into<String>) -> Self {
        Self::ArgumentMismatch {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) const fn unsupported(capability: &'static str) -> Self {
        Self::UnsupportedCapability { capability }
    }
}

///
/// MetadataError
///
/// Definition problems detected while an entity descriptor is turned into
/// published metadata.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MetadataError {
    #[error("column override '{column}' on '{entity}' has no preceding field")]
    DanglingColumn {
        entity: &'static str,
        column: String,
    },

    #[error("entity '{entity}' maps column '{column}' more than once")]
    DuplicateColumn {
        entity: &'static str,
        column: String,
    },

    #[error("subtypes of '{entity}' share discriminator value '{value}'")]
    DuplicateDiscriminator { entity: &'static str, value: String },

    #[error("entity '{entity}' declares field '{field}' more than once")]
    DuplicateField { entity: &'static str, field: String },

    #[error("entity '{entity}' has an empty collection name")]
    EmptyCollection { entity: &'static str },

    #[error("entity '{entity}' declares no constructor")]
    MissingConstructor { entity: &'static str },

    #[error("entity '{entity}' declares more than one identifier ('{first}', '{second}')")]
    MultipleIds {
        entity: &'static str,
        first: String,
        second: String,
    },

    #[error("subtype '{subtype}' of '{entity}' declares subtypes of its own")]
    NestedHierarchy {
        entity: &'static str,
        subtype: &'static str,
    },

    #[error("constructor of '{entity}' binds unknown field '{field}'")]
    UnknownConstructorField { entity: &'static str, field: String },
}

///
/// MappingError
///
/// Failures converting between an entity instance and a storage record.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MappingError {
    #[error("constructor of '{entity}' expects {expected} arguments, {consumed} were consumed")]
    ConstructorArity {
        entity: &'static str,
        expected: usize,
        consumed: usize,
    },

    #[error("column '{column}' of '{entity}' cannot be read as {expected}: {value:?}")]
    Conversion {
        entity: &'static str,
        column: String,
        expected: &'static str,
        value: Value,
    },

    #[error("column '{column}' of '{entity}' is missing from the record")]
    MissingColumn {
        entity: &'static str,
        column: String,
    },

    #[error("record for '{entity}' has no discriminator column '{column}'")]
    MissingDiscriminator {
        entity: &'static str,
        column: String,
    },

    #[error("embedded value for '{entity}' is not a record: {value:?}")]
    NotARecord { entity: &'static str, value: Value },

    #[error("record for '{entity}' carries unmapped column '{column}'")]
    UnknownColumn {
        entity: &'static str,
        column: String,
    },

    #[error("'{value}' is not a discriminator known to '{entity}'")]
    UnknownDiscriminator { entity: &'static str, value: String },

    #[error("value of '{entity}' matches none of its registered subtypes")]
    UnmappedSubtype { entity: &'static str },
}

///
/// RepositoryDefinitionError
///
/// Raised while a repository is synthesized, before any call reaches the
/// offending method.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("repository method '{method}' cannot be synthesized: {reason}")]
pub struct RepositoryDefinitionError {
    pub method: String,
    pub reason: DefinitionReason,
}

impl RepositoryDefinitionError {
    #[must_use]
    pub fn new(method: impl Into<String>, reason: DefinitionReason) -> Self {
        Self {
            method: method.into(),
            reason,
        }
    }
}

///
/// DefinitionReason
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DefinitionReason {
    #[error("a '{combinator}' is not followed by a condition")]
    DanglingCombinator { combinator: &'static str },

    #[error("more than one page request parameter")]
    DuplicatePageRequest,

    #[error("the predicate after 'by' is empty")]
    EmptyPredicate,

    #[error("query names entity '{found}'")]
    EntityMismatch { found: String },

    #[error("{shape} results require a page request parameter")]
    MissingPageRequest { shape: ReturnShape },

    #[error("the method was never declared on this repository")]
    NotDeclared,

    #[error("expected {expected} bound parameters, the method declares {found}")]
    ParameterCount { expected: usize, found: usize },

    #[error("parameter '{parameter}' must be a {expected}")]
    ParameterShape {
        parameter: String,
        expected: &'static str,
    },

    #[error("query text error at {position}: {message}")]
    QuerySyntax { position: usize, message: String },

    #[error("unexpected '{token}' after a condition")]
    UnexpectedToken { token: String },

    #[error("'{tokens}' does not start with a mapped field")]
    UnknownField { tokens: String },

    #[error("query text refers to unknown parameter '{name}'")]
    UnknownParameter { name: String },

    #[error("the name matches no known method shape")]
    UnknownShape,

    #[error("{shape} is not a valid result for a {action} method")]
    UnsupportedReturn {
        shape: ReturnShape,
        action: &'static str,
    },
}
