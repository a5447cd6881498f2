//! Core runtime for docmap: entity metadata, the store-agnostic query
//! model, pagination, entity ↔ record mapping, template contracts and the
//! repository dispatcher, plus the ergonomics exported via the `prelude`.

#[macro_use]
mod macros;

// public exports are one module level down
pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod page;
pub mod query;
pub mod repository;
pub mod template;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::{BoxError, Error};

///
/// Prelude
///
/// Vocabulary for declaring entities and repositories and for building
/// queries by hand. Templates and errors stay one import away.
///

pub mod prelude {
    pub use crate::{
        model::{EntityMetadataBuilder, MetadataRegistry},
        page::{Cursor, CursoredPage, Page, PageRequest},
        query::{Condition, Direction, Order, Query, Sort},
        repository::{AsyncRepository, FromOutcome as _, IntoArgument as _, Repository},
        traits::{Entity, FieldValue},
        value::{Record, Value},
    };
}
