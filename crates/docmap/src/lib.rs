//! ## Crate layout
//! - `core`: metadata model, query model, pagination, mapping, templates
//!   and the repository dispatcher.
//! - `Entity` / `Embeddable`: derives that describe mapped types.
//! - `repository!`: declares a typed repository from a method list.
//!
//! The `prelude` covers what application code declaring entities and
//! repositories usually needs.

pub use docmap_core as core;
pub use docmap_derive::{Embeddable, Entity};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Macros
//

pub use docmap_core::{BoxError, Error, repository};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        model::MetadataRegistry,
        page::{Cursor, CursoredPage, Page, PageRequest},
        query::{Condition, Direction, Order, Query, Sort},
        repository::{AsyncEntityStream, AsyncRepository, EntityStream, Repository},
        template::{AsyncTemplate, Key, Template, memory::MemoryTemplate},
        traits::{Entity, FieldValue as _},
        value::{Record, Value},
    };
    pub use crate::{Embeddable, Entity, repository};
}
