//! Entity metadata: what is mapped, under which names, and how instances
//! are built. Descriptors come from `Entity::metadata`; the registry links
//! and publishes them.

mod builder;
mod constructor;
mod entity;
mod field;
mod inheritance;
mod registry;

pub use builder::EntityMetadataBuilder;
pub use constructor::{Arguments, ConstructorMetadata};
pub use entity::{EntityMetadata, EntityModel, TypeKey};
pub use field::{FieldAccessor, FieldKind, FieldMapping};
pub use inheritance::{HierarchyMetadata, InheritanceMetadata, SubtypeModel};
pub use registry::{MetadataRegistry, RegistryBuilder};

pub(crate) use constructor::InstanceFactory;
