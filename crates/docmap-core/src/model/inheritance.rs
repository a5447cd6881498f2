use crate::{
    error::Error,
    mapping::EntityMapper,
    model::{MetadataRegistry, RegistryBuilder, TypeKey},
    traits::Entity,
    value::Record,
};
use std::{fmt, sync::Arc};

///
/// InheritanceMetadata
///
/// Carried by every subtype: where its discriminator lives, what value
/// identifies it, and which root it belongs to.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InheritanceMetadata {
    pub parent: TypeKey,
    pub discriminator_column: String,
    pub discriminator_value: String,
}

///
/// HierarchyMetadata
///
/// Carried by a hierarchy root.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HierarchyMetadata {
    pub discriminator_column: String,
    pub subtypes: Vec<SubtypeModel>,
}

impl HierarchyMetadata {
    #[must_use]
    pub fn subtype_for(&self, discriminator: &str) -> Option<&SubtypeModel> {
        self.subtypes
            .iter()
            .find(|s| s.discriminator_value == discriminator)
    }
}

///
/// SubtypeModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubtypeModel {
    pub type_key: TypeKey,
    pub discriminator_value: String,
}

///
/// SubtypeBinding
///
/// Typed glue between a root `E` and one subtype: project a root value
/// onto the subtype's record, or lift a subtype read back into `E`.
///

type Writer<E> = Arc<dyn Fn(&MetadataRegistry, &E) -> Option<Result<Record, Error>> + Send + Sync>;
type Reader<E> = Arc<dyn Fn(&MetadataRegistry, &Record) -> Result<E, Error> + Send + Sync>;

pub(crate) struct SubtypeBinding<E> {
    key: TypeKey,
    write: Writer<E>,
    read: Reader<E>,
    register: fn(&mut RegistryBuilder),
}

impl<E: Entity> SubtypeBinding<E> {
    pub(crate) fn new<S, W, P>(wrap: W, project: P) -> Self
    where
        S: Entity,
        W: Fn(S) -> E + Send + Sync + 'static,
        P: Fn(&E) -> Option<&S> + Send + Sync + 'static,
    {
        Self {
            key: TypeKey::of::<S>(),
            write: Arc::new(move |registry: &MetadataRegistry, entity: &E| {
                project(entity).map(|sub| EntityMapper::new(registry).to_record(sub))
            }),
            read: Arc::new(move |registry: &MetadataRegistry, record: &Record| {
                EntityMapper::new(registry).from_record::<S>(record).map(&wrap)
            }),
            register: RegistryBuilder::register_in_place::<S>,
        }
    }

    pub(crate) const fn key(&self) -> TypeKey {
        self.key
    }

    pub(crate) const fn registrar(&self) -> fn(&mut RegistryBuilder) {
        self.register
    }

    /// `None` when `entity` is not this subtype.
    pub(crate) fn write(&self, registry: &MetadataRegistry, entity: &E) -> Option<Result<Record, Error>> {
        (self.write)(registry, entity)
    }

    pub(crate) fn read(&self, registry: &MetadataRegistry, record: &Record) -> Result<E, Error> {
        (self.read)(registry, record)
    }
}

impl<E> fmt::Debug for SubtypeBinding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtypeBinding").field("key", &self.key).finish_non_exhaustive()
    }
}
