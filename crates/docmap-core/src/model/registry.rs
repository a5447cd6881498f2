use crate::{
    config::MappingConfig,
    error::{Error, MetadataError},
    model::{
        EntityMetadata, EntityModel, FieldMapping, InheritanceMetadata, SubtypeModel, TypeKey,
        builder::Pending,
    },
    traits::Entity,
};
use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::debug;

///
/// MetadataRegistry
///
/// Process-wide, read-only index of entity metadata keyed by type.
/// Built once with [`RegistryBuilder`] and shared behind `Arc`.
///

#[derive(Debug)]
pub struct MetadataRegistry {
    entries: HashMap<TypeId, Entry>,
    config: MappingConfig,
}

#[derive(Debug)]
struct Entry {
    model: Arc<EntityModel>,
    metadata: Arc<dyn Any + Send + Sync>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new(MappingConfig::default())
    }

    #[must_use]
    pub fn builder_with(config: MappingConfig) -> RegistryBuilder {
        RegistryBuilder::new(config)
    }

    /// Typed metadata for `E`.
    pub fn metadata<E: Entity>(&self) -> Result<Arc<EntityMetadata<E>>, Error> {
        let not_found = || Error::MetadataNotFound {
            entity: std::any::type_name::<E>(),
        };
        let entry = self.entries.get(&TypeId::of::<E>()).ok_or_else(not_found)?;

        Arc::clone(&entry.metadata)
            .downcast::<EntityMetadata<E>>()
            .map_err(|_| not_found())
    }

    /// Structural metadata for the type behind `key`.
    pub fn get(&self, key: TypeKey) -> Result<&Arc<EntityModel>, Error> {
        self.entries
            .get(&key.id())
            .map(|entry| &entry.model)
            .ok_or(Error::MetadataNotFound { entity: key.name() })
    }

    pub fn model<E: 'static>(&self) -> Result<&Arc<EntityModel>, Error> {
        self.get(TypeKey::of::<E>())
    }

    #[must_use]
    pub fn contains<E: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<E>())
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<EntityModel>> {
        self.entries.values().map(|entry| &entry.model)
    }

    #[must_use]
    pub const fn config(&self) -> &MappingConfig {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

///
/// RegistryBuilder
///
/// Collects entity descriptors, registering declared subtypes along with
/// their roots, then links hierarchies and publishes the registry.
///

pub struct RegistryBuilder {
    config: MappingConfig,
    pending: Vec<Box<dyn Pending>>,
    seen: HashSet<TypeId>,
    errors: Vec<MetadataError>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new(config: MappingConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            seen: HashSet::new(),
            errors: Vec::new(),
        }
    }

    /// Register `E` and, transitively, every subtype it declares.
    /// Registering a type twice is a no-op.
    #[must_use]
    pub fn register<E: Entity>(mut self) -> Self {
        self.register_in_place::<E>();
        self
    }

    pub(crate) fn register_in_place<E: Entity>(&mut self) {
        if !self.seen.insert(TypeId::of::<E>()) {
            return;
        }

        match E::metadata().finish(&self.config) {
            Ok(pending) => {
                let registrars = pending.subtype_registrars();
                self.pending.push(Box::new(pending));

                for register in registrars {
                    register(self);
                }
            }
            Err(err) => self.errors.push(err),
        }
    }

    /// Link hierarchies and publish.
    ///
    /// Reports the first definition problem found while registering.
    pub fn build(self) -> Result<MetadataRegistry, Error> {
        self.config.validate()?;
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err.into());
        }

        let mut pending = self.pending;
        link_hierarchies(&mut pending)?;

        let entries = pending
            .into_iter()
            .map(|p| {
                let (model, metadata) = p.publish();
                (model.type_key().id(), Entry { model, metadata })
            })
            .collect::<HashMap<_, _>>();

        debug!(entities = entries.len(), "metadata registry built");

        Ok(MetadataRegistry {
            entries,
            config: self.config,
        })
    }
}

/// Give each subtype its root's collection and discriminator column, and
/// give each root the union of its subtypes' fields.
fn link_hierarchies(pending: &mut [Box<dyn Pending>]) -> Result<(), MetadataError> {
    let index = pending
        .iter()
        .enumerate()
        .map(|(i, p)| (p.model().type_key().id(), i))
        .collect::<HashMap<_, _>>();

    for root in 0..pending.len() {
        let Some(hierarchy) = pending[root].model().hierarchy().cloned() else {
            continue;
        };
        let root_key = pending[root].model().type_key();
        let root_name = pending[root].model().entity_name();
        let collection = pending[root].model().name().to_string();

        let mut subtypes: Vec<SubtypeModel> = Vec::new();
        let mut union: Vec<FieldMapping> = Vec::new();

        for key in pending[root].subtype_keys() {
            let Some(&at) = index.get(&key.id()) else {
                continue;
            };
            let sub = &mut pending[at];

            if sub.model().is_hierarchy_root() || sub.model().inheritance().is_some() {
                return Err(MetadataError::NestedHierarchy {
                    entity: root_name,
                    subtype: sub.model().entity_name(),
                });
            }

            let value = sub
                .model()
                .declared_discriminator()
                .unwrap_or_else(|| sub.model().entity_name())
                .to_string();
            if subtypes.iter().any(|s| s.discriminator_value == value) {
                return Err(MetadataError::DuplicateDiscriminator {
                    entity: root_name,
                    value,
                });
            }

            for field in sub.model().fields() {
                if !union
                    .iter()
                    .any(|u| u.name() == field.name() || u.column() == field.column())
                {
                    union.push(field.clone());
                }
            }

            sub.model_mut().set_inheritance(
                InheritanceMetadata {
                    parent: root_key,
                    discriminator_column: hierarchy.discriminator_column.clone(),
                    discriminator_value: value.clone(),
                },
                collection.clone(),
            );
            subtypes.push(SubtypeModel {
                type_key: key,
                discriminator_value: value,
            });
        }

        let entry = &mut pending[root];
        for field in union {
            let model = entry.model();
            if model.field_by_name(field.name()).is_none()
                && model.field_by_column(field.column()).is_none()
            {
                entry.push_foreign_field(field);
            }
        }
        if let Some(hierarchy) = entry.model_mut().hierarchy_mut() {
            hierarchy.subtypes = subtypes;
        }
        entry.model_mut().reindex()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MappingConfig,
        model::FieldKind,
        test_fixtures::{Animal, Book, Cat, Dog, Person},
    };

    #[test]
    fn unregistered_type_is_not_found() {
        let registry = MetadataRegistry::builder()
            .register::<Person>()
            .build()
            .expect("registry builds");

        assert!(matches!(
            registry.metadata::<Book>(),
            Err(Error::MetadataNotFound { .. })
        ));
        assert!(registry.model::<Person>().is_ok());
    }

    #[test]
    fn registering_twice_is_idempotent() {
        let registry = MetadataRegistry::builder()
            .register::<Person>()
            .register::<Person>()
            .build()
            .expect("registry builds");

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn subtypes_register_transitively_and_share_the_root_collection() {
        let registry = MetadataRegistry::builder()
            .register::<Animal>()
            .build()
            .expect("registry builds");

        assert_eq!(registry.len(), 3);

        let dog = registry.model::<Dog>().expect("dog registered");
        let inheritance = dog.inheritance().expect("dog is a subtype");
        assert_eq!(dog.name(), "animals");
        assert_eq!(inheritance.discriminator_column, "kind");
        assert_eq!(inheritance.discriminator_value, "dog");
        assert_eq!(inheritance.parent, TypeKey::of::<Animal>());
        assert!(!dog.has_entity_name());

        let cat = registry.model::<Cat>().expect("cat registered");
        assert_eq!(
            cat.inheritance().map(|i| i.discriminator_value.as_str()),
            Some("Cat")
        );
    }

    #[test]
    fn root_exposes_the_union_of_subtype_fields() {
        let registry = MetadataRegistry::builder()
            .register::<Animal>()
            .build()
            .expect("registry builds");
        let animal = registry.model::<Animal>().expect("animal registered");

        assert!(animal.has_entity_name());
        assert!(animal.is_hierarchy_root());
        assert_eq!(
            animal.field_names().collect::<Vec<_>>(),
            vec!["id", "name", "good_boy", "lives"]
        );
        assert_eq!(animal.id().map(FieldMapping::kind), Some(FieldKind::Id));
        assert_eq!(animal.hierarchy().map(|h| h.subtypes.len()), Some(2));
    }

    #[test]
    fn discriminator_column_defaults_to_config() {
        let config = MappingConfig::default().with_discriminator_column("species");
        let registry = MetadataRegistry::builder_with(config)
            .register::<crate::test_fixtures::Shape>()
            .build()
            .expect("registry builds");
        let circle = registry
            .model::<crate::test_fixtures::Circle>()
            .expect("circle registered");

        assert_eq!(
            circle.inheritance().map(|i| i.discriminator_column.as_str()),
            Some("species")
        );
    }

    #[test]
    fn definition_errors_surface_at_build() {
        let err = MetadataRegistry::builder()
            .register::<crate::test_fixtures::Broken>()
            .build()
            .expect_err("broken entity");

        assert!(matches!(
            err,
            Error::Metadata(MetadataError::UnknownConstructorField { .. })
        ));
    }
}
