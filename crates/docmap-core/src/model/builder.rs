use crate::{
    config::MappingConfig,
    error::{MappingError, MetadataError},
    model::{
        Arguments, ConstructorMetadata, EntityMetadata, EntityModel, FieldAccessor, FieldKind,
        FieldMapping, HierarchyMetadata, RegistryBuilder, TypeKey,
        constructor::InstanceFactory,
        inheritance::SubtypeBinding,
    },
    traits::{Entity, FieldValue},
};
use std::{any::Any, sync::Arc};

///
/// EntityMetadataBuilder
///
/// Static description of one entity, returned by `Entity::metadata` and
/// consumed once by the registry builder. Definition problems are recorded
/// as they occur and reported when the registry is built.
///
/// ```ignore
/// EntityMetadataBuilder::new("Person")
///     .collection("people")
///     .id("id", |p: &Person| &p.id, |p| &mut p.id)
///     .field("name", |p: &Person| &p.name, |p| &mut p.name)
///     .column("full_name")
///     .default_constructor(Person::default)
/// ```
///

pub struct EntityMetadataBuilder<E> {
    entity_name: &'static str,
    collection: Option<String>,
    fields: Vec<FieldMapping>,
    accessors: Vec<FieldAccessor<E>>,
    constructor: Option<(ConstructorMetadata, InstanceFactory<E>)>,
    discriminator: Option<String>,
    discriminator_column: Option<String>,
    subtypes: Vec<SubtypeBinding<E>>,
    errors: Vec<MetadataError>,
}

impl<E: Entity> EntityMetadataBuilder<E> {
    /// Start a descriptor. The collection defaults to `entity_name`.
    #[must_use]
    pub fn new(entity_name: &'static str) -> Self {
        Self {
            entity_name,
            collection: None,
            fields: Vec::new(),
            accessors: Vec::new(),
            constructor: None,
            discriminator: None,
            discriminator_column: None,
            subtypes: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Map a field. Its kind follows the field type (`Vec` → collection,
    /// embeddable → embedded).
    #[must_use]
    pub fn field<T, G, S>(self, name: &str, get: G, set: S) -> Self
    where
        T: FieldValue + 'static,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        S: Fn(&mut E) -> &mut T + Send + Sync + 'static,
    {
        self.push(FieldMapping::new(name, T::kind().into()), FieldAccessor::new(get, set))
    }

    /// Map the identifier field.
    #[must_use]
    pub fn id<T, G, S>(self, name: &str, get: G, set: S) -> Self
    where
        T: FieldValue + 'static,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        S: Fn(&mut E) -> &mut T + Send + Sync + 'static,
    {
        self.push(FieldMapping::new(name, FieldKind::Id), FieldAccessor::new(get, set))
    }

    /// Storage name of the most recently mapped field.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        match self.fields.last_mut() {
            Some(field) => field.set_column(column),
            None => self.errors.push(MetadataError::DanglingColumn {
                entity: self.entity_name,
                column,
            }),
        }
        self
    }

    #[must_use]
    pub fn default_constructor(mut self, make: impl Fn() -> E + Send + Sync + 'static) -> Self {
        self.constructor = Some((
            ConstructorMetadata::Default,
            InstanceFactory::Default(Arc::new(make)),
        ));
        self
    }

    /// Constructor taking `parameters` (field names) in order. The closure
    /// pulls each argument with [`Arguments::take`].
    #[must_use]
    pub fn constructor(
        mut self,
        parameters: &[&str],
        make: impl Fn(&mut Arguments<'_>) -> Result<E, MappingError> + Send + Sync + 'static,
    ) -> Self {
        let parameters = parameters.iter().map(ToString::to_string).collect();
        self.constructor = Some((
            ConstructorMetadata::Parameterized { parameters },
            InstanceFactory::Parameterized(Arc::new(make)),
        ));
        self
    }

    /// Root that is never instantiated directly.
    #[must_use]
    pub fn abstract_root(mut self) -> Self {
        self.constructor = Some((ConstructorMetadata::Abstract, InstanceFactory::Abstract));
        self
    }

    /// Discriminator value this entity is stored under when it is a
    /// subtype. Defaults to the entity name.
    #[must_use]
    pub fn discriminator(mut self, value: impl Into<String>) -> Self {
        self.discriminator = Some(value.into());
        self
    }

    /// Column holding the discriminator, declared on a hierarchy root.
    /// Defaults to the configured column.
    #[must_use]
    pub fn discriminator_column(mut self, column: impl Into<String>) -> Self {
        self.discriminator_column = Some(column.into());
        self
    }

    /// Declare `S` as a subtype of this root. `wrap` lifts a subtype value
    /// into the root; `project` reverses it.
    #[must_use]
    pub fn subtype<S, W, P>(mut self, wrap: W, project: P) -> Self
    where
        S: Entity,
        W: Fn(S) -> E + Send + Sync + 'static,
        P: Fn(&E) -> Option<&S> + Send + Sync + 'static,
    {
        self.subtypes.push(SubtypeBinding::new(wrap, project));
        self
    }

    fn push(mut self, field: FieldMapping, accessor: FieldAccessor<E>) -> Self {
        self.fields.push(field);
        self.accessors.push(accessor);
        self
    }

    /// Validate the descriptor and turn it into unlinked metadata.
    pub(crate) fn finish(self, config: &MappingConfig) -> Result<PendingMetadata<E>, MetadataError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let root = !self.subtypes.is_empty();
        let (constructor, factory) = match self.constructor {
            Some(pair) => pair,
            None if root => (ConstructorMetadata::Abstract, InstanceFactory::Abstract),
            None => {
                return Err(MetadataError::MissingConstructor {
                    entity: self.entity_name,
                });
            }
        };

        if let Some(unknown) = constructor
            .parameters()
            .iter()
            .find(|p| !self.fields.iter().any(|f| f.name() == p.as_str()))
        {
            return Err(MetadataError::UnknownConstructorField {
                entity: self.entity_name,
                field: unknown.clone(),
            });
        }

        let collection = self
            .collection
            .unwrap_or_else(|| self.entity_name.to_string());
        let mut model = EntityModel::new(
            TypeKey::of::<E>(),
            self.entity_name,
            collection,
            self.fields,
            constructor,
        )?;
        model.set_declared_discriminator(self.discriminator);

        if root {
            model.set_hierarchy(HierarchyMetadata {
                discriminator_column: self
                    .discriminator_column
                    .unwrap_or_else(|| config.discriminator_column.clone()),
                subtypes: Vec::new(),
            });
        }

        Ok(PendingMetadata {
            model,
            accessors: self.accessors.into_iter().map(Some).collect(),
            factory,
            subtypes: self.subtypes,
        })
    }
}

///
/// PendingMetadata
///
/// Metadata that passed local validation and waits for the registry's
/// hierarchy linking pass.
///

pub(crate) struct PendingMetadata<E> {
    model: EntityModel,
    accessors: Vec<Option<FieldAccessor<E>>>,
    factory: InstanceFactory<E>,
    subtypes: Vec<SubtypeBinding<E>>,
}

impl<E: Entity> PendingMetadata<E> {
    pub(crate) fn subtype_registrars(&self) -> Vec<fn(&mut RegistryBuilder)> {
        self.subtypes.iter().map(SubtypeBinding::registrar).collect()
    }
}

///
/// Pending
///
/// Type-erased view the registry builder links and publishes.
///

pub(crate) trait Pending: Send {
    fn model(&self) -> &EntityModel;

    fn model_mut(&mut self) -> &mut EntityModel;

    fn subtype_keys(&self) -> Vec<TypeKey>;

    /// Append a field this entity exposes without an accessor of its own.
    fn push_foreign_field(&mut self, field: FieldMapping);

    fn publish(self: Box<Self>) -> (Arc<EntityModel>, Arc<dyn Any + Send + Sync>);
}

impl<E: Entity> Pending for PendingMetadata<E> {
    fn model(&self) -> &EntityModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut EntityModel {
        &mut self.model
    }

    fn subtype_keys(&self) -> Vec<TypeKey> {
        self.subtypes.iter().map(SubtypeBinding::key).collect()
    }

    fn push_foreign_field(&mut self, field: FieldMapping) {
        self.model.push_field(field);
        self.accessors.push(None);
    }

    fn publish(self: Box<Self>) -> (Arc<EntityModel>, Arc<dyn Any + Send + Sync>) {
        let model = Arc::new(self.model);
        let metadata = EntityMetadata::new(
            Arc::clone(&model),
            self.accessors,
            self.factory,
            self.subtypes,
        );

        (model, Arc::new(metadata))
    }
}
