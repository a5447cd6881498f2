use crate::{
    error::{Error, MetadataError},
    model::{
        ConstructorMetadata, FieldAccessor, FieldMapping, HierarchyMetadata, InheritanceMetadata,
        constructor::InstanceFactory, inheritance::SubtypeBinding,
    },
    query::Condition,
};
use std::{
    any::TypeId,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::Arc,
};

///
/// TypeKey
///
/// Identity of a mapped Rust type. Equality and hashing use the `TypeId`
/// only; the name is kept for diagnostics.
///

#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

///
/// EntityModel
///
/// Structural metadata for one mapped type, independent of the Rust type
/// itself. Built once by the registry and shared read-only.
///
/// Field order is declaration order. Every field appears exactly once in
/// both lookup indices.
///

#[derive(Clone, Debug)]
pub struct EntityModel {
    type_key: TypeKey,
    entity_name: &'static str,
    collection: String,
    fields: Vec<FieldMapping>,
    by_name: HashMap<String, usize>,
    by_column: HashMap<String, usize>,
    id: Option<usize>,
    constructor: ConstructorMetadata,
    inheritance: Option<InheritanceMetadata>,
    hierarchy: Option<HierarchyMetadata>,
    declared_discriminator: Option<String>,
}

impl EntityModel {
    pub(crate) fn new(
        type_key: TypeKey,
        entity_name: &'static str,
        collection: String,
        fields: Vec<FieldMapping>,
        constructor: ConstructorMetadata,
    ) -> Result<Self, MetadataError> {
        if collection.trim().is_empty() {
            return Err(MetadataError::EmptyCollection {
                entity: entity_name,
            });
        }

        let mut model = Self {
            type_key,
            entity_name,
            collection,
            fields,
            by_name: HashMap::new(),
            by_column: HashMap::new(),
            id: None,
            constructor,
            inheritance: None,
            hierarchy: None,
            declared_discriminator: None,
        };
        model.reindex()?;

        Ok(model)
    }

    /// Rebuild both lookup indices and the identifier slot.
    pub(crate) fn reindex(&mut self) -> Result<(), MetadataError> {
        self.by_name.clear();
        self.by_column.clear();
        self.id = None;

        for (index, field) in self.fields.iter().enumerate() {
            if self.by_name.insert(field.name().to_string(), index).is_some() {
                return Err(MetadataError::DuplicateField {
                    entity: self.entity_name,
                    field: field.name().to_string(),
                });
            }
            if self.by_column.insert(field.column().to_string(), index).is_some() {
                return Err(MetadataError::DuplicateColumn {
                    entity: self.entity_name,
                    column: field.column().to_string(),
                });
            }
            if field.is_id() {
                if let Some(first) = self.id {
                    return Err(MetadataError::MultipleIds {
                        entity: self.entity_name,
                        first: self.fields[first].name().to_string(),
                        second: field.name().to_string(),
                    });
                }
                self.id = Some(index);
            }
        }

        Ok(())
    }

    // identity

    #[must_use]
    pub const fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Logical name of the mapped type.
    #[must_use]
    pub const fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    /// Storage-native collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.collection
    }

    // fields

    #[must_use]
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldMapping::name)
    }

    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&FieldMapping> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    #[must_use]
    pub fn field_by_column(&self, column: &str) -> Option<&FieldMapping> {
        self.by_column.get(column).map(|&i| &self.fields[i])
    }

    /// Storage name for `field`, or `field` unchanged when it is not mapped.
    #[must_use]
    pub fn column_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.field_by_name(field).map_or(field, FieldMapping::column)
    }

    #[must_use]
    pub fn id(&self) -> Option<&FieldMapping> {
        self.id.map(|i| &self.fields[i])
    }

    /// Identifier mapping, failing fast when the entity declares none.
    pub fn require_id(&self) -> Result<&FieldMapping, Error> {
        self.id().ok_or(Error::IdNotFound {
            entity: self.entity_name,
        })
    }

    #[must_use]
    pub const fn constructor(&self) -> &ConstructorMetadata {
        &self.constructor
    }

    // inheritance

    #[must_use]
    pub const fn inheritance(&self) -> Option<&InheritanceMetadata> {
        self.inheritance.as_ref()
    }

    #[must_use]
    pub const fn hierarchy(&self) -> Option<&HierarchyMetadata> {
        self.hierarchy.as_ref()
    }

    #[must_use]
    pub const fn is_hierarchy_root(&self) -> bool {
        self.hierarchy.is_some()
    }

    /// True unless this entity is a subtype whose records are identified
    /// by a discriminator value instead of a collection of their own.
    #[must_use]
    pub const fn has_entity_name(&self) -> bool {
        self.inheritance.is_none() || self.hierarchy.is_some()
    }

    /// Equality on the discriminator column, for subtypes only.
    #[must_use]
    pub fn discriminator_filter(&self) -> Option<Condition> {
        self.inheritance.as_ref().map(|inheritance| {
            Condition::eq(
                inheritance.discriminator_column.clone(),
                inheritance.discriminator_value.clone(),
            )
        })
    }

    pub(crate) fn declared_discriminator(&self) -> Option<&str> {
        self.declared_discriminator.as_deref()
    }

    pub(crate) fn set_declared_discriminator(&mut self, value: Option<String>) {
        self.declared_discriminator = value;
    }

    pub(crate) fn set_inheritance(&mut self, inheritance: InheritanceMetadata, collection: String) {
        self.inheritance = Some(inheritance);
        self.collection = collection;
    }

    pub(crate) fn set_hierarchy(&mut self, hierarchy: HierarchyMetadata) {
        self.hierarchy = Some(hierarchy);
    }

    pub(crate) fn hierarchy_mut(&mut self) -> Option<&mut HierarchyMetadata> {
        self.hierarchy.as_mut()
    }

    pub(crate) fn push_field(&mut self, field: FieldMapping) {
        self.fields.push(field);
    }
}

impl PartialEq for EntityModel {
    fn eq(&self, other: &Self) -> bool {
        self.type_key == other.type_key
    }
}

impl Eq for EntityModel {}

impl Hash for EntityModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_key.hash(state);
    }
}

///
/// EntityMetadata
///
/// `EntityModel` plus everything typed: field accessors aligned with the
/// model's field list, the instance factory, and subtype bindings when `E`
/// is a hierarchy root. Derefs to the model.
///

pub struct EntityMetadata<E> {
    model: Arc<EntityModel>,
    accessors: Vec<Option<FieldAccessor<E>>>,
    factory: InstanceFactory<E>,
    subtypes: Vec<SubtypeBinding<E>>,
}

impl<E> EntityMetadata<E> {
    pub(crate) const fn new(
        model: Arc<EntityModel>,
        accessors: Vec<Option<FieldAccessor<E>>>,
        factory: InstanceFactory<E>,
        subtypes: Vec<SubtypeBinding<E>>,
    ) -> Self {
        Self {
            model,
            accessors,
            factory,
            subtypes,
        }
    }

    #[must_use]
    pub fn model(&self) -> &Arc<EntityModel> {
        &self.model
    }

    /// Accessor for the field at `index`; `None` for fields a root only
    /// exposes on behalf of its subtypes.
    pub(crate) fn accessor(&self, index: usize) -> Option<&FieldAccessor<E>> {
        self.accessors.get(index).and_then(Option::as_ref)
    }

    pub(crate) const fn factory(&self) -> &InstanceFactory<E> {
        &self.factory
    }

    pub(crate) fn subtypes(&self) -> &[SubtypeBinding<E>] {
        &self.subtypes
    }
}

impl<E> Deref for EntityMetadata<E> {
    type Target = EntityModel;

    fn deref(&self) -> &Self::Target {
        &self.model
    }
}

impl<E> fmt::Debug for EntityMetadata<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMetadata")
            .field("model", &self.model)
            .field("factory", &self.factory)
            .field("subtypes", &self.subtypes)
            .finish_non_exhaustive()
    }
}
