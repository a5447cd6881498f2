//! Entity ↔ record conversion driven by registered metadata.

use crate::{
    config::ColumnPolicy,
    error::{Error, MappingError, MetadataError},
    model::{Arguments, EntityMetadata, InstanceFactory, MetadataRegistry},
    traits::Entity,
    value::{Record, Value},
};

///
/// EntityMapper
///
/// Reading a hierarchy root is two-pass: the discriminator column picks
/// the subtype, then that subtype's constructor and setters run. Writing a
/// subtype always writes its discriminator.
///

#[derive(Clone, Copy, Debug)]
pub struct EntityMapper<'a> {
    registry: &'a MetadataRegistry,
}

impl<'a> EntityMapper<'a> {
    #[must_use]
    pub const fn new(registry: &'a MetadataRegistry) -> Self {
        Self { registry }
    }

    pub fn to_record<E: Entity>(&self, entity: &E) -> Result<Record, Error> {
        let metadata = self.registry.metadata::<E>()?;

        self.write(&metadata, entity)
    }

    pub fn from_record<E: Entity>(&self, record: &Record) -> Result<E, Error> {
        let metadata = self.registry.metadata::<E>()?;

        self.read(&metadata, record)
    }

    fn write<E: Entity>(&self, metadata: &EntityMetadata<E>, entity: &E) -> Result<Record, Error> {
        if metadata.is_hierarchy_root() {
            return metadata
                .subtypes()
                .iter()
                .find_map(|binding| binding.write(self.registry, entity))
                .unwrap_or_else(|| {
                    Err(MappingError::UnmappedSubtype {
                        entity: metadata.entity_name(),
                    }
                    .into())
                });
        }

        let mut record = Record::new();
        for (index, field) in metadata.fields().iter().enumerate() {
            if let Some(accessor) = metadata.accessor(index) {
                record.insert(field.column(), accessor.get(entity));
            }
        }
        if let Some(inheritance) = metadata.inheritance() {
            record.insert(
                inheritance.discriminator_column.clone(),
                inheritance.discriminator_value.clone(),
            );
        }

        Ok(record)
    }

    fn read<E: Entity>(&self, metadata: &EntityMetadata<E>, record: &Record) -> Result<E, Error> {
        if let Some(hierarchy) = metadata.hierarchy() {
            let entity = metadata.entity_name();
            let column = &hierarchy.discriminator_column;
            let value = record.get(column.as_str()).filter(|v| !v.is_null()).ok_or_else(|| {
                MappingError::MissingDiscriminator {
                    entity,
                    column: column.clone(),
                }
            })?;
            let unknown = || MappingError::UnknownDiscriminator {
                entity,
                value: discriminator_text(value),
            };

            let subtype = value
                .as_text()
                .and_then(|text| hierarchy.subtype_for(text))
                .ok_or_else(unknown)?;
            let binding = metadata
                .subtypes()
                .iter()
                .find(|b| b.key() == subtype.type_key)
                .ok_or_else(unknown)?;

            return binding.read(self.registry, record);
        }

        self.check_columns(metadata, record)?;

        match metadata.factory() {
            InstanceFactory::Default(make) => {
                let mut instance = make();
                apply_setters(metadata, &mut instance, record, &[])?;

                Ok(instance)
            }
            InstanceFactory::Parameterized(make) => {
                let parameters = metadata.constructor().parameters();
                let values = parameters
                    .iter()
                    .map(|name| {
                        let column = metadata.column_name(name);
                        (column, record.get(column))
                    })
                    .collect();

                let mut arguments = Arguments::new(metadata.entity_name(), values);
                let mut instance = make(&mut arguments)?;
                if arguments.consumed() != arguments.expected() {
                    return Err(MappingError::ConstructorArity {
                        entity: metadata.entity_name(),
                        expected: arguments.expected(),
                        consumed: arguments.consumed(),
                    }
                    .into());
                }
                apply_setters(metadata, &mut instance, record, parameters)?;

                Ok(instance)
            }
            InstanceFactory::Abstract => Err(MetadataError::MissingConstructor {
                entity: metadata.entity_name(),
            }
            .into()),
        }
    }

    fn check_columns<E>(&self, metadata: &EntityMetadata<E>, record: &Record) -> Result<(), MappingError> {
        if self.registry.config().unknown_columns == ColumnPolicy::Ignore {
            return Ok(());
        }

        let discriminator = metadata
            .inheritance()
            .map(|i| i.discriminator_column.as_str());

        match record
            .columns()
            .find(|c| metadata.field_by_column(c).is_none() && Some(*c) != discriminator)
        {
            Some(column) => Err(MappingError::UnknownColumn {
                entity: metadata.entity_name(),
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Apply every present column to `instance`, skipping constructor-bound
/// fields. A `Null` the field type cannot hold leaves the field untouched.
fn apply_setters<E: 'static>(
    metadata: &EntityMetadata<E>,
    instance: &mut E,
    record: &Record,
    bound: &[String],
) -> Result<(), MappingError> {
    for (index, field) in metadata.fields().iter().enumerate() {
        if bound.iter().any(|name| name == field.name()) {
            continue;
        }
        let (Some(accessor), Some(value)) = (metadata.accessor(index), record.get(field.column()))
        else {
            continue;
        };

        if let Err(expected) = accessor.set(instance, value) {
            if value.is_null() {
                continue;
            }

            return Err(MappingError::Conversion {
                entity: metadata.entity_name(),
                column: field.column().to_string(),
                expected,
                value: value.clone(),
            });
        }
    }

    Ok(())
}

fn discriminator_text(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        other => format!("{other:?}"),
    }
}
