use crate::{
    error::{BoxError, Error},
    mapping::EntityMapper,
    model::{EntityMetadata, EntityModel, MetadataRegistry},
    repository::{
        Argument, EntityStream, FromOutcome, Outcome, RepositoryDescriptor, ReturnShape,
        compile::DispatchTable,
        plan::{MethodPlan, Operation, keyed_record},
    },
    template::Template,
    traits::Entity,
    value::Record,
};
use std::sync::Arc;
use tracing::{debug, trace};

///
/// Repository
///
/// Dispatcher over a blocking [`Template`]. Every declared method is
/// classified and planned once by [`Repository::synthesize`]; a call only
/// binds its arguments, runs the query and wraps the rows.
///

pub struct Repository<E, T> {
    registry: Arc<MetadataRegistry>,
    metadata: Arc<EntityMetadata<E>>,
    template: T,
    table: DispatchTable,
}

impl<E: Entity, T: Template> Repository<E, T> {
    /// Plan every method of `descriptor`; the first method that cannot be
    /// synthesized fails the whole repository.
    pub fn synthesize(
        registry: Arc<MetadataRegistry>,
        template: T,
        descriptor: &RepositoryDescriptor,
    ) -> Result<Self, Error> {
        let metadata = registry.metadata::<E>()?;
        let table = DispatchTable::compile(metadata.model(), descriptor)?;

        debug!(
            entity = metadata.entity_name(),
            collection = metadata.name(),
            methods = table.len(),
            "repository synthesized"
        );

        Ok(Self {
            registry,
            metadata,
            template,
            table,
        })
    }

    #[must_use]
    pub const fn template(&self) -> &T {
        &self.template
    }

    #[must_use]
    pub fn metadata(&self) -> &EntityMetadata<E> {
        &self.metadata
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// Declared method names.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.table.names()
    }

    /// Typed invocation.
    pub fn call<R: FromOutcome<E>>(&self, method: &str, args: Vec<Argument>) -> Result<R, Error> {
        R::from_outcome(self.invoke(method, args)?)
    }

    /// Invoke `method` with dynamically typed arguments.
    pub fn invoke(&self, method: &str, args: Vec<Argument>) -> Result<Outcome<E>, Error> {
        let plan = self.table.get(method)?;
        trace!(method = %plan.name, ?args, "invoking repository method");

        let operation = plan.prepare::<E>(self.model(), args)?;
        self.execute(plan, operation)
    }

    fn model(&self) -> &EntityModel {
        self.metadata.model()
    }

    fn store(&self, entity: E) -> Result<Record, Error> {
        let (record, key) = keyed_record(&self.registry, self.model(), &entity)?;
        let collection = self.model().name();

        let stored = if key.value.is_null() || !self.template.exists(collection, &key)? {
            self.template.insert(collection, record)?
        } else {
            self.template.update(collection, &key, record)?
        };

        Ok(stored)
    }

    fn execute(&self, plan: &MethodPlan, operation: Operation<E>) -> Result<Outcome<E>, Error> {
        let collection = plan.collection.as_str();
        let mapper = EntityMapper::new(&self.registry);

        let outcome = match operation {
            Operation::Save(entity) => {
                let stored = self.store(entity)?;
                if plan.returns == ReturnShape::One {
                    Outcome::One(mapper.from_record(&stored)?)
                } else {
                    Outcome::Unit
                }
            }
            Operation::Delete(entity) => {
                let (_, key) = keyed_record(&self.registry, self.model(), &entity)?;
                self.template.delete(collection, &key)?;
                Outcome::Unit
            }
            Operation::DeleteById(key) => {
                self.template.delete(collection, &key)?;
                Outcome::Unit
            }
            Operation::FindById(key) => {
                let record = self.template.find(collection, &key)?;
                let entity = record.map(|r| mapper.from_record(&r)).transpose()?;

                match (plan.returns, entity) {
                    (ReturnShape::One, Some(entity)) => Outcome::One(entity),
                    (ReturnShape::One, None) => {
                        return Err(Error::EmptyResult {
                            method: plan.name.clone(),
                        });
                    }
                    (_, entity) => Outcome::Optional(entity),
                }
            }
            Operation::ExistsById(key) => Outcome::Exists(self.template.exists(collection, &key)?),
            Operation::Count => Outcome::Count(self.template.count(collection)?),
            Operation::Select(selection) => {
                debug!(method = %plan.name, query = ?selection.query, "executing select");
                let records = self
                    .template
                    .execute(&selection.query)?
                    .collect::<Result<Vec<_>, BoxError>>()?;

                selection.collect(&plan.name, &self.registry, records)?
            }
            Operation::Stream(query) => {
                debug!(method = %plan.name, ?query, "opening stream");
                let records = self.template.execute(&query)?;
                let registry = Arc::clone(&self.registry);

                Outcome::Stream(EntityStream::new(records.map(move |record| {
                    EntityMapper::new(&registry).from_record(&record?)
                })))
            }
            Operation::Exists(query) => {
                debug!(method = %plan.name, ?query, "executing exists");
                Outcome::Exists(self.template.exists_where(&query)?)
            }
            Operation::CountWhere(query) => {
                debug!(method = %plan.name, ?query, "executing count");
                Outcome::Count(self.template.count_where(&query)?)
            }
            Operation::DeleteWhere(query) => {
                debug!(method = %plan.name, ?query, "executing delete");
                let deleted = self.template.delete_where(&query)?;
                if plan.returns == ReturnShape::Count {
                    Outcome::Count(deleted)
                } else {
                    Outcome::Unit
                }
            }
        };

        Ok(outcome)
    }
}
