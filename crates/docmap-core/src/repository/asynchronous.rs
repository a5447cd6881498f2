use crate::{
    error::{BoxError, Error},
    mapping::EntityMapper,
    model::{EntityMetadata, EntityModel, MetadataRegistry},
    repository::{
        Argument, AsyncEntityStream, AsyncOutcome, FromOutcome, Outcome, RepositoryDescriptor,
        ReturnShape,
        compile::DispatchTable,
        plan::{MethodPlan, Operation, keyed_record},
    },
    template::AsyncTemplate,
    traits::Entity,
    value::Record,
};
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, trace};

///
/// AsyncRepository
///
/// Dispatcher over an [`AsyncTemplate`]; planned exactly like
/// [`Repository`](crate::repository::Repository). Dropping the future of
/// an invocation, or a returned stream, cancels it.
///

pub struct AsyncRepository<E, T> {
    registry: Arc<MetadataRegistry>,
    metadata: Arc<EntityMetadata<E>>,
    template: T,
    table: DispatchTable,
}

impl<E: Entity, T: AsyncTemplate> AsyncRepository<E, T> {
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
            "async repository synthesized"
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

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.table.names()
    }

    pub async fn call<R: FromOutcome<E, AsyncEntityStream<E>>>(
        &self,
        method: &str,
        args: Vec<Argument>,
    ) -> Result<R, Error> {
        R::from_outcome(self.invoke(method, args).await?)
    }

    pub async fn invoke(&self, method: &str, args: Vec<Argument>) -> Result<AsyncOutcome<E>, Error> {
        let plan = self.table.get(method)?;
        trace!(method = %plan.name, ?args, "invoking async repository method");

        let operation = plan.prepare::<E>(self.model(), args)?;
        self.execute(plan, operation).await
    }

    fn model(&self) -> &EntityModel {
        self.metadata.model()
    }

    async fn store(&self, entity: E) -> Result<Record, Error> {
        let (record, key) = keyed_record(&self.registry, self.model(), &entity)?;
        let collection = self.model().name();

        let stored = if key.value.is_null() || !self.template.exists(collection, &key).await? {
            self.template.insert(collection, record).await?
        } else {
            self.template.update(collection, &key, record).await?
        };

        Ok(stored)
    }

    async fn execute(
        &self,
        plan: &MethodPlan,
        operation: Operation<E>,
    ) -> Result<AsyncOutcome<E>, Error> {
        let collection = plan.collection.as_str();

        let outcome = match operation {
            Operation::Save(entity) => {
                let stored = self.store(entity).await?;
                if plan.returns == ReturnShape::One {
                    Outcome::One(EntityMapper::new(&self.registry).from_record(&stored)?)
                } else {
                    Outcome::Unit
                }
            }
            Operation::Delete(entity) => {
                let (_, key) = keyed_record(&self.registry, self.model(), &entity)?;
                self.template.delete(collection, &key).await?;
                Outcome::Unit
            }
            Operation::DeleteById(key) => {
                self.template.delete(collection, &key).await?;
                Outcome::Unit
            }
            Operation::FindById(key) => {
                let record = self.template.find(collection, &key).await?;
                let entity = record
                    .map(|r| EntityMapper::new(&self.registry).from_record(&r))
                    .transpose()?;

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
            Operation::ExistsById(key) => {
                Outcome::Exists(self.template.exists(collection, &key).await?)
            }
            Operation::Count => Outcome::Count(self.template.count(collection).await?),
            Operation::Select(selection) => {
                debug!(method = %plan.name, query = ?selection.query, "executing select");
                let records: Vec<Record> = self
                    .template
                    .execute(&selection.query)
                    .await?
                    .try_collect()
                    .await
                    .map_err(Error::Template)?;

                selection.collect(&plan.name, &self.registry, records)?
            }
            Operation::Stream(query) => {
                debug!(method = %plan.name, ?query, "opening stream");
                let records = self.template.execute(&query).await?;
                let registry = Arc::clone(&self.registry);

                Outcome::Stream(AsyncEntityStream::new(records.map(
                    move |record: Result<Record, BoxError>| {
                        EntityMapper::new(&registry).from_record(&record?)
                    },
                )))
            }
            Operation::Exists(query) => {
                debug!(method = %plan.name, ?query, "executing exists");
                Outcome::Exists(self.template.exists_where(&query).await?)
            }
            Operation::CountWhere(query) => {
                debug!(method = %plan.name, ?query, "executing count");
                Outcome::Count(self.template.count_where(&query).await?)
            }
            Operation::DeleteWhere(query) => {
                debug!(method = %plan.name, ?query, "executing delete");
                let deleted = self.template.delete_where(&query).await?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        page::{CursoredPage, PageRequest},
        query::Sort,
        repository::{IntoArgument, MethodDescriptor, ParamShape},
        template::memory::MemoryTemplate,
        test_fixtures::{self, Person},
    };
    use futures::executor::block_on;

    fn people() -> AsyncRepository<Person, MemoryTemplate> {
        let descriptor = RepositoryDescriptor::new()
            .method(
                MethodDescriptor::new("save", ReturnShape::Unit)
                    .param("person", ParamShape::Entity),
            )
            .method(
                MethodDescriptor::new("find_by_id", ReturnShape::One)
                    .param("id", ParamShape::Value),
            )
            .method(
                MethodDescriptor::new("find_by_age_between", ReturnShape::Stream)
                    .param("low", ParamShape::Value)
                    .param("high", ParamShape::Value),
            )
            .method(
                MethodDescriptor::new("find_all_order_by_name_desc", ReturnShape::CursoredPage)
                    .param("page", ParamShape::PageRequest),
            )
            .method(
                MethodDescriptor::new("delete_by_id", ReturnShape::Unit)
                    .param("id", ParamShape::Value),
            )
            .method(MethodDescriptor::new("count", ReturnShape::Count));

        AsyncRepository::synthesize(
            Arc::new(test_fixtures::registry()),
            MemoryTemplate::new(),
            &descriptor,
        )
        .unwrap()
    }

    fn seed(repo: &AsyncRepository<Person, MemoryTemplate>) {
        for person in [
            Person::new(1, "Ana", 31),
            Person::new(2, "Bo", 45),
            Person::new(3, "Cy", 12),
        ] {
            block_on(repo.call::<()>("save", vec![person.into_argument()])).unwrap();
        }
    }

    #[test]
    fn saves_finds_and_deletes() {
        let repo = people();
        seed(&repo);

        block_on(async {
            assert_eq!(repo.call::<u64>("count", Vec::new()).await.unwrap(), 3);

            let bo: Person = repo
                .call("find_by_id", vec![2u64.into_argument()])
                .await
                .unwrap();
            assert_eq!(bo, Person::new(2, "Bo", 45));

            repo.call::<()>("delete_by_id", vec![2u64.into_argument()])
                .await
                .unwrap();
            assert!(matches!(
                repo.call::<Person>("find_by_id", vec![2u64.into_argument()])
                    .await,
                Err(Error::EmptyResult { .. })
            ));
        });
    }

    #[test]
    fn streams_are_lazy_and_mapped() {
        let repo = people();
        seed(&repo);

        let found: Vec<Person> = block_on(async {
            let stream: AsyncEntityStream<Person> = repo
                .call(
                    "find_by_age_between",
                    vec![10u32.into_argument(), 40u32.into_argument()],
                )
                .await
                .unwrap();

            stream.try_collect::<Vec<_>>().await
        })
        .unwrap();

        assert_eq!(
            found.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn cursored_pages_match_the_blocking_dispatcher() {
        let repo = people();
        seed(&repo);

        block_on(async {
            let first: CursoredPage<Person> = repo
                .call(
                    "find_all_order_by_name_desc",
                    vec![PageRequest::of_size(2).unwrap().into_argument()],
                )
                .await
                .unwrap();
            assert_eq!(
                first.iter().map(|p| p.id).collect::<Vec<_>>(),
                vec![3, 2]
            );

            let next: CursoredPage<Person> = repo
                .call(
                    "find_all_order_by_name_desc",
                    vec![first.next_page_request().unwrap().into_argument()],
                )
                .await
                .unwrap();
            assert_eq!(next.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1]);

            let sorted = PageRequest::of_size(3)
                .unwrap()
                .sort_by(Sort::desc("age"));
            let page: CursoredPage<Person> = repo
                .call("find_all_order_by_name_desc", vec![sorted.into_argument()])
                .await
                .unwrap();
            assert_eq!(page.cursor(0).unwrap().len(), 2);
        });
    }
}
