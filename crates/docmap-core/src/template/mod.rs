//! Storage collaborator contracts.
//!
//! A template executes store-agnostic queries and key operations. Its
//! errors travel through every layer unchanged as `Error::Template`.

pub mod memory;

use crate::{
    error::BoxError,
    query::Query,
    value::{Record, Value},
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

///
/// Key
///
/// Identifier column and value of one record.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Key {
    pub column: String,
    pub value: Value,
}

impl Key {
    #[must_use]
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Lazily produced records, in store order.
pub type RecordStream = Box<dyn Iterator<Item = Result<Record, BoxError>> + Send>;

/// Asynchronous counterpart of [`RecordStream`].
pub type AsyncRecordStream = BoxStream<'static, Result<Record, BoxError>>;

///
/// Template
///
/// Blocking storage contract.
///

pub trait Template: Send + Sync {
    fn execute(&self, query: &Query) -> Result<RecordStream, BoxError>;

    /// Store a new record, returning it as stored.
    fn insert(&self, collection: &str, record: Record) -> Result<Record, BoxError>;

    /// Replace the record under `key`, returning it as stored.
    fn update(&self, collection: &str, key: &Key, record: Record) -> Result<Record, BoxError>;

    fn delete(&self, collection: &str, key: &Key) -> Result<(), BoxError>;

    /// Delete every record matching `query`, returning how many went.
    fn delete_where(&self, query: &Query) -> Result<u64, BoxError>;

    fn find(&self, collection: &str, key: &Key) -> Result<Option<Record>, BoxError>;

    fn exists(&self, collection: &str, key: &Key) -> Result<bool, BoxError> {
        Ok(self.find(collection, key)?.is_some())
    }

    fn count(&self, collection: &str) -> Result<u64, BoxError>;

    fn exists_where(&self, query: &Query) -> Result<bool, BoxError> {
        Ok(self.execute(query)?.next().transpose()?.is_some())
    }

    fn count_where(&self, query: &Query) -> Result<u64, BoxError> {
        let mut count = 0;
        for record in self.execute(&query.unbounded())? {
            record?;
            count += 1;
        }

        Ok(count)
    }
}

impl<T: Template + ?Sized> Template for Arc<T> {
    fn execute(&self, query: &Query) -> Result<RecordStream, BoxError> {
        (**self).execute(query)
    }

    fn insert(&self, collection: &str, record: Record) -> Result<Record, BoxError> {
        (**self).insert(collection, record)
    }

    fn update(&self, collection: &str, key: &Key, record: Record) -> Result<Record, BoxError> {
        (**self).update(collection, key, record)
    }

    fn delete(&self, collection: &str, key: &Key) -> Result<(), BoxError> {
        (**self).delete(collection, key)
    }

    fn delete_where(&self, query: &Query) -> Result<u64, BoxError> {
        (**self).delete_where(query)
    }

    fn find(&self, collection: &str, key: &Key) -> Result<Option<Record>, BoxError> {
        (**self).find(collection, key)
    }

    fn exists(&self, collection: &str, key: &Key) -> Result<bool, BoxError> {
        (**self).exists(collection, key)
    }

    fn count(&self, collection: &str) -> Result<u64, BoxError> {
        (**self).count(collection)
    }

    fn exists_where(&self, query: &Query) -> Result<bool, BoxError> {
        (**self).exists_where(query)
    }

    fn count_where(&self, query: &Query) -> Result<u64, BoxError> {
        (**self).count_where(query)
    }
}

///
/// AsyncTemplate
///
/// Asynchronous storage contract; mirrors [`Template`]. Dropping a
/// returned future or stream cancels the operation.
///

#[async_trait]
pub trait AsyncTemplate: Send + Sync {
    async fn execute(&self, query: &Query) -> Result<AsyncRecordStream, BoxError>;

    async fn insert(&self, collection: &str, record: Record) -> Result<Record, BoxError>;

    async fn update(&self, collection: &str, key: &Key, record: Record)
    -> Result<Record, BoxError>;

    async fn delete(&self, collection: &str, key: &Key) -> Result<(), BoxError>;

    async fn delete_where(&self, query: &Query) -> Result<u64, BoxError>;

    async fn find(&self, collection: &str, key: &Key) -> Result<Option<Record>, BoxError>;

    async fn exists(&self, collection: &str, key: &Key) -> Result<bool, BoxError> {
        Ok(self.find(collection, key).await?.is_some())
    }

    async fn count(&self, collection: &str) -> Result<u64, BoxError>;

    async fn exists_where(&self, query: &Query) -> Result<bool, BoxError> {
        use futures::StreamExt;

        let mut records = self.execute(query).await?;
        Ok(records.next().await.transpose()?.is_some())
    }

    async fn count_where(&self, query: &Query) -> Result<u64, BoxError> {
        use futures::TryStreamExt;

        let records = self.execute(&query.unbounded()).await?;
        records.try_fold(0, |count, _| async move { Ok(count + 1) }).await
    }
}

#[async_trait]
impl<T: AsyncTemplate + ?Sized> AsyncTemplate for Arc<T> {
    async fn execute(&self, query: &Query) -> Result<AsyncRecordStream, BoxError> {
        (**self).execute(query).await
    }

    async fn insert(&self, collection: &str, record: Record) -> Result<Record, BoxError> {
        (**self).insert(collection, record).await
    }

    async fn update(
        &self,
        collection: &str,
        key: &Key,
        record: Record,
    ) -> Result<Record, BoxError> {
        (**self).update(collection, key, record).await
    }

    async fn delete(&self, collection: &str, key: &Key) -> Result<(), BoxError> {
        (**self).delete(collection, key).await
    }

    async fn delete_where(&self, query: &Query) -> Result<u64, BoxError> {
        (**self).delete_where(query).await
    }

    async fn find(&self, collection: &str, key: &Key) -> Result<Option<Record>, BoxError> {
        (**self).find(collection, key).await
    }

    async fn exists(&self, collection: &str, key: &Key) -> Result<bool, BoxError> {
        (**self).exists(collection, key).await
    }

    async fn count(&self, collection: &str) -> Result<u64, BoxError> {
        (**self).count(collection).await
    }

    async fn exists_where(&self, query: &Query) -> Result<bool, BoxError> {
        (**self).exists_where(query).await
    }

    async fn count_where(&self, query: &Query) -> Result<u64, BoxError> {
        (**self).count_where(query).await
    }
}
