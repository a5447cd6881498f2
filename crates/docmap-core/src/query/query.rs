use crate::{
    error::Error,
    query::{Condition, Sort, sort::merge_sorts},
};
use serde::{Deserialize, Serialize};

///
/// Query
///
/// A fully resolved read/delete request against one collection.
/// Immutable once built; every constructor validates it.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "QueryParts")]
pub struct Query {
    collection: String,
    condition: Option<Condition>,
    sorts: Vec<Sort>,
    first_result: Option<u64>,
    max_result: Option<u64>,
    projection: Vec<String>,
}

impl Query {
    /// Build a query from its parts.
    ///
    /// Fails with `InvalidQuery` when `collection` is empty or
    /// `max_result` is negative.
    pub fn of(
        collection: impl Into<String>,
        condition: Option<Condition>,
        sorts: Vec<Sort>,
        first_result: Option<u64>,
        max_result: Option<i64>,
    ) -> Result<Self, Error> {
        let mut builder = Self::select(collection);
        builder.condition = condition;
        builder.sorts = sorts;
        builder.first_result = first_result;
        builder.max_result = max_result;

        builder.build()
    }

    /// Start a fluent builder over `collection`.
    #[must_use]
    pub fn select(collection: impl Into<String>) -> QueryBuilder {
        QueryBuilder {
            collection: collection.into(),
            ..QueryBuilder::default()
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub const fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    #[must_use]
    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    #[must_use]
    pub const fn first_result(&self) -> Option<u64> {
        self.first_result
    }

    #[must_use]
    pub const fn max_result(&self) -> Option<u64> {
        self.max_result
    }

    /// Storage names to return; empty means every column.
    #[must_use]
    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    /// Copy of this query without offset or limit, for counting and
    /// existence checks.
    #[must_use]
    pub fn unbounded(&self) -> Self {
        Self {
            first_result: None,
            max_result: None,
            ..self.clone()
        }
    }
}

/// Unchecked wire form of a [`Query`].
#[derive(Deserialize)]
struct QueryParts {
    collection: String,
    #[serde(default)]
    condition: Option<Condition>,
    #[serde(default)]
    sorts: Vec<Sort>,
    #[serde(default)]
    first_result: Option<u64>,
    #[serde(default)]
    max_result: Option<u64>,
    #[serde(default)]
    projection: Vec<String>,
}

impl TryFrom<QueryParts> for Query {
    type Error = Error;

    fn try_from(parts: QueryParts) -> Result<Self, Self::Error> {
        let max_result = parts
            .max_result
            .map(|max| {
                i64::try_from(max)
                    .map_err(|_| Error::invalid_query(format!("max_result {max} is too large")))
            })
            .transpose()?;
        let mut builder = Self::select(parts.collection).columns(parts.projection);
        builder.condition = parts.condition;
        builder.sorts = parts.sorts;
        builder.first_result = parts.first_result;
        builder.max_result = max_result;

        builder.build()
    }
}

///
/// QueryBuilder
///

#[derive(Clone, Debug, Default)]
pub struct QueryBuilder {
    collection: String,
    condition: Option<Condition>,
    sorts: Vec<Sort>,
    first_result: Option<u64>,
    max_result: Option<i64>,
    projection: Vec<String>,
}

impl QueryBuilder {
    /// Restrict the returned columns.
    #[must_use]
    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.projection.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add a filter; repeated calls AND together.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.condition = Some(Condition::and_with(self.condition.take(), condition));
        self
    }

    /// Append one sort key (same field replaces the direction in place).
    #[must_use]
    pub fn order_by(mut self, sort: Sort) -> Self {
        merge_sorts(&mut self.sorts, [sort]);
        self
    }

    #[must_use]
    pub fn sorts(mut self, sorts: impl IntoIterator<Item = Sort>) -> Self {
        merge_sorts(&mut self.sorts, sorts);
        self
    }

    #[must_use]
    pub const fn skip(mut self, first_result: u64) -> Self {
        self.first_result = Some(first_result);
        self
    }

    #[must_use]
    pub const fn limit(mut self, max_result: i64) -> Self {
        self.max_result = Some(max_result);
        self
    }

    pub fn build(self) -> Result<Query, Error> {
        if self.collection.trim().is_empty() {
            return Err(Error::invalid_query("collection name is empty"));
        }

        let max_result = self
            .max_result
            .map(|max| {
                u64::try_from(max)
                    .map_err(|_| Error::invalid_query(format!("max_result {max} is negative")))
            })
            .transpose()?;

        Ok(Query {
            collection: self.collection,
            condition: self.condition,
            sorts: self.sorts,
            first_result: self.first_result,
            max_result,
            projection: self.projection,
        })
    }
}
