//! In-process template over plain vectors.
//!
//! Records keep insertion order until a query sorts them. Conditions are
//! evaluated here exactly as a store adapter is expected to evaluate them,
//! which makes this the reference for condition semantics.

use crate::{
    error::BoxError,
    query::{CompareOp, Comparison, Condition, Direction, Query, Sort},
    template::{AsyncRecordStream, AsyncTemplate, Key, RecordStream, Template},
    value::{NULL, Record, Value},
};
use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use thiserror::Error as ThisError;
use tracing::trace;

///
/// MemoryError
///

#[derive(Debug, ThisError)]
pub enum MemoryError {
    #[error("invalid LIKE pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("no record in '{collection}' where {column} = {value:?}")]
    MissingRecord {
        collection: String,
        column: String,
        value: Value,
    },

    #[error("memory template lock poisoned")]
    Poisoned,
}

///
/// MemoryTemplate
///

#[derive(Debug, Default)]
pub struct MemoryTemplate {
    collections: RwLock<BTreeMap<String, Vec<Record>>>,
}

impl MemoryTemplate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `collection` with `records`, appended in order.
    pub fn with_records(
        self,
        collection: &str,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Self, BoxError> {
        self.write()?
            .entry(collection.to_string())
            .or_default()
            .extend(records);

        Ok(self)
    }

    /// Snapshot of `collection` in storage order.
    pub fn records(&self, collection: &str) -> Result<Vec<Record>, BoxError> {
        Ok(self.read()?.get(collection).cloned().unwrap_or_default())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Vec<Record>>>, MemoryError> {
        self.collections.read().map_err(|_| MemoryError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Vec<Record>>>, MemoryError> {
        self.collections.write().map_err(|_| MemoryError::Poisoned)
    }

    fn select(&self, query: &Query) -> Result<Vec<Record>, BoxError> {
        let guard = self.read()?;
        let Some(records) = guard.get(query.collection()) else {
            return Ok(Vec::new());
        };

        let mut selected = Vec::new();
        for record in records {
            if query.condition().map_or(Ok(true), |c| matches(c, record))? {
                selected.push(record.clone());
            }
        }
        drop(guard);

        if !query.sorts().is_empty() {
            selected.sort_by(|a, b| compare_records(query.sorts(), a, b));
        }

        let skip = usize::try_from(query.first_result().unwrap_or(0)).unwrap_or(usize::MAX);
        let take = query
            .max_result()
            .map_or(usize::MAX, |max| usize::try_from(max).unwrap_or(usize::MAX));
        let projection = query.projection();

        Ok(selected
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|record| project(record, projection))
            .collect())
    }
}

impl Template for MemoryTemplate {
    fn execute(&self, query: &Query) -> Result<RecordStream, BoxError> {
        let records = self.select(query)?;
        trace!(collection = query.collection(), rows = records.len(), "memory select");

        Ok(Box::new(records.into_iter().map(Ok::<_, BoxError>)))
    }

    fn insert(&self, collection: &str, record: Record) -> Result<Record, BoxError> {
        self.write()?
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());

        Ok(record)
    }

    fn update(&self, collection: &str, key: &Key, record: Record) -> Result<Record, BoxError> {
        let mut guard = self.write()?;
        let slot = guard
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| has_key(r, key)))
            .ok_or_else(|| missing(collection, key))?;
        *slot = record.clone();

        Ok(record)
    }

    fn delete(&self, collection: &str, key: &Key) -> Result<(), BoxError> {
        if let Some(records) = self.write()?.get_mut(collection) {
            records.retain(|r| !has_key(r, key));
        }

        Ok(())
    }

    fn delete_where(&self, query: &Query) -> Result<u64, BoxError> {
        let mut guard = self.write()?;
        let Some(records) = guard.get_mut(query.collection()) else {
            return Ok(0);
        };

        let mut matched = Vec::with_capacity(records.len());
        for record in records.iter() {
            matched.push(query.condition().map_or(Ok(true), |c| matches(c, record))?);
        }

        let mut verdicts = matched.iter();
        records.retain(|_| !verdicts.next().copied().unwrap_or(false));
        let removed = matched.iter().filter(|&&d| d).count();

        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    fn find(&self, collection: &str, key: &Key) -> Result<Option<Record>, BoxError> {
        Ok(self
            .read()?
            .get(collection)
            .and_then(|records| records.iter().find(|r| has_key(r, key)))
            .cloned())
    }

    fn count(&self, collection: &str) -> Result<u64, BoxError> {
        let len = self.read()?.get(collection).map_or(0, Vec::len);

        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl AsyncTemplate for MemoryTemplate {
    async fn execute(&self, query: &Query) -> Result<AsyncRecordStream, BoxError> {
        let records = self.select(query)?;

        Ok(futures::stream::iter(records.into_iter().map(Ok::<_, BoxError>)).boxed())
    }

    async fn insert(&self, collection: &str, record: Record) -> Result<Record, BoxError> {
        Template::insert(self, collection, record)
    }

    async fn update(
        &self,
        collection: &str,
        key: &Key,
        record: Record,
    ) -> Result<Record, BoxError> {
        Template::update(self, collection, key, record)
    }

    async fn delete(&self, collection: &str, key: &Key) -> Result<(), BoxError> {
        Template::delete(self, collection, key)
    }

    async fn delete_where(&self, query: &Query) -> Result<u64, BoxError> {
        Template::delete_where(self, query)
    }

    async fn find(&self, collection: &str, key: &Key) -> Result<Option<Record>, BoxError> {
        Template::find(self, collection, key)
    }

    async fn count(&self, collection: &str) -> Result<u64, BoxError> {
        Template::count(self, collection)
    }
}

fn has_key(record: &Record, key: &Key) -> bool {
    record.value(&key.column).loosely_equals(&key.value)
}

fn missing(collection: &str, key: &Key) -> MemoryError {
    MemoryError::MissingRecord {
        collection: collection.to_string(),
        column: key.column.clone(),
        value: key.value.clone(),
    }
}

fn project(record: Record, projection: &[String]) -> Record {
    if projection.is_empty() {
        return record;
    }

    record
        .into_iter()
        .filter(|(column, _)| projection.contains(column))
        .collect()
}

// ============================================================================
// CONDITION EVALUATION
// ============================================================================

/// Evaluate `condition` against one record.
pub fn matches(condition: &Condition, record: &Record) -> Result<bool, MemoryError> {
    match condition {
        Condition::Compare(comparison) => compare(comparison, record),
        Condition::And(children) => {
            for child in children {
                if !matches(child, record)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Condition::Or(children) => {
            for child in children {
                if matches(child, record)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Condition::Not(child) => Ok(!matches(child, record)?),
    }
}

fn compare(comparison: &Comparison, record: &Record) -> Result<bool, MemoryError> {
    let actual = lookup(record, &comparison.field);
    let expected = &comparison.value;

    let holds = match comparison.op {
        CompareOp::Equals => actual.loosely_equals(expected),
        CompareOp::GreaterThan => actual.compare(expected) == Some(Ordering::Greater),
        CompareOp::GreaterEquals => {
            matches!(actual.compare(expected), Some(Ordering::Greater | Ordering::Equal))
        }
        CompareOp::LesserThan => actual.compare(expected) == Some(Ordering::Less),
        CompareOp::LesserEquals => {
            matches!(actual.compare(expected), Some(Ordering::Less | Ordering::Equal))
        }
        CompareOp::Like => match (actual.as_text(), expected.as_text()) {
            (Some(text), Some(pattern)) => like_regex(pattern)?.is_match(text),
            _ => false,
        },
        CompareOp::In => expected
            .as_list()
            .is_some_and(|candidates| candidates.iter().any(|c| actual.loosely_equals(c))),
        CompareOp::Between => match expected.as_list() {
            Some([low, high]) => {
                matches!(actual.compare(low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(actual.compare(high), Some(Ordering::Less | Ordering::Equal))
            }
            _ => false,
        },
    };

    Ok(holds)
}

/// Column value; a dotted path reaches into embedded records when no
/// column carries the full name.
fn lookup<'a>(record: &'a Record, field: &str) -> &'a Value {
    if let Some(value) = record.get(field) {
        return value;
    }

    let mut parts = field.split('.');
    let Some(first) = parts.next() else {
        return &NULL;
    };

    parts.try_fold(record.value(first), |value, part| value.as_record().map(|r| r.value(part)))
        .unwrap_or(&NULL)
}

/// `%` → any run, `_` → one character, everything else literal.
fn like_regex(pattern: &str) -> Result<Regex, MemoryError> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?s)^");

    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');

    Regex::new(&source).map_err(|source| MemoryError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn compare_records(sorts: &[Sort], a: &Record, b: &Record) -> Ordering {
    for sort in sorts {
        let ordering = total_order(lookup(a, &sort.field), lookup(b, &sort.field));
        let ordering = match sort.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Nulls first, then by value; incomparable families by family name.
fn total_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.compare(b).unwrap_or_else(|| a.kind().cmp(b.kind())),
    }
}
