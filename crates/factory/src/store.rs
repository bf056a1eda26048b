//! Record persistence backends

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::{json, Value};

use crate::attributes::{AttributeSet, Record};
use crate::error::{FactoryError, FactoryResult};

/// Persistence backend used by factories
pub trait RecordStore: Send + Sync {
    /// Persist `columns` into `relation`, assigning `primary_key` if absent
    fn insert(&self, relation: &str, columns: AttributeSet, primary_key: &str) -> FactoryResult<Record>;

    /// All records persisted into `relation`, in insertion order
    fn all(&self, relation: &str) -> Vec<Record>;

    fn count(&self, relation: &str) -> usize {
        self.all(relation).len()
    }
}

/// In-memory store with per-relation auto-increment identifiers
#[derive(Debug, Default)]
pub struct MemoryStore {
    relations: DashMap<String, Vec<Record>>,
    counters: DashMap<String, AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, relation: &str) -> u64 {
        self.counters
            .entry(relation.to_string())
            .or_insert_with(|| AtomicU64::new(1))
            .fetch_add(1, Ordering::SeqCst)
    }

    /// Remove every record, keeping identifier counters
    pub fn clear(&self) {
        self.relations.clear();
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, relation: &str, mut columns: AttributeSet, primary_key: &str) -> FactoryResult<Record> {
        if relation.is_empty() {
            return Err(FactoryError::Persistence(
                "Cannot insert into an unnamed relation".to_string(),
            ));
        }

        if columns.get(primary_key).map_or(true, Value::is_null) {
            columns.insert(primary_key.to_string(), json!(self.next_id(relation)));
        }

        let record = Value::Object(columns);
        self.relations
            .entry(relation.to_string())
            .or_default()
            .push(record.clone());
        tracing::debug!("Inserted record into '{}'", relation);

        Ok(record)
    }

    fn all(&self, relation: &str) -> Vec<Record> {
        self.relations
            .get(relation)
            .map(|records| records.value().clone())
            .unwrap_or_default()
    }
}
