use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::{RecordStore, StoreError};

/// Process-local store for tests and throwaway deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn hset(&self, partition: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().map_err(|_| StoreError::LockPoisoned)?;
        partitions
            .entry(partition.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    fn hget(&self, partition: &str, field: &str) -> Result<Option<String>, StoreError> {
        let partitions = self.partitions.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(partitions
            .get(partition)
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    fn hgetall(&self, partition: &str) -> Result<Vec<(String, String)>, StoreError> {
        let partitions = self.partitions.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(partitions
            .get(partition)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
