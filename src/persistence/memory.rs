//! In-process breaker store.

use dashmap::DashMap;

use crate::persistence::{BreakerStore, PersistedBreakerRecord, StoreError};

/// Keeps records for the life of the process. Clones share nothing; wrap in
/// `Arc` to share one store between clients.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, PersistedBreakerRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl BreakerStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<PersistedBreakerRecord>, StoreError> {
        Ok(self.records.get(key).map(|r| *r.value()))
    }

    fn save(&self, key: &str, record: &PersistedBreakerRecord) -> Result<(), StoreError> {
        self.records.insert(key.to_string(), *record);
        Ok(())
    }
}
