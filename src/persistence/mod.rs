//! Circuit breaker persistence subsystem.
//!
//! # Data Flow
//! ```text
//! CircuitBreaker mutation (record_success / record_failure / half-open probe)
//!     → record.rs (snapshot + write timestamp)
//!     → BreakerStore::save (memory.rs or file.rs)
//!
//! CircuitBreaker construction
//!     → BreakerStore::load
//!     → adopt snapshot verbatim, or start Closed
//! ```
//!
//! # Design Decisions
//! - Store access is synchronous; both stores are fast local operations
//! - Store errors never reach request callers; breakers log and move on
//! - No expiry: a record lives until it is overwritten

pub mod file;
pub mod memory;
pub mod record;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::PersistedBreakerRecord;

/// Errors raised by a breaker store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable key-value medium for breaker snapshots.
pub trait BreakerStore: Send + Sync {
    /// Fetch the last record written for `key`, if any.
    fn load(&self, key: &str) -> Result<Option<PersistedBreakerRecord>, StoreError>;

    /// Overwrite the record for `key`.
    fn save(&self, key: &str, record: &PersistedBreakerRecord) -> Result<(), StoreError>;
}
