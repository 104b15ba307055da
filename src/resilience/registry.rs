//! Lazily created per-destination breakers.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::CircuitBreakerConfig;
use crate::persistence::BreakerStore;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::clock::Clock;

/// Owns every breaker a client has touched.
///
/// A breaker is built (and rehydrated from the store) the first time its
/// destination is requested and then lives as long as the registry.
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: CircuitBreakerConfig,
    store: Arc<dyn BreakerStore>,
    clock: Arc<dyn Clock>,
    key_prefix: String,
}

impl BreakerRegistry {
    pub fn new(
        config: CircuitBreakerConfig,
        store: Arc<dyn BreakerStore>,
        clock: Arc<dyn Clock>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
            store,
            clock,
            key_prefix: key_prefix.into(),
        }
    }

    /// Get the breaker for `destination`, creating it on first use.
    pub fn get(&self, destination: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(destination) {
            return existing.value().clone();
        }

        self.breakers
            .entry(destination.to_string())
            .or_insert_with(|| {
                tracing::debug!(destination = %destination, "Creating circuit breaker");
                Arc::new(CircuitBreaker::new(
                    destination,
                    self.storage_key(destination),
                    self.config,
                    self.store.clone(),
                    self.clock.clone(),
                ))
            })
            .value()
            .clone()
    }

    /// Get the breaker for `destination` only if it already exists.
    pub fn peek(&self, destination: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(destination).map(|b| b.value().clone())
    }

    /// Key under which `destination` is persisted.
    pub fn storage_key(&self, destination: &str) -> String {
        format!("{}{}", self.key_prefix, destination)
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
