//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientSettings (validated, immutable)
//!     → handed to ApiClient::from_settings at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a client is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BreakerScope, CircuitBreakerConfig, ClientConfig, ClientSettings, ObservabilityConfig,
    PersistenceBackend, PersistenceConfig,
};
pub use validation::{validate_config, ValidationError};
