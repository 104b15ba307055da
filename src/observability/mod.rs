//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher and circuit breakers produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stderr via tracing-subscriber (CLI, embedding apps)
//!     → any `metrics` recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Correlation IDs travel as structured fields on every attempt event
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
