//! Request lifecycle management.
//!
//! # Data Flow
//! ```text
//! Caller creates CancelHandle
//!     → token attached to RequestOptions
//!     → dispatcher races every attempt and backoff sleep against it
//!     → cancel() drops the in-flight future; breaker is left untouched
//! ```

pub mod cancel;

pub use cancel::{CancelHandle, CancelToken};
