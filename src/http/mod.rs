//! HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! caller (get/post/put/delete)
//!     → client.rs (breaker gate, correlation ID, retry loop)
//!     → transport.rs (one physical exchange via reqwest)
//!     → response.rs (decode by response type)
//!     → status.rs + error.rs (classify and normalize failures)
//!     → payload or NormalizedError back to the caller
//! ```

pub mod client;
pub mod error;
pub mod request;
pub mod response;
pub mod status;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::{
    ClientError, ErrorDetail, NormalizedError, TransportError, TransportErrorKind,
    CIRCUIT_OPEN_CODE, DECODE_ERROR_CODE, INVALID_REQUEST_CODE,
};
pub use request::{CorrelationIdSource, Method, RequestOptions, ResponseType, UuidCorrelationIds};
pub use response::{ApiResponse, ResponseBody};
pub use status::{DefaultErrorPolicy, ErrorPolicy, Severity, StatusDescription};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
