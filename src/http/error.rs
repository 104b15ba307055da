//! Error types surfaced by the client.
//!
//! Callers only ever see [`ClientError`]: either a [`NormalizedError`] or a
//! cancellation they asked for. [`TransportError`] is what a transport hands
//! back to the dispatcher and never escapes it.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::response::ResponseBody;

/// `error_code` of a fast-failed request while the circuit is open.
pub const CIRCUIT_OPEN_CODE: &str = "CIRCUIT_OPEN";
/// `error_code` of a successful response that did not match the expected type.
pub const DECODE_ERROR_CODE: &str = "DECODE_ERROR";
/// `error_code` of a request that could not be built (bad path or header).
pub const INVALID_REQUEST_CODE: &str = "INVALID_REQUEST";

/// Server-provided detail attached to an error response.
///
/// The body is server-controlled, so only two shapes are kept: plain text and
/// a JSON object. Other JSON values are rendered to text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Map(Map<String, Value>),
}

impl ErrorDetail {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(ErrorDetail::Text(s.clone())),
            Value::Object(map) => Some(ErrorDetail::Map(map.clone())),
            other => Some(ErrorDetail::Text(other.to_string())),
        }
    }
}

/// The single error shape produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct NormalizedError {
    /// Human-readable description.
    pub message: String,
    pub http_status: Option<u16>,
    /// Machine-readable code from the response body (`code` field).
    pub error_code: Option<String>,
    pub correlation_id: Option<String>,
    pub detail: Option<ErrorDetail>,
}

impl NormalizedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            http_status: None,
            error_code: None,
            correlation_id: None,
            detail: None,
        }
    }

    /// Fast-fail error for an open circuit.
    pub fn circuit_open(destination: &str) -> Self {
        Self {
            error_code: Some(CIRCUIT_OPEN_CODE.to_string()),
            ..Self::new(format!(
                "Service temporarily unavailable: too many recent failures reaching {}. \
                 Please try again shortly.",
                destination
            ))
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn is_circuit_open(&self) -> bool {
        self.error_code.as_deref() == Some(CIRCUIT_OPEN_CODE)
    }
}

/// Error returned by the verb methods.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] NormalizedError),

    /// The caller cancelled the request.
    #[error("request cancelled by caller")]
    Cancelled,
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    pub fn is_circuit_open(&self) -> bool {
        self.api().is_some_and(NormalizedError::is_circuit_open)
    }

    pub fn api(&self) -> Option<&NormalizedError> {
        match self {
            ClientError::Api(e) => Some(e),
            ClientError::Cancelled => None,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        self.api().and_then(|e| e.http_status)
    }
}

/// Broad cause of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not connect.
    Connect,
    /// No response within the deadline.
    Timeout,
    /// The destination answered with a non-success status.
    Status,
    /// The response body could not be read.
    Body,
    Other,
}

/// Failure reported by a transport for one attempt.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub status: Option<u16>,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, String>,
    pub body: Option<ResponseBody>,
    pub message: String,
}

impl TransportError {
    /// The destination answered with `status`.
    pub fn status(
        status: u16,
        headers: HashMap<String, String>,
        body: Option<ResponseBody>,
    ) -> Self {
        Self {
            kind: TransportErrorKind::Status,
            status: Some(status),
            headers,
            body,
            message: format!("destination returned HTTP {}", status),
        }
    }

    /// No response was received.
    pub fn network(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            headers: HashMap::new(),
            body: None,
            message: message.into(),
        }
    }

    pub fn timeout(after_ms: u64) -> Self {
        Self::network(
            TransportErrorKind::Timeout,
            format!("no response within {} ms", after_ms),
        )
    }

    /// Case-insensitive response header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_shapes() {
        assert_eq!(ErrorDetail::from_value(&Value::Null), None);
        assert_eq!(
            ErrorDetail::from_value(&json!("boom")),
            Some(ErrorDetail::Text("boom".into()))
        );
        assert_eq!(
            ErrorDetail::from_value(&json!(["a", 1])),
            Some(ErrorDetail::Text("[\"a\",1]".into()))
        );
        match ErrorDetail::from_value(&json!({"field": "title"})) {
            Some(ErrorDetail::Map(map)) => assert_eq!(map["field"], "title"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_circuit_open_error() {
        let err = NormalizedError::circuit_open("http://studio.test/api");
        assert!(err.is_circuit_open());
        assert_eq!(err.http_status, None);
        assert!(err.to_string().contains("http://studio.test/api"));

        let client_err = ClientError::from(err);
        assert!(client_err.is_circuit_open());
        assert!(!client_err.is_cancelled());
        assert!(!ClientError::Cancelled.is_circuit_open());
    }

    #[test]
    fn test_serialized_shape() {
        let err = NormalizedError {
            http_status: Some(422),
            correlation_id: Some("abc".into()),
            detail: Some(ErrorDetail::Text("title is required".into())),
            ..NormalizedError::new("Some of the provided data is invalid.")
        }
        .with_code("VALIDATION");

        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "message": "Some of the provided data is invalid.",
                "httpStatus": 422,
                "errorCode": "VALIDATION",
                "correlationId": "abc",
                "detail": "title is required",
            })
        );
    }

    #[test]
    fn test_transport_header_lookup() {
        let mut headers = HashMap::new();
        headers.insert("x-correlation-id".to_string(), "cid".to_string());
        let err = TransportError::status(500, headers, None);
        assert_eq!(err.header("X-Correlation-ID"), Some("cid"));
        assert_eq!(err.to_string(), "destination returned HTTP 500");
    }
}
