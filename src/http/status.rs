//! HTTP status policy: human-readable descriptions and transience.

use serde::Serialize;

use crate::http::error::TransportErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What to tell a person about a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDescription {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl StatusDescription {
    fn new(title: &str, message: &str, severity: Severity) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            severity,
        }
    }
}

/// Status lookup and retry classification used by the dispatcher.
pub trait ErrorPolicy: Send + Sync {
    /// Describe a response status.
    fn describe(&self, status: u16) -> StatusDescription;

    /// Describe a failure that produced no response at all.
    fn describe_network_failure(&self, kind: TransportErrorKind) -> StatusDescription;

    /// Whether a failure with this status (or none) may clear on retry.
    fn is_transient(&self, status: Option<u16>) -> bool;
}

/// Conventional HTTP semantics.
///
/// Transient: no status at all, 408, 429 and every 5xx. All other 4xx are
/// permanent.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorPolicy;

impl ErrorPolicy for DefaultErrorPolicy {
    fn describe(&self, status: u16) -> StatusDescription {
        use Severity::*;
        match status {
            400 => StatusDescription::new(
                "Bad Request",
                "The request was invalid. Please check your input and try again.",
                Warning,
            ),
            401 => StatusDescription::new(
                "Unauthorized",
                "You need to sign in to continue.",
                Warning,
            ),
            403 => StatusDescription::new(
                "Forbidden",
                "You don't have permission to perform this action.",
                Warning,
            ),
            404 => StatusDescription::new(
                "Not Found",
                "The requested resource could not be found.",
                Warning,
            ),
            408 => StatusDescription::new(
                "Request Timeout",
                "The server took too long to respond. Please try again.",
                Warning,
            ),
            409 => StatusDescription::new(
                "Conflict",
                "The request conflicts with the current state of the resource.",
                Warning,
            ),
            413 => StatusDescription::new(
                "Payload Too Large",
                "The uploaded content is too large.",
                Warning,
            ),
            422 => StatusDescription::new(
                "Validation Failed",
                "Some of the provided data is invalid.",
                Warning,
            ),
            429 => StatusDescription::new(
                "Too Many Requests",
                "Too many requests. Please wait a moment and try again.",
                Warning,
            ),
            500 => StatusDescription::new(
                "Server Error",
                "The server encountered an unexpected error.",
                Error,
            ),
            502 => StatusDescription::new(
                "Bad Gateway",
                "The server is temporarily unreachable.",
                Error,
            ),
            503 => StatusDescription::new(
                "Service Unavailable",
                "The service is temporarily unavailable. Please try again later.",
                Error,
            ),
            504 => StatusDescription::new(
                "Gateway Timeout",
                "The server did not respond in time.",
                Error,
            ),
            400..=499 => StatusDescription {
                title: "Request Failed".to_string(),
                message: format!("The request could not be completed (HTTP {}).", status),
                severity: Warning,
            },
            500..=599 => StatusDescription {
                title: "Server Error".to_string(),
                message: format!("The server failed to handle the request (HTTP {}).", status),
                severity: Error,
            },
            _ => StatusDescription {
                title: "Unexpected Response".to_string(),
                message: format!("The server returned an unexpected response (HTTP {}).", status),
                severity: Info,
            },
        }
    }

    fn describe_network_failure(&self, kind: TransportErrorKind) -> StatusDescription {
        match kind {
            TransportErrorKind::Timeout => StatusDescription::new(
                "Request Timeout",
                "The request timed out. Please check your connection and try again.",
                Severity::Warning,
            ),
            _ => StatusDescription::new(
                "Network Error",
                "Unable to reach the server. Please check your connection and try again.",
                Severity::Error,
            ),
        }
    }

    fn is_transient(&self, status: Option<u16>) -> bool {
        match status {
            None => true,
            Some(status) => matches!(status, 408 | 429 | 500..=599),
        }
    }
}
