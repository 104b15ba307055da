//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every problem is collected so a
//! broken config file is reported in one pass.

use std::fmt;

use reqwest::header::HeaderName;
use url::Url;

use crate::config::schema::{ClientSettings, PersistenceBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate settings, returning every error found.
pub fn validate_config(settings: &ClientSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&settings.client.base_destination) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "client.base_destination",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "client.base_destination",
            format!("invalid URL: {}", e),
        )),
    }

    if settings.client.request_timeout_ms == 0 {
        errors.push(ValidationError::new("client.request_timeout_ms", "must be greater than 0"));
    }

    if HeaderName::from_bytes(settings.client.correlation_header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "client.correlation_header",
            "not a valid header name",
        ));
    }

    for name in settings.client.default_headers.keys() {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "client.default_headers",
                format!("'{}' is not a valid header name", name),
            ));
        }
    }

    let breaker = &settings.circuit_breaker;
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_threshold",
            "must be greater than 0",
        ));
    }
    if breaker.success_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.success_threshold",
            "must be greater than 0",
        ));
    }
    if breaker.timeout_ms == 0 {
        errors.push(ValidationError::new("circuit_breaker.timeout_ms", "must be greater than 0"));
    }

    if settings.persistence.backend == PersistenceBackend::File
        && settings.persistence.path.trim().is_empty()
    {
        errors.push(ValidationError::new(
            "persistence.path",
            "required when backend is 'file'",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
