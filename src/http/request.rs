//! Outbound request description.
//!
//! # Responsibilities
//! - HTTP verbs the client exposes
//! - Per-call options (headers, query, response type, cancellation)
//! - Correlation ID generation (UUID v4), one per physical attempt

use std::fmt;

use crate::lifecycle::cancel::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the response body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Bytes,
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers; override the client's default headers.
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub response_type: ResponseType,
    pub cancel: Option<CancelToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn cancel_with(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Source of globally unique correlation IDs.
pub trait CorrelationIdSource: Send + Sync {
    fn new_id(&self) -> String;
}

/// Random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCorrelationIds;

impl CorrelationIdSource for UuidCorrelationIds {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
