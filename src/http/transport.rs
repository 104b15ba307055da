//! Request transport.
//!
//! # Responsibilities
//! - Perform one physical HTTP exchange
//! - Report non-success statuses as `TransportError` with headers and body
//! - Report connection failures without a status
//!
//! # Design Decisions
//! - No retries, timeouts or breaker logic here; the dispatcher owns those
//! - Header names are lowercased on the way out so lookups are uniform

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde_json::Value;
use url::Url;

use crate::http::error::{TransportError, TransportErrorKind};
use crate::http::request::{Method, ResponseType};
use crate::http::response::ResponseBody;

/// A fully resolved request for one attempt.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub response_type: ResponseType,
}

impl TransportRequest {
    /// Case-insensitive request header lookup (last value wins).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A 2xx response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Lowercase header names.
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl TransportResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Performs the network I/O for the dispatcher.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

/// Transport backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, pool settings).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if response_is_success(status) {
            Ok(TransportResponse {
                status,
                headers,
                body: ResponseBody::decode(&bytes, request.response_type),
            })
        } else {
            // Error bodies are always probed for JSON so codes can be extracted.
            let body = ResponseBody::decode(&bytes, ResponseType::Json);
            let body = (body != ResponseBody::Empty).then_some(body);
            Err(TransportError::status(status, headers, body))
        }
    }
}

fn response_is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if e.is_connect() {
        TransportErrorKind::Connect
    } else if e.is_body() || e.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Other
    };
    TransportError::network(kind, e.to_string())
}
