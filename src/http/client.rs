//! Resilient API client.
//!
//! # Responsibilities
//! - Expose get/post/put/delete against one base destination
//! - Gate every attempt on the destination's circuit breaker
//! - Tag every physical attempt with a fresh correlation ID
//! - Retry transient failures with exponential backoff
//! - Normalize every failure into a `NormalizedError`
//!
//! # Attempt Flow
//! ```text
//! can_attempt()? ──no──▶ CIRCUIT_OPEN (transport never called)
//!      │yes
//!      ▼
//! send with new correlation ID, bounded by request_timeout_ms
//!      │
//!      ├─ success ─▶ record_success ─▶ payload
//!      ├─ cancelled ─▶ ClientError::Cancelled (breaker untouched)
//!      └─ failure ─▶ record_failure
//!                      │
//!           retries left && transient && can_attempt()?
//!                 │yes                         │no
//!      sleep base * 2^retry, start over    NormalizedError from last failure
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use crate::config::{
    validate_config, BreakerScope, CircuitBreakerConfig, ClientConfig, ClientSettings,
    ConfigError, PersistenceBackend, ValidationError,
};
use crate::http::error::{
    ClientError, ErrorDetail, NormalizedError, TransportError, DECODE_ERROR_CODE,
    INVALID_REQUEST_CODE,
};
use crate::http::request::{CorrelationIdSource, Method, RequestOptions, UuidCorrelationIds};
use crate::http::response::ApiResponse;
use crate::http::status::{DefaultErrorPolicy, ErrorPolicy};
use crate::http::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::observability::metrics;
use crate::persistence::{BreakerStore, FileStore, MemoryStore};
use crate::resilience::timeouts::{run_attempt, sleep_or_cancel, AttemptOutcome};
use crate::resilience::{
    BreakerRegistry, BreakerSnapshot, CircuitBreaker, CircuitState, Clock, RetryDecision,
    RetryPolicy, SystemClock,
};

const DEFAULT_KEY_PREFIX: &str = "circuit-breaker:";

/// Resilient client for one base destination.
///
/// Construct once at startup and share (it is `Send + Sync`; wrap in `Arc`).
pub struct ApiClient<T = ReqwestTransport> {
    config: ClientConfig,
    base: Url,
    transport: T,
    breakers: BreakerRegistry,
    retry: RetryPolicy,
    policy: Arc<dyn ErrorPolicy>,
    ids: Arc<dyn CorrelationIdSource>,
}

impl ApiClient<ReqwestTransport> {
    /// Build a reqwest-backed client from validated settings.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ConfigError> {
        validate_config(settings).map_err(ConfigError::Validation)?;

        let store: Arc<dyn BreakerStore> = match settings.persistence.backend {
            PersistenceBackend::Memory => Arc::new(MemoryStore::new()),
            PersistenceBackend::File => Arc::new(FileStore::new(&settings.persistence.path)),
        };

        ApiClient::builder(settings.client.clone(), ReqwestTransport::new())
            .breaker_config(settings.circuit_breaker)
            .store(store)
            .key_prefix(settings.persistence.key_prefix.clone())
            .build()
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn builder(config: ClientConfig, transport: T) -> ApiClientBuilder<T> {
        ApiClientBuilder {
            config,
            transport,
            breaker_config: CircuitBreakerConfig::default(),
            store: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            clock: None,
            policy: None,
            ids: None,
        }
    }

    /// GET `path` and decode the JSON payload.
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, ClientError> {
        self.send_json(Method::Get, path, None, options).await
    }

    /// POST `body` to `path`. A body serializing to `null` (e.g. `&()`) is omitted.
    pub async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = self.encode_body(body)?;
        self.send_json(Method::Post, path, body, options).await
    }

    /// PUT `body` to `path`. A body serializing to `null` is omitted.
    pub async fn put<B, R>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = self.encode_body(body)?;
        self.send_json(Method::Put, path, body, options).await
    }

    /// DELETE `path`.
    pub async fn delete<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, ClientError> {
        self.send_json(Method::Delete, path, None, options).await
    }

    /// Run one logical request and return the response without decoding it.
    pub async fn request_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.resolve(path)?;
        let headers = self.merge_headers(&options)?;
        let destination = self.breaker_key(&url);
        let breaker = self.breakers.get(&destination);
        let cancel = options.cancel.as_ref();
        let timeout = Duration::from_millis(self.config.request_timeout_ms);
        let started = Instant::now();
        let mut retries: u32 = 0;

        loop {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                metrics::record_request(method.as_str(), "cancelled", started.elapsed());
                return Err(ClientError::Cancelled);
            }

            if !breaker.can_attempt() {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    destination = %destination,
                    "Circuit open, failing fast"
                );
                metrics::record_circuit_rejection(&destination);
                metrics::record_request(method.as_str(), "circuit_open", started.elapsed());
                return Err(NormalizedError::circuit_open(&destination).into());
            }

            let correlation_id = self.ids.new_id();
            let mut attempt_headers = headers.clone();
            attempt_headers.push((self.config.correlation_header.clone(), correlation_id.clone()));

            let request = TransportRequest {
                method,
                url: url.clone(),
                headers: attempt_headers,
                query: options.query.clone(),
                body: body.clone(),
                response_type: options.response_type,
            };

            tracing::debug!(
                method = %method,
                path = %path,
                correlation_id = %correlation_id,
                attempt = retries + 1,
                "Dispatching request"
            );

            let failure = match run_attempt(self.transport.send(request), timeout, cancel).await {
                AttemptOutcome::Completed(Ok(response)) => {
                    breaker.record_success();
                    metrics::record_request(method.as_str(), "success", started.elapsed());
                    let correlation_id = response
                        .header(&self.config.correlation_header)
                        .map(str::to_string)
                        .unwrap_or(correlation_id);
                    return Ok(ApiResponse {
                        status: response.status,
                        headers: response.headers,
                        body: response.body,
                        correlation_id,
                    });
                }
                AttemptOutcome::Completed(Err(e)) => e,
                AttemptOutcome::TimedOut => TransportError::timeout(self.config.request_timeout_ms),
                AttemptOutcome::Cancelled => {
                    tracing::info!(
                        method = %method,
                        path = %path,
                        correlation_id = %correlation_id,
                        "Request cancelled by caller"
                    );
                    metrics::record_request(method.as_str(), "cancelled", started.elapsed());
                    return Err(ClientError::Cancelled);
                }
            };

            breaker.record_failure();
            tracing::warn!(
                method = %method,
                path = %path,
                status = ?failure.status,
                correlation_id = %correlation_id,
                error = %failure,
                "Request attempt failed"
            );

            let transient = self.policy.is_transient(failure.status);
            match self.retry.decide(retries, transient, || breaker.can_attempt()) {
                RetryDecision::Retry { delay } => {
                    tracing::info!(
                        method = %method,
                        path = %path,
                        attempt = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying request"
                    );
                    metrics::record_retry(method.as_str());
                    if sleep_or_cancel(delay, cancel).await {
                        metrics::record_request(method.as_str(), "cancelled", started.elapsed());
                        return Err(ClientError::Cancelled);
                    }
                    retries += 1;
                }
                RetryDecision::GiveUp(reason) => {
                    tracing::debug!(
                        method = %method,
                        path = %path,
                        reason = ?reason,
                        attempts = retries + 1,
                        "Giving up"
                    );
                    metrics::record_request(method.as_str(), "failure", started.elapsed());
                    return Err(self.normalize(&failure, &correlation_id).into());
                }
            }
        }
    }

    /// State of the breaker guarding the base destination.
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_state_for("")
    }

    /// State of the breaker that guards requests to `path`.
    pub fn circuit_state_for(&self, path: &str) -> CircuitState {
        self.breaker_for(path).state()
    }

    pub fn breaker_snapshot(&self, path: &str) -> BreakerSnapshot {
        self.breaker_for(path).snapshot()
    }

    /// Force the breaker guarding `path` closed.
    pub fn reset_circuit(&self, path: &str) {
        self.breaker_for(path).reset();
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn breaker_for(&self, path: &str) -> Arc<CircuitBreaker> {
        let key = match self.resolve(path) {
            Ok(url) => self.breaker_key(&url),
            Err(_) => self.destination_key(),
        };
        self.breakers.get(&key)
    }

    async fn send_json<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<R, ClientError> {
        let response = self.request_raw(method, path, body, options).await?;
        let status = response.status;
        let correlation_id = response.correlation_id;

        response.body.deserialize::<R>().map_err(|e| {
            ClientError::Api(NormalizedError {
                http_status: Some(status),
                correlation_id: Some(correlation_id),
                ..NormalizedError::new(format!("Failed to decode response: {}", e))
                    .with_code(DECODE_ERROR_CODE)
            })
        })
    }

    fn encode_body<B: Serialize + ?Sized>(&self, body: &B) -> Result<Option<Value>, ClientError> {
        match serde_json::to_value(body) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(invalid_request(format!("Failed to encode request body: {}", e))),
        }
    }

    /// Join `path` onto the base destination, keeping the base path.
    fn resolve(&self, path: &str) -> Result<Url, ClientError> {
        let joined = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| invalid_request(format!("Invalid request path '{}': {}", path, e)))
    }

    /// Default headers overridden by per-call headers, validated up front so a
    /// malformed header never reaches the transport or the breaker.
    fn merge_headers(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<(String, String)>, ClientError> {
        let mut merged: BTreeMap<String, (String, String)> = self
            .config
            .default_headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), (k.clone(), v.clone())))
            .collect();
        for (k, v) in &options.headers {
            merged.insert(k.to_ascii_lowercase(), (k.clone(), v.clone()));
        }
        merged.remove(&self.config.correlation_header.to_ascii_lowercase());

        for (name, value) in merged.values() {
            if HeaderName::from_bytes(name.as_bytes()).is_err()
                || HeaderValue::from_str(value).is_err()
            {
                return Err(invalid_request(format!("Invalid request header '{}'", name)));
            }
        }
        Ok(merged.into_values().collect())
    }

    fn destination_key(&self) -> String {
        self.base.as_str().trim_end_matches('/').to_string()
    }

    /// Breaker key for an already resolved request URL.
    ///
    /// Endpoint keys come from the normalized URL, so dot segments in the
    /// caller's path cannot key one endpoint while requesting another.
    fn breaker_key(&self, url: &Url) -> String {
        let base = self.destination_key();
        if self.config.breaker_scope == BreakerScope::Destination {
            return base;
        }

        let base_path = self.base.path().trim_end_matches('/');
        let within_base = url
            .path()
            .strip_prefix(base_path)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'));

        match within_base {
            Some(rest) => match first_segment(rest) {
                Some(segment) => format!("{}/{}", base, segment),
                None => base,
            },
            // Normalized outside the base path: key by origin + first segment.
            None => {
                let origin = url.origin().ascii_serialization();
                match first_segment(url.path()) {
                    Some(segment) => format!("{}/{}", origin, segment),
                    None => origin,
                }
            }
        }
    }

    fn normalize(&self, failure: &TransportError, sent_correlation_id: &str) -> NormalizedError {
        let message = match failure.status {
            Some(status) => self.policy.describe(status).message,
            None => self.policy.describe_network_failure(failure.kind).message,
        };
        let correlation_id = failure
            .header(&self.config.correlation_header)
            .unwrap_or(sent_correlation_id)
            .to_string();

        let body = failure.body.as_ref().and_then(|b| b.as_json()).and_then(Value::as_object);
        let error_code = body.and_then(|b| b.get("code")).and_then(|code| match code {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let detail = body
            .and_then(|b| b.get("detail").or_else(|| b.get("details")))
            .and_then(ErrorDetail::from_value);

        NormalizedError {
            message,
            http_status: failure.status,
            error_code,
            correlation_id: Some(correlation_id),
            detail,
        }
    }
}

impl<T> fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("retry", &self.retry)
            .field("breakers", &self.breakers.len())
            .finish()
    }
}

fn first_segment(path: &str) -> Option<&str> {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

fn invalid_request(message: String) -> ClientError {
    ClientError::Api(NormalizedError::new(message).with_code(INVALID_REQUEST_CODE))
}

/// Assembles an [`ApiClient`] from its collaborators.
pub struct ApiClientBuilder<T> {
    config: ClientConfig,
    transport: T,
    breaker_config: CircuitBreakerConfig,
    store: Option<Arc<dyn BreakerStore>>,
    key_prefix: String,
    clock: Option<Arc<dyn Clock>>,
    policy: Option<Arc<dyn ErrorPolicy>>,
    ids: Option<Arc<dyn CorrelationIdSource>>,
}

impl<T: Transport> ApiClientBuilder<T> {
    pub fn breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    /// Where breaker state is persisted (default: in memory).
    pub fn store(mut self, store: Arc<dyn BreakerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn error_policy(mut self, policy: Arc<dyn ErrorPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn correlation_ids(mut self, ids: Arc<dyn CorrelationIdSource>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> Result<ApiClient<T>, ConfigError> {
        let base = Url::parse(&self.config.base_destination).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::new(
                "client.base_destination",
                format!("invalid URL: {}", e),
            )])
        })?;

        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let retry = RetryPolicy::new(
            self.config.max_retry_attempts,
            self.config.base_retry_delay_ms,
        );

        tracing::debug!(
            base = %base,
            max_retries = retry.max_retries,
            base_delay_ms = retry.base_delay_ms,
            failure_threshold = self.breaker_config.failure_threshold,
            "API client ready"
        );

        Ok(ApiClient {
            breakers: BreakerRegistry::new(self.breaker_config, store, clock, self.key_prefix),
            config: self.config,
            base,
            transport: self.transport,
            retry,
            policy: self.policy.unwrap_or_else(|| Arc::new(DefaultErrorPolicy)),
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidCorrelationIds)),
        })
    }
}
