use std::sync::Arc;
use std::time::Duration;

use http::header::AUTHORIZATION;
use http::StatusCode;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::client::ClientConfig;
use crate::coordinator::coordinator::{Admission, RefreshCoordinator};
use crate::error::AuthError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::store::token_store::TokenStore;
use crate::transport::request::{RequestBody, RequestDescriptor};
use crate::transport::response::Response;

static NETWORK_MSG: &str = "network";
static TIMEOUT_MSG: &str = "timeout";

struct TransportInner {
    client: Client,
    base_url: String,
    default_timeout: Duration,
    queue_timeout: Duration,
    auth_failure_statuses: Vec<StatusCode>,
    store: Arc<dyn TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
}

/// Entry point for every outbound business call.
///
/// Attaches the stored bearer token, and on authentication failure parks the
/// call behind the coordinator's refresh. Callers never see refresh mechanics.
#[derive(Clone)]
pub struct AuthenticatingTransport {
    inner: Arc<TransportInner>,
}

impl AuthenticatingTransport {
    pub fn new(
        client: Client,
        cfg: &ClientConfig,
        store: Arc<dyn TokenStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                client,
                base_url: cfg.base_url.trim_end_matches('/').to_owned(),
                default_timeout: Duration::from_millis(cfg.timeout_ms),
                queue_timeout: Duration::from_millis(cfg.queue_timeout_ms),
                auth_failure_statuses: cfg
                    .auth_failure_statuses
                    .iter()
                    .filter_map(|s| StatusCode::from_u16(*s).ok())
                    .collect(),
                store,
                coordinator,
            }),
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.inner.coordinator
    }

    pub async fn get(&self, path: &str) -> Result<Response, AuthError> {
        self.send(RequestDescriptor::get(path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Response, AuthError> {
        self.send(RequestDescriptor::post(path).json(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Response, AuthError> {
        self.send(RequestDescriptor::put(path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, AuthError> {
        self.send(RequestDescriptor::delete(path)).await
    }

    /// Send with the current token. Any response that is not an authentication
    /// failure comes back unchanged, whatever its status.
    pub async fn send(&self, mut request: RequestDescriptor) -> Result<Response, AuthError> {
        let response = self.dispatch(&mut request).await?;
        if !self.is_auth_failure(response.status) {
            return Ok(response);
        }
        if request.retried {
            return Err(self.exhausted(&request, response.status).await);
        }

        request.retried = true;
        match self.inner.coordinator.admit(self, request) {
            Admission::Replay(request) => self.replay(request).await,
            Admission::Queued(queued) => {
                let reply = queued.wait(self.inner.queue_timeout).await;
                if matches!(&reply, Err(AuthError::Timeout(t)) if *t == self.inner.queue_timeout) {
                    warn!("gave up waiting for token refresh after {:?}", self.inner.queue_timeout);
                }
                reply
            }
        }
    }

    /// Second and last generation of a call: never goes back to the coordinator
    pub(crate) async fn replay(&self, mut request: RequestDescriptor) -> Result<Response, AuthError> {
        request.retried = true;
        let response = self.dispatch(&mut request).await?;
        if self.is_auth_failure(response.status) {
            return Err(self.exhausted(&request, response.status).await);
        }
        Ok(response)
    }

    fn is_auth_failure(&self, status: StatusCode) -> bool {
        self.inner.auth_failure_statuses.contains(&status)
    }

    async fn exhausted(&self, request: &RequestDescriptor, status: StatusCode) -> AuthError {
        warn!(method = %request.method, path = %request.path, "credential rejected again after refresh");
        get_metrics().await.retry_exhausted.inc();
        AuthError::RetryExhausted(status)
    }

    /// One network round trip with the token the store holds right now
    async fn dispatch(&self, request: &mut RequestDescriptor) -> Result<Response, AuthError> {
        let metrics = get_metrics().await;
        let method_label = request.method.as_str().to_owned();
        let timeout = request.timeout.unwrap_or(self.inner.default_timeout);
        let token = self.inner.store.get().map(|pair| pair.access_token);

        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), request.url(&self.inner.base_url))
            .timeout(timeout);

        for (key, value) in &request.headers {
            // the stored token owns the Authorization header
            if token.is_some() && key.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                continue;
            }
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Text(text)) => builder.body(text.clone()),
            None => builder,
        };
        request.sent_with = token;

        debug!(method = %request.method, path = %request.path, retried = request.retried, "sending request");
        let start = get_instant();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let err = AuthError::from_transport(err, timeout);
                let label = if matches!(err, AuthError::Timeout(_)) { TIMEOUT_MSG } else { NETWORK_MSG };
                metrics.requests.with_label_values(&[method_label.as_str(), label]).inc();
                return Err(err);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|err| AuthError::from_transport(err, timeout))?;

        metrics.request_duration.with_label_values(&[method_label.as_str()]).observe(start.elapsed().as_secs_f64());
        metrics.requests.with_label_values(&[method_label.as_str(), status_class(status)]).inc();
        if self.is_auth_failure(status) {
            metrics.auth_failures.inc();
            debug!(method = %request.method, path = %request.path, status = %status, "authentication failure");
        }

        Ok(Response { status, headers, body })
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
