use std::time::Duration;

use http::{Method, StatusCode};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::client::{ClientConfig, RefreshConfig, SessionParseConfig};
use crate::error::{RefreshFailure, RefreshFailureKind};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::parser::session::parse_session;
use crate::store::token_pair::TokenPair;

static OK_MSG: &str = "ok";
static ERROR_MSG: &str = "error";

/// Outcome of a successful refresh
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub pair: TokenPair,
    pub user: Value,
}

/// Bare call path to the refresh endpoint.
///
/// Holds nothing but a plain client and the endpoint contract, so a rejected
/// refresh can only come back as an ordinary error.
#[derive(Debug, Clone)]
pub struct RefreshTransport {
    client: Client,
    url: String,
    method: Method,
    timeout: Duration,
    parse: SessionParseConfig,
    auth_failure_statuses: Vec<StatusCode>,
}

impl RefreshTransport {
    pub fn new(client: Client, client_cfg: &ClientConfig, refresh_cfg: &RefreshConfig) -> Self {
        Self {
            client,
            url: format!("{}{}", client_cfg.base_url, refresh_cfg.path),
            method: refresh_cfg.method.clone(),
            timeout: Duration::from_millis(refresh_cfg.timeout_ms),
            parse: refresh_cfg.parse.clone(),
            auth_failure_statuses: client_cfg
                .auth_failure_statuses
                .iter()
                .filter_map(|s| StatusCode::from_u16(*s).ok())
                .collect(),
        }
    }

    /// Exactly one call to the refresh endpoint presenting `current_access_token`.
    pub async fn refresh(&self, current_access_token: Option<&str>) -> Result<RefreshedSession, RefreshFailure> {
        let metrics = get_metrics().await;
        let Some(token) = current_access_token else {
            metrics.refresh_failures.with_label_values(&[RefreshFailureKind::NoSession.as_str()]).inc();
            return Err(RefreshFailure::new(
                RefreshFailureKind::NoSession,
                None,
                "no access token to present to the refresh endpoint",
            ));
        };

        metrics.refresh_attempts.inc();
        let start = get_instant();
        info!("refresh call to '{}'", self.url);

        let result = self.call(token).await;
        match &result {
            Ok(_) => {
                metrics.refresh_duration.with_label_values(&[OK_MSG]).observe(start.elapsed().as_secs_f64());
                debug!("refresh call succeeded");
            }
            Err(failure) => {
                metrics.refresh_duration.with_label_values(&[ERROR_MSG]).observe(start.elapsed().as_secs_f64());
                metrics.refresh_failures.with_label_values(&[failure.kind.as_str()]).inc();
                warn!(kind = failure.kind.as_str(), "refresh call failed: {}", failure);
            }
        }
        result
    }

    async fn call(&self, token: &str) -> Result<RefreshedSession, RefreshFailure> {
        let response = self
            .client
            .request(self.method.clone(), &self.url)
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RefreshFailure::from_transport(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshFailure::from_status(
                status,
                self.auth_failure_statuses.contains(&status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RefreshFailure::from_transport(&e, self.timeout))?;
        parse_session(&body, &self.parse)
            .map(|session| RefreshedSession { pair: session.pair, user: session.user })
            .map_err(|e| RefreshFailure::new(RefreshFailureKind::Malformed, Some(status), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    fn transport(server: &MockServer) -> RefreshTransport {
        let client_cfg: ClientConfig =
            serde_yaml::from_str(&format!("base_url: {}", server.base_url())).unwrap();
        RefreshTransport::new(Client::new(), &client_cfg, &RefreshConfig::default())
    }

    #[tokio::test]
    async fn presents_current_token_and_parses_new_pair() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST)
                .path("/auth/refresh")
                .header("Authorization", "Bearer T1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "accessToken": "T2", "refreshToken": null, "user": { "id": 1 } }));
        }).await;

        let session = transport(&server).refresh(Some("T1")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(session.pair, TokenPair::new("T2", None));
        assert_eq!(session.user, json!({ "id": 1 }));
    }

    #[tokio::test]
    async fn rejected_refresh_is_an_ordinary_failure() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(401);
        }).await;

        let failure = transport(&server).refresh(Some("T1")).await.unwrap_err();

        // exactly one call, no re-entry
        mock.assert_hits_async(1).await;
        assert_eq!(failure.kind, RefreshFailureKind::Rejected);
        assert_eq!(failure.status, Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn server_error_and_malformed_body_are_failures() {
        let server = MockServer::start_async().await;
        let mut outage = server.mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(500);
        }).await;
        let failure = transport(&server).refresh(Some("T1")).await.unwrap_err();
        assert_eq!(failure.kind, RefreshFailureKind::Status);
        outage.delete_async().await;

        server.mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).body("{\"user\":{}}");
        }).await;
        let failure = transport(&server).refresh(Some("T1")).await.unwrap_err();
        assert_eq!(failure.kind, RefreshFailureKind::Malformed);
    }

    #[tokio::test]
    async fn no_token_fails_without_network_call() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).json_body(json!({ "accessToken": "T2" }));
        }).await;

        let failure = transport(&server).refresh(None).await.unwrap_err();

        mock.assert_hits_async(0).await;
        assert_eq!(failure.kind, RefreshFailureKind::NoSession);
    }
}
