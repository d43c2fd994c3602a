use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::client::{ClientConfig, LoginConfig, SessionParseConfig};
use crate::error::{AuthError, RefreshFailure, RefreshFailureKind};
use crate::events::bus::AuthEventBus;
use crate::events::event::AuthEvent;
use crate::parser::session::{parse_session, ParsedSession};
use crate::store::token_pair::TokenPair;
use crate::store::token_store::TokenStore;

/// Login / logout paths. They touch the store and the event bus only; an
/// in-flight refresh is left to complete and drain on its own.
#[derive(Clone)]
pub struct Session {
    client: Client,
    login_url: String,
    login_timeout: Duration,
    parse: SessionParseConfig,
    store: Arc<dyn TokenStore>,
    events: AuthEventBus,
}

impl Session {
    pub fn new(
        client: Client,
        client_cfg: &ClientConfig,
        login_cfg: &LoginConfig,
        store: Arc<dyn TokenStore>,
        events: AuthEventBus,
    ) -> Self {
        Self {
            client,
            login_url: format!("{}{}", client_cfg.base_url, login_cfg.path),
            login_timeout: Duration::from_millis(login_cfg.timeout_ms),
            parse: login_cfg.parse.clone().unwrap_or_default(),
            store,
            events,
        }
    }

    pub fn current(&self) -> Option<TokenPair> {
        self.store.get()
    }

    /// POST the credentials to the login endpoint with the bare client
    pub async fn login(&self, credentials: Value) -> Result<ParsedSession, AuthError> {
        info!("login call to '{}'", self.login_url);
        let response = self
            .client
            .post(&self.login_url)
            .json(&credentials)
            .timeout(self.login_timeout)
            .send()
            .await
            .map_err(|e| AuthError::LoginFailure(RefreshFailure::from_transport(&e, self.login_timeout)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "login rejected");
            return Err(AuthError::LoginFailure(RefreshFailure::from_status(
                status,
                status.is_client_error(),
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::LoginFailure(RefreshFailure::from_transport(&e, self.login_timeout)))?;
        let session = parse_session(&body, &self.parse).map_err(|e| {
            AuthError::LoginFailure(RefreshFailure::new(RefreshFailureKind::Malformed, Some(status), e.to_string()))
        })?;

        self.establish(session.user.clone(), session.pair.clone());
        Ok(session)
    }

    /// Adopt a pair obtained elsewhere
    pub fn establish(&self, user: Value, pair: TokenPair) {
        self.store.set(&pair);
        info!("session established");
        self.events.emit(&AuthEvent::Login {
            user,
            access_token: pair.access_token,
        });
    }

    pub fn logout(&self) {
        self.store.clear();
        info!("session cleared by logout");
        self.events.emit(&AuthEvent::Logout);
    }
}
