use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;

use crate::coordinator::coordinator::RefreshCoordinator;
use crate::events::bus::AuthEventBus;
use crate::observability::metrics::get_metrics;
use crate::session::manager::Session;
use crate::store::token_store::{build_token_store, TokenStore};
use crate::transport::authenticating::AuthenticatingTransport;
use crate::transport::refresh::RefreshTransport;
use crate::ServiceConfig;

/// All components wired from one config, sharing a store and an event bus
#[derive(Clone)]
pub struct Relay {
    pub transport: AuthenticatingTransport,
    pub session: Session,
    pub events: AuthEventBus,
    pub store: Arc<dyn TokenStore>,
}

impl Relay {
    pub async fn from_config(cfg: &ServiceConfig) -> Result<Self> {
        Self::with_store(cfg, build_token_store(&cfg.store)).await
    }

    pub async fn with_store(cfg: &ServiceConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        // metrics registry must exist before sync code paths look it up
        let _ = get_metrics().await;

        let client = Client::builder().build()?;
        let events = AuthEventBus::new();

        let refresher = RefreshTransport::new(client.clone(), &cfg.client, &cfg.refresh);
        let coordinator = Arc::new(RefreshCoordinator::new(refresher, store.clone(), events.clone()));
        let transport = AuthenticatingTransport::new(client.clone(), &cfg.client, store.clone(), coordinator);
        let session = Session::new(client, &cfg.client, &cfg.login, store.clone(), events.clone());

        Ok(Self { transport, session, events, store })
    }
}
