use std::path::Path;
use anyhow::{anyhow, Result};
use tracing::info;

use crate::ServiceConfig;
use crate::config::proc_loader::file_to_config;

pub async fn run(config_path: &str) -> Result<ServiceConfig> {
    let path = Path::new(config_path);
    let service_config = file_to_config(path)
        .await
        .map_err(|e| anyhow!("invalid config '{}': {}", config_path, e))?;
    info!(
        base_url = %service_config.client.base_url,
        store = ?service_config.store.store_type,
        "config loaded"
    );
    Ok(service_config)
}
