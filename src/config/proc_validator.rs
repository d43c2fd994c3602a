//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks client, refresh, login, store and logging invariants

use http::{Method, StatusCode};
use tracing::{error, info};

use crate::config::client::{ClientConfig, LoginConfig, RefreshConfig, SessionParseConfig};
use crate::config::settings::SettingsConfig;
use crate::config::store::{StoreConfig, StoreType};
use crate::observability::metrics::get_metrics;
use crate::ServiceConfig;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_client(&cfg.client, &mut errors);
    validate_refresh(&cfg.refresh, &mut errors);
    validate_login(&cfg.login, &mut errors);
    validate_store(&cfg.store, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

/// CLIENT VALIDATION
fn validate_client(client: &ClientConfig, errors: &mut Vec<String>) {
    if !(client.base_url.starts_with("http://") || client.base_url.starts_with("https://")) {
        errors.push(format!(
            "client.base_url '{}' must start with http:// or https://",
            client.base_url
        ));
    }
    if client.timeout_ms == 0 {
        errors.push("client.timeout_ms must be > 0".to_string());
    }
    if client.queue_timeout_ms == 0 {
        errors.push("client.queue_timeout_ms must be > 0".to_string());
    }
    if client.auth_failure_statuses.is_empty() {
        errors.push("client.auth_failure_statuses must contain at least one status".to_string());
    }
    for status in &client.auth_failure_statuses {
        match StatusCode::from_u16(*status) {
            Ok(code) if code.is_client_error() => {}
            _ => errors.push(format!(
                "client.auth_failure_statuses entry {} must be a 4xx status",
                status
            )),
        }
    }
}

/// REFRESH VALIDATION
fn validate_refresh(refresh: &RefreshConfig, errors: &mut Vec<String>) {
    if refresh.method != Method::POST {
        errors.push(format!(
            "refresh.method '{}' invalid; the refresh endpoint is called with POST",
            refresh.method
        ));
    }
    if refresh.timeout_ms == 0 {
        errors.push("refresh.timeout_ms must be > 0".to_string());
    }
    validate_parse("refresh.parse", &refresh.parse, errors);
}

/// LOGIN VALIDATION
fn validate_login(login: &LoginConfig, errors: &mut Vec<String>) {
    if login.timeout_ms == 0 {
        errors.push("login.timeout_ms must be > 0".to_string());
    }
    if let Some(parse) = &login.parse {
        validate_parse("login.parse", parse, errors);
    }
}

fn validate_parse(path: &str, parse: &SessionParseConfig, errors: &mut Vec<String>) {
    if !parse.access_token.starts_with('/') {
        errors.push(format!(
            "{}.access_token '{}' must be a JSON pointer starting with '/'",
            path, parse.access_token
        ));
    }
    // empty pointer addresses the whole document
    for (field, pointer) in [("refresh_token", &parse.refresh_token), ("user", &parse.user)] {
        if !pointer.is_empty() && !pointer.starts_with('/') {
            errors.push(format!(
                "{}.{} '{}' must be empty or a JSON pointer starting with '/'",
                path, field, pointer
            ));
        }
    }
}

/// STORE VALIDATION
fn validate_store(store: &StoreConfig, errors: &mut Vec<String>) {
    match store.store_type {
        StoreType::File => match &store.path {
            Some(p) if !p.trim().is_empty() => {}
            _ => errors.push("store.path is required when store.type = file".to_string()),
        },
        StoreType::Memory | StoreType::None => {
            if store.path.is_some() {
                errors.push(format!(
                    "store.path is only meaningful when store.type = file (got {:?})",
                    store.store_type
                ));
            }
        }
    }
}
