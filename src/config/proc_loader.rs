use std::{fs, path::Path};
use crate::config::proc_initiator::initiate_default_values;
use crate::config::client::ServiceConfig;
use crate::config::proc_validator;
use crate::observability::metrics::get_metrics;
use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("cannot read config '{}': {}", path.display(), e))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let service_config: ServiceConfig = serde_yaml::from_str(&content)
        .inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.config_validation_errors.inc();
        })?;

    let service_config = initiate_default_values(service_config);
    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| {
            anyhow!(
                "config is not valid, total errors: {}\n{}",
                errors.len(),
                errors.join("\n")
            )
        })?;

    Ok(service_config)
}

/// Replace `${VAR}` and `${VAR:default}` with the environment value
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn expands_present_and_defaulted_vars() {
        std::env::set_var("BEARER_RELAY_TEST_HOST", "api.internal");
        std::env::remove_var("BEARER_RELAY_TEST_MISSING");

        let out = expand_env_vars(
            "url: https://${BEARER_RELAY_TEST_HOST}/v1\npath: ${BEARER_RELAY_TEST_MISSING:/tmp/session.json}\nempty: '${BEARER_RELAY_TEST_MISSING}'",
        )
        .unwrap();

        assert_eq!(
            out,
            "url: https://api.internal/v1\npath: /tmp/session.json\nempty: ''"
        );
        std::env::remove_var("BEARER_RELAY_TEST_HOST");
    }

    #[tokio::test]
    async fn parse_minimal_config_applies_defaults() {
        let cfg = parse_config("client:\n  base_url: http://localhost:9000/api/\n".to_owned())
            .await
            .unwrap();

        assert_eq!(cfg.client.base_url, "http://localhost:9000/api");
        assert_eq!(cfg.client.auth_failure_statuses, vec![401]);
        assert_eq!(cfg.refresh.path, "/auth/refresh");
        assert_eq!(cfg.refresh.method, http::Method::POST);
        assert_eq!(cfg.refresh.parse.access_token, "/accessToken");
        assert_eq!(cfg.login.path, "/auth/login");
        assert!(cfg.settings.logging.is_some());
    }

    #[tokio::test]
    async fn parse_rejects_invalid_config_with_all_errors() {
        let raw = r#"
client:
  base_url: "localhost:9000"
  timeout_ms: 0
  auth_failure_statuses: []
refresh:
  path: "auth/refresh"
  method: GET
store:
  type: file
"#;
        let err = parse_config(raw.to_owned()).await.unwrap_err().to_string();

        assert!(err.contains("config is not valid"), "{}", err);
        assert!(err.contains("client.base_url"), "{}", err);
        assert!(err.contains("client.timeout_ms"), "{}", err);
        assert!(err.contains("client.auth_failure_statuses"), "{}", err);
        assert!(err.contains("refresh.method"), "{}", err);
        assert!(err.contains("store.path"), "{}", err);
    }
}
