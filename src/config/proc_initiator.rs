use crate::config::settings::LoggingConfig;
use crate::ServiceConfig;

pub fn initiate_default_values(mut config: ServiceConfig) -> ServiceConfig {
    if config.settings.logging.is_none() {
        config.settings.logging = Some(LoggingConfig::default());
    }

    // request paths are appended to base_url verbatim
    config.client.base_url = config.client.base_url.trim_end_matches('/').to_owned();
    config.refresh.path = leading_slash(&config.refresh.path);
    config.login.path = leading_slash(&config.login.path);

    // login responses share the refresh response contract unless told otherwise
    if config.login.parse.is_none() {
        config.login.parse = Some(config.refresh.parse.clone());
    }

    config
}

fn leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{}", path)
    }
}
