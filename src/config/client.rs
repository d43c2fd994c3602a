use http::Method;
use serde::Deserialize;

use crate::config::settings::SettingsConfig;
use crate::config::store::StoreConfig;
use crate::utils::constants::{
    DEFAULT_ACCESS_TOKEN_POINTER, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_LOGIN_PATH,
    DEFAULT_QUEUE_TIMEOUT_MS, DEFAULT_REFRESH_PATH, DEFAULT_REFRESH_TOKEN_POINTER,
    DEFAULT_USER_POINTER,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub client: ClientConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// ================================
/// Authenticating client
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Prefix for every request path, e.g. `https://api.example.com/v1`
    pub base_url: String,
    /// Default per-request timeout
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// How long a caller parked behind a refresh waits for the refresh to resolve
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
    /// Response statuses treated as "credential rejected"
    #[serde(default = "default_auth_failure_statuses")]
    pub auth_failure_statuses: Vec<u16>,
}

/// ================================
/// Refresh endpoint
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_path")]
    pub path: String,
    #[serde(default = "default_refresh_method", with = "http_serde::method")]
    pub method: Method, // invariant: POST
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub parse: SessionParseConfig,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            path: default_refresh_path(),
            method: default_refresh_method(),
            timeout_ms: default_http_timeout_ms(),
            parse: SessionParseConfig::default(),
        }
    }
}

/// ================================
/// Login endpoint
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoginConfig {
    #[serde(default = "default_login_path")]
    pub path: String,
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Falls back to `refresh.parse` when absent
    pub parse: Option<SessionParseConfig>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            path: default_login_path(),
            timeout_ms: default_http_timeout_ms(),
            parse: None,
        }
    }
}

/// JSON pointers locating the session fields in a login/refresh response body
#[derive(Debug, Deserialize, Clone)]
pub struct SessionParseConfig {
    #[serde(default = "default_access_token_pointer")]
    pub access_token: String,
    #[serde(default = "default_refresh_token_pointer")]
    pub refresh_token: String,
    #[serde(default = "default_user_pointer")]
    pub user: String,
}

impl Default for SessionParseConfig {
    fn default() -> Self {
        Self {
            access_token: default_access_token_pointer(),
            refresh_token: default_refresh_token_pointer(),
            user: default_user_pointer(),
        }
    }
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_queue_timeout_ms() -> u64 {
    DEFAULT_QUEUE_TIMEOUT_MS
}

fn default_auth_failure_statuses() -> Vec<u16> {
    vec![401]
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_refresh_method() -> Method {
    Method::POST
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_access_token_pointer() -> String {
    DEFAULT_ACCESS_TOKEN_POINTER.to_string()
}

fn default_refresh_token_pointer() -> String {
    DEFAULT_REFRESH_TOKEN_POINTER.to_string()
}

fn default_user_pointer() -> String {
    DEFAULT_USER_POINTER.to_string()
}
