//! Shared constants and invariants

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

// Session response pointers (RFC 6901)
pub const DEFAULT_ACCESS_TOKEN_POINTER: &str = "/accessToken";
pub const DEFAULT_REFRESH_TOKEN_POINTER: &str = "/refreshToken";
pub const DEFAULT_USER_POINTER: &str = "/user";

// Persisted session keys
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
