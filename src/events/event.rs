use serde_json::Value;

/// Lifecycle notification. Published once, never retained.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    Login { user: Value, access_token: String },
    Logout,
    Refreshed { access_token: String },
    Unauthorized,
}

impl AuthEvent {
    /// Stable label for logs and metrics; never carries token material
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::Login { .. } => "login",
            AuthEvent::Logout => "logout",
            AuthEvent::Refreshed { .. } => "refreshed",
            AuthEvent::Unauthorized => "unauthorized",
        }
    }
}
