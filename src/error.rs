use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Why a refresh episode ended without a new token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailureKind {
    /// refresh endpoint rejected the presented credential
    Rejected,
    /// any other non-2xx answer
    Status,
    Network,
    Timeout,
    /// 2xx without a usable access token
    Malformed,
    /// nothing to present to the refresh endpoint
    NoSession,
}

impl RefreshFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshFailureKind::Rejected => "rejected",
            RefreshFailureKind::Status => "status",
            RefreshFailureKind::Network => "network",
            RefreshFailureKind::Timeout => "timeout",
            RefreshFailureKind::Malformed => "malformed",
            RefreshFailureKind::NoSession => "no_session",
        }
    }
}

/// Terminal outcome of one refresh (or login) call. Shared verbatim by every queued caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct RefreshFailure {
    pub kind: RefreshFailureKind,
    pub status: Option<StatusCode>,
    pub reason: String,
}

impl RefreshFailure {
    pub fn new(kind: RefreshFailureKind, status: Option<StatusCode>, reason: impl Into<String>) -> Self {
        Self { kind, status, reason: reason.into() }
    }

    pub(crate) fn from_status(status: StatusCode, rejected: bool) -> Self {
        if rejected {
            Self::new(RefreshFailureKind::Rejected, Some(status), format!("credential rejected with status {}", status))
        } else {
            Self::new(RefreshFailureKind::Status, Some(status), format!("unexpected status {}", status))
        }
    }

    pub(crate) fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::new(RefreshFailureKind::Timeout, None, format!("timed out after {:?}", timeout))
        } else {
            Self::new(RefreshFailureKind::Network, None, format!("transport error: {}", err))
        }
    }
}

/// Errors surfaced by the authenticating transport and the session paths.
///
/// Non-auth error responses are not errors here: they come back as `Ok(Response)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// no response at all
    #[error("network error: {0}")]
    Network(String),

    /// the call itself, or its wait behind a refresh, ran out of time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("token refresh failed: {0}")]
    RefreshFailure(RefreshFailure),

    /// credential rejected again after one refresh-and-retry cycle
    #[error("credential rejected after refresh (status {0})")]
    RetryExhausted(StatusCode),

    #[error("login failed: {0}")]
    LoginFailure(RefreshFailure),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// reply channel dropped without an answer
    #[error("request abandoned before completion")]
    Abandoned,
}

impl AuthError {
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            AuthError::Timeout(timeout)
        } else if err.is_builder() {
            AuthError::InvalidRequest(err.to_string())
        } else {
            AuthError::Network(err.to_string())
        }
    }

    /// Errors that end the whole session rather than a single call
    pub fn is_session_ending(&self) -> bool {
        matches!(self, AuthError::RefreshFailure(_))
    }
}
