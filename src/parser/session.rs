use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::client::SessionParseConfig;
use crate::store::token_pair::TokenPair;

/// Token pair plus the identity payload returned by login/refresh
#[derive(Debug, Clone)]
pub struct ParsedSession {
    pub pair: TokenPair,
    pub user: Value,
}

/// Extract the session from a login/refresh response body.
///
/// The access token is mandatory; refresh token and user are optional.
pub fn parse_session(body: &str, parse: &SessionParseConfig) -> Result<ParsedSession> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| anyhow!("response body is not valid JSON: {}", e))?;

    let access_token = json
        .pointer(&parse.access_token)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| anyhow!("access token '{}' not found or not a string", parse.access_token))?
        .to_owned();

    let refresh_token = match json.pointer(&parse.refresh_token) {
        Some(Value::String(token)) if !token.is_empty() => Some(token.to_owned()),
        Some(Value::Null) | None => None,
        Some(other) => {
            warn!(pointer = %parse.refresh_token, "refresh token is not a string ({}), ignored", kind(other));
            None
        }
    };

    let user = json.pointer(&parse.user).cloned().unwrap_or(Value::Null);
    debug!(has_refresh_token = refresh_token.is_some(), has_user = !user.is_null(), "session parsed");

    Ok(ParsedSession {
        pair: TokenPair::new(access_token, refresh_token),
        user,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
