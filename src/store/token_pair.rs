use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Current credentials. Replaced wholesale, never patched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "access_token")]
    pub access_token: String,
    #[serde(rename = "refresh_token", default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// `exp` claim of the access token when it is a JWT.
    /// Opaque tokens yield `None`.
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        let payload = self.access_token.split('.').nth(1)?;
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: JwtClaims = serde_json::from_slice(&decoded).ok()?;
        DateTime::from_timestamp(claims.exp, 0)
    }
}

// keep token values out of logs
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field(ACCESS_TOKEN_KEY, &"***")
            .field(REFRESH_TOKEN_KEY, &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn sample_jwt(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "u-1", "exp": exp }).to_string());
        format!("{}.{}.", header, payload)
    }

    #[test]
    fn jwt_expiration_is_decoded() {
        let pair = TokenPair::new(sample_jwt(1_900_000_000), None);
        let exp = pair.access_expires_at().unwrap();
        assert_eq!(exp.timestamp(), 1_900_000_000);
    }

    #[test]
    fn opaque_token_has_no_expiration() {
        assert!(TokenPair::new("T2", None).access_expires_at().is_none());
        assert!(TokenPair::new("a.not-base64!.c", None).access_expires_at().is_none());
    }

    #[test]
    fn debug_output_hides_token_values() {
        let pair = TokenPair::new("secret-access", Some("secret-refresh".into()));
        let printed = format!("{:?}", pair);
        assert!(!printed.contains("secret"));
    }
}
