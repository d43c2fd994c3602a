use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// Human readable "expires in" for a token expiration
pub fn describe_expiration(expires_at: DateTime<Utc>) -> String {
    let remaining = expires_at.timestamp() - now_i64();
    if remaining <= 0 {
        format!("expired at {}", expires_at.to_rfc3339())
    } else {
        format!("expires at {} (in {}s)", expires_at.to_rfc3339(), remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_and_future_expirations_are_described() {
        let past = DateTime::from_timestamp(now_i64() - 10, 0).unwrap();
        assert!(describe_expiration(past).starts_with("expired at"));

        let future = DateTime::from_timestamp(now_i64() + 3600, 0).unwrap();
        assert!(describe_expiration(future).contains("expires at"));
    }
}
