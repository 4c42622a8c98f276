use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Token pair as issued by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires.
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn from_tokens(tokens: AuthTokens, issued_at: DateTime<Utc>) -> Self {
        let expires_at = i64::try_from(tokens.expires_in)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
        }
    }

    /// A session counts as expired `skew` before its actual expiry, so a
    /// request never leaves with a token about to lapse.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let skew = TimeDelta::from_std(skew).unwrap_or(TimeDelta::zero());
        now + skew >= self.expires_at
    }

    pub fn is_expired(&self, skew: Duration) -> bool {
        self.is_expired_at(Utc::now(), skew)
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session() -> AuthSession {
        let issued = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();
        AuthSession::from_tokens(
            AuthTokens {
                access_token: "access".into(),
                refresh_token: "refresh".into(),
                expires_in: 3600,
            },
            issued,
        )
    }

    #[test]
    fn expiry_honours_skew() {
        let session = session();
        let skew = Duration::from_secs(30);
        let before = session.expires_at - TimeDelta::seconds(31);
        let inside = session.expires_at - TimeDelta::seconds(29);
        assert!(!session.is_expired_at(before, skew));
        assert!(session.is_expired_at(inside, skew));
    }

    #[test]
    fn serializes_expiry_as_millis() {
        let json = serde_json::to_value(session()).unwrap();
        assert_eq!(json["expiresAt"], 1_792_231_200_000i64);
        assert_eq!(json["accessToken"], "access");
    }
}
