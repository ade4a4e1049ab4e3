use super::endpoints::OauthTokenResponse;
use chrono::{DateTime, Duration, Utc};
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this many minutes before their real expiry.
const VALIDITY_BUFFER_MINUTES: i64 = 10;
/// Window in which a token with a refresh token should be renewed ahead of time.
const PROACTIVE_REFRESH_MINUTES: i64 = 20;

/// Live token set. Never persisted in plaintext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expiry_epoch_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Credentials {
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expiry_epoch_millis)
    }

    /// True iff the token outlives `now` by more than the validity buffer.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && self.expiry_epoch_millis
                > (now + Duration::minutes(VALIDITY_BUFFER_MINUTES)).timestamp_millis()
    }

    pub fn needs_proactive_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token.is_some()
            && self.expiry_epoch_millis
                <= (now + Duration::minutes(PROACTIVE_REFRESH_MINUTES)).timestamp_millis()
    }

    /// Build from a token endpoint response.
    ///
    /// Refresh responses usually omit `refresh_token`; the previous one is carried over.
    pub(crate) fn from_token_response(
        resp: &OauthTokenResponse,
        previous_refresh_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let lifetime = resp
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .unwrap_or(Duration::hours(1));
        let scope = resp.scopes().map(|scopes| {
            scopes
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });
        Self {
            access_token: resp.access_token().secret().clone(),
            refresh_token: resp
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| previous_refresh_token.map(str::to_string)),
            expiry_epoch_millis: (now + lifetime).timestamp_millis(),
            token_type: Some(resp.token_type().as_ref().to_string()),
            scope,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry", &self.expiry())
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(expires_in: Duration, refresh: bool) -> (Credentials, DateTime<Utc>) {
        let now = Utc::now();
        let c = Credentials {
            access_token: "at".to_string(),
            refresh_token: refresh.then(|| "rt".to_string()),
            expiry_epoch_millis: (now + expires_in).timestamp_millis(),
            token_type: None,
            scope: None,
        };
        (c, now)
    }

    #[test]
    fn validity_uses_ten_minute_buffer() {
        let (c, now) = creds(Duration::minutes(11), true);
        assert!(c.is_valid_at(now));
        let (c, now) = creds(Duration::minutes(9), true);
        assert!(!c.is_valid_at(now));
    }

    #[test]
    fn proactive_refresh_requires_refresh_token() {
        let (c, now) = creds(Duration::minutes(15), true);
        assert!(c.is_valid_at(now));
        assert!(c.needs_proactive_refresh_at(now));

        let (c, now) = creds(Duration::minutes(15), false);
        assert!(!c.needs_proactive_refresh_at(now));

        let (c, now) = creds(Duration::minutes(45), true);
        assert!(!c.needs_proactive_refresh_at(now));
    }

    #[test]
    fn debug_redacts_tokens() {
        let (c, _) = creds(Duration::minutes(30), true);
        let out = format!("{c:?}");
        assert!(!out.contains("\"at\""));
        assert!(!out.contains("\"rt\""));
    }

    #[test]
    fn serializes_camel_case() {
        let (c, _) = creds(Duration::minutes(30), true);
        let v = serde_json::to_value(&c).unwrap();
        assert!(v.get("accessToken").is_some());
        assert!(v.get("expiryEpochMillis").is_some());
        assert!(v.get("tokenType").is_none());
    }
}
