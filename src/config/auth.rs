use crate::auth::AuthMode;
use serde::{Deserialize, Serialize};
use url::Url;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Credential settings (see `auth` table in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSettings {
    /// TOML: `auth.mode`. One of `oauth2`, `service_account`, `api_key`. Default: `oauth2`.
    #[serde(default)]
    pub mode: AuthMode,

    /// TOML: `auth.client_id`. Required for `oauth2`.
    #[serde(default)]
    pub client_id: Option<String>,

    /// TOML: `auth.client_secret`. Required for `oauth2`.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// TOML: `auth.redirect_uri`. Required for `oauth2`.
    #[serde(default)]
    pub redirect_uri: Option<Url>,

    /// Requested scopes.
    /// TOML: `auth.scopes`.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Path to a service-account JSON key, or the JSON itself.
    /// TOML: `auth.service_account_key`. Required for `service_account`.
    #[serde(default)]
    pub service_account_key: Option<String>,

    /// TOML: `auth.api_key`. Required for `api_key`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Secret the credential encryption key is derived from. Required unless `basic.dev_mode`.
    /// TOML: `auth.encryption_key`.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Label under which the encrypted credential blob is stored.
    /// TOML: `auth.account`. Default: `default`.
    #[serde(default = "default_account")]
    pub account: String,

    /// TOML: `auth.auth_url`.
    #[serde(default = "default_auth_url")]
    pub auth_url: Url,

    /// TOML: `auth.token_url`.
    #[serde(default = "default_token_url")]
    pub token_url: Url,

    /// TOML: `auth.revoke_url`.
    #[serde(default = "default_revoke_url")]
    pub revoke_url: Url,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scopes: default_scopes(),
            service_account_key: None,
            api_key: None,
            encryption_key: None,
            account: default_account(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            revoke_url: default_revoke_url(),
        }
    }
}

fn default_scopes() -> Vec<String> {
    [
        "https://www.googleapis.com/auth/spreadsheets",
        "https://www.googleapis.com/auth/documents",
        "https://www.googleapis.com/auth/drive.readonly",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_account() -> String {
    "default".to_string()
}

fn default_auth_url() -> Url {
    Url::parse(GOOGLE_AUTH_URL).expect("valid default auth url")
}

fn default_token_url() -> Url {
    Url::parse(GOOGLE_TOKEN_URL).expect("valid default token url")
}

fn default_revoke_url() -> Url {
    Url::parse(GOOGLE_REVOKE_URL).expect("valid default revoke url")
}
