use super::{AuthMode, Credentials};
use crate::config::AuthSettings;
use crate::error::AuthError;
use std::collections::BTreeSet;
use url::Url;

const READONLY_SUFFIX: &str = ".readonly";

/// Auth configuration bound to exactly one [`super::CredentialManager`].
#[derive(Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<Url>,
    /// Path to a service-account JSON key, or the inline JSON.
    pub service_account_key: Option<String>,
    pub api_key: Option<String>,
    pub scopes: BTreeSet<String>,
    /// Seed credentials; when absent the manager tries the encrypted store.
    pub credentials: Option<Credentials>,
    /// Label of the persisted credential blob.
    pub account: String,
    pub auth_url: Url,
    pub token_url: Url,
    pub revoke_url: Url,
}

impl AuthConfig {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self {
            mode: settings.mode,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            service_account_key: settings.service_account_key.clone(),
            api_key: settings.api_key.clone(),
            scopes: settings.scopes.iter().cloned().collect(),
            credentials: None,
            account: settings.account.clone(),
            auth_url: settings.auth_url.clone(),
            token_url: settings.token_url.clone(),
            revoke_url: settings.revoke_url.clone(),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Check that the fields required by `mode` are present.
    pub fn validate(&self) -> Result<(), AuthError> {
        fn required(value: Option<&str>, name: &str, mode: AuthMode) -> Result<(), AuthError> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(()),
                _ => Err(AuthError::Config(format!("{mode} mode requires auth.{name}"))),
            }
        }

        match self.mode {
            AuthMode::Oauth2 => {
                required(self.client_id.as_deref(), "client_id", self.mode)?;
                required(self.client_secret.as_deref(), "client_secret", self.mode)?;
                required(
                    self.redirect_uri.as_ref().map(Url::as_str),
                    "redirect_uri",
                    self.mode,
                )?;
            }
            AuthMode::ServiceAccount => {
                required(
                    self.service_account_key.as_deref(),
                    "service_account_key",
                    self.mode,
                )?;
            }
            AuthMode::ApiKey => required(self.api_key.as_deref(), "api_key", self.mode)?,
        }
        Ok(())
    }

    /// True iff every required scope, or its non-readonly variant, is configured.
    pub fn validate_scopes<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|scope| {
            let scope = scope.as_ref();
            self.scopes.contains(scope)
                || scope
                    .strip_suffix(READONLY_SUFFIX)
                    .is_some_and(|broader| self.scopes.contains(broader))
        })
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("service_account_key", &self.service_account_key.is_some())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("scopes", &self.scopes)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
