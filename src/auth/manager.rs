use super::endpoints::{OauthEndpoints, WorkspaceOauth2Client, build_oauth2_client};
use super::{AuthConfig, AuthMode, CredentialCipher, Credentials, ServiceAccountKey};
use crate::error::{AuthError, OauthError};
use crate::store::CredentialStore;
use crate::utils::jwt::email_from_id_token;
use chrono::Utc;
use oauth2::CsrfToken;
use std::sync::{PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// How an outbound request proves identity.
#[derive(Clone)]
pub enum Authorizer {
    Bearer(String),
    ApiKey(String),
}

impl Authorizer {
    pub fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Authorizer::Bearer(token) => req.bearer_auth(token),
            Authorizer::ApiKey(key) => req.query(&[("key", key)]),
        }
    }

    /// API keys are read-only.
    pub fn can_write(&self) -> bool {
        matches!(self, Authorizer::Bearer(_))
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authorizer::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Authorizer::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

/// Owns the live [`Credentials`] for one [`AuthConfig`].
///
/// Only refresh, exchange and revoke mutate the live copy, and refreshes are single-flight:
/// a caller that waited on the refresh lock reuses the token the previous holder installed.
pub struct CredentialManager {
    config: AuthConfig,
    http: reqwest::Client,
    cipher: CredentialCipher,
    store: Option<CredentialStore>,
    oauth: Option<WorkspaceOauth2Client>,
    service_key: Option<ServiceAccountKey>,
    live: RwLock<Option<Credentials>>,
    refresh_lock: Mutex<()>,
}

impl CredentialManager {
    pub async fn initialize(
        config: AuthConfig,
        cipher: CredentialCipher,
        http: reqwest::Client,
        store: Option<CredentialStore>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let oauth = match config.mode {
            AuthMode::Oauth2 => Some(build_oauth2_client(&config)?),
            _ => None,
        };
        let service_key = match (config.mode, config.service_account_key.as_deref()) {
            (AuthMode::ServiceAccount, Some(reference)) => {
                Some(ServiceAccountKey::load(reference).await?)
            }
            _ => None,
        };

        let mut live = config.credentials.clone();
        if live.is_none() && config.mode == AuthMode::Oauth2 {
            if let Some(store) = &store {
                live = load_persisted(store, &config.account, &cipher).await?;
            }
        }

        info!(
            mode = %config.mode,
            account = %config.account,
            has_credentials = live.is_some(),
            "Credential manager initialized"
        );

        Ok(Self {
            config,
            http,
            cipher,
            store,
            oauth,
            service_key,
            live: RwLock::new(live),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn mode(&self) -> AuthMode {
        self.config.mode
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn current_credentials(&self) -> Option<Credentials> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_token_valid(&self) -> bool {
        self.current_credentials()
            .is_some_and(|c| c.is_valid_at(Utc::now()))
    }

    pub fn needs_proactive_refresh(&self) -> bool {
        self.current_credentials()
            .is_some_and(|c| c.needs_proactive_refresh_at(Utc::now()))
    }

    /// True when writes can go through the authenticated API.
    pub fn has_write_credentials(&self) -> bool {
        match self.config.mode {
            AuthMode::ApiKey => false,
            AuthMode::ServiceAccount => true,
            AuthMode::Oauth2 => self.current_credentials().is_some(),
        }
    }

    pub fn validate_scopes<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.config.validate_scopes(required)
    }

    pub fn encrypt_credentials(&self, creds: &Credentials) -> Result<String, AuthError> {
        self.cipher.encrypt_credentials(creds)
    }

    pub fn decrypt_credentials(&self, blob: &str) -> Result<Credentials, AuthError> {
        self.cipher.decrypt_credentials(blob)
    }

    /// No-op while the token is valid; otherwise refreshes (or re-grants) it.
    ///
    /// Renewing ahead of expiry is left to callers, via [`Self::needs_proactive_refresh`]
    /// and [`Self::refresh_tokens`].
    pub async fn ensure_valid_auth(&self) -> Result<(), AuthError> {
        if self.config.mode == AuthMode::ApiKey || self.is_token_valid() {
            return Ok(());
        }
        self.refresh_tokens().await.map(|_| ())
    }

    /// Obtain new tokens and install them. Failures are not retried here.
    pub async fn refresh_tokens(&self) -> Result<Credentials, AuthError> {
        let seen = self.current_credentials().map(|c| c.access_token);
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.current_credentials() {
            if Some(&current.access_token) != seen.as_ref() && current.is_valid_at(Utc::now()) {
                debug!("Refresh already completed by a concurrent caller");
                return Ok(current);
            }
        }

        let fresh = match self.config.mode {
            AuthMode::ApiKey => {
                return Err(AuthError::Config(
                    "api_key mode has no token to refresh".to_string(),
                ));
            }
            AuthMode::Oauth2 => self.refresh_oauth2().await?,
            AuthMode::ServiceAccount => self.grant_service_account().await?,
        };
        self.install(fresh.clone()).await;
        Ok(fresh)
    }

    async fn refresh_oauth2(&self) -> Result<Credentials, AuthError> {
        let client = self.oauth_client()?;
        let current = self
            .current_credentials()
            .ok_or(AuthError::MissingCredentials)?;
        let refresh_token = current.refresh_token.as_deref().ok_or_else(|| {
            AuthError::TokenRefresh(OauthError::Other {
                message: "no refresh token; re-authorize".to_string(),
            })
        })?;

        let resp = OauthEndpoints::refresh(client, refresh_token, &self.http)
            .await
            .map_err(|e| {
                warn!(error = %e, "Token refresh failed");
                AuthError::TokenRefresh(e)
            })?;
        Ok(Credentials::from_token_response(
            &resp,
            Some(refresh_token),
            Utc::now(),
        ))
    }

    async fn grant_service_account(&self) -> Result<Credentials, AuthError> {
        let key = self.service_key.as_ref().ok_or_else(|| {
            AuthError::Config("service account key was not loaded".to_string())
        })?;
        let resp = key
            .exchange(&self.config.scopes, &self.config.token_url, &self.http)
            .await
            .map_err(|e| {
                warn!(client_email = %key.client_email, error = %e, "Service account grant failed");
                AuthError::TokenRefresh(e)
            })?;

        let now = Utc::now();
        info!(client_email = %key.client_email, "Service account token issued");
        Ok(Credentials {
            expiry_epoch_millis: (now + resp.lifetime()).timestamp_millis(),
            access_token: resp.access_token,
            refresh_token: None,
            token_type: resp.token_type,
            scope: Some(
                self.config
                    .scopes
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        })
    }

    /// Consent URL for the authorization-code flow. Empty `scopes` means the configured set.
    pub fn generate_auth_url(
        &self,
        scopes: &[String],
        state: Option<&str>,
    ) -> Result<(Url, CsrfToken), AuthError> {
        let client = self.oauth_client()?;
        let scopes: Vec<&str> = if scopes.is_empty() {
            self.config.scopes.iter().map(String::as_str).collect()
        } else {
            scopes.iter().map(String::as_str).collect()
        };
        Ok(OauthEndpoints::authorize_url(client, scopes, state))
    }

    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<Credentials, AuthError> {
        let client = self.oauth_client()?;
        let resp = OauthEndpoints::exchange_code(client, code, &self.http)
            .await
            .map_err(|e| {
                warn!(error = %e, "Authorization code exchange failed");
                AuthError::TokenExchange(e)
            })?;

        if let Some(email) = resp
            .extra_fields()
            .id_token
            .as_deref()
            .and_then(email_from_id_token)
        {
            info!(%email, "Authorized account");
        }

        let _guard = self.refresh_lock.lock().await;
        let previous = self.current_credentials().and_then(|c| c.refresh_token);
        let creds = Credentials::from_token_response(&resp, previous.as_deref(), Utc::now());
        self.install(creds.clone()).await;
        Ok(creds)
    }

    /// Revoke the grant upstream, then forget it locally and in the store.
    pub async fn revoke(&self) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;
        let token = self
            .current_credentials()
            .map(|c| c.refresh_token.unwrap_or(c.access_token))
            .ok_or(AuthError::MissingCredentials)?;

        OauthEndpoints::revoke(&self.config.revoke_url, &token, &self.http)
            .await
            .map_err(|e| AuthError::TokenRevoke(e.to_string()))?;

        *self.live.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(store) = &self.store {
            if let Err(e) = store.delete(&self.config.account).await {
                warn!(error = %e, "Failed to delete persisted credentials after revoke");
            }
        }
        info!(account = %self.config.account, "Credentials revoked");
        Ok(())
    }

    /// Credentials for the next outbound call, refreshing first when needed.
    pub async fn authorizer(&self) -> Result<Authorizer, AuthError> {
        if self.config.mode == AuthMode::ApiKey {
            let key = self
                .config
                .api_key
                .clone()
                .ok_or_else(|| AuthError::Config("auth.api_key is missing".to_string()))?;
            return Ok(Authorizer::ApiKey(key));
        }
        self.ensure_valid_auth().await?;
        self.current_credentials()
            .map(|c| Authorizer::Bearer(c.access_token))
            .ok_or(AuthError::MissingCredentials)
    }

    fn oauth_client(&self) -> Result<&WorkspaceOauth2Client, AuthError> {
        self.oauth.as_ref().ok_or_else(|| {
            AuthError::Config(format!(
                "authorization-code flow is unavailable in {} mode",
                self.config.mode
            ))
        })
    }

    async fn install(&self, creds: Credentials) {
        let persisted = match (&self.store, self.config.mode) {
            (Some(store), AuthMode::Oauth2) => Some((store, self.cipher.encrypt_credentials(&creds))),
            _ => None,
        };
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = Some(creds);

        match persisted {
            Some((store, Ok(blob))) => {
                if let Err(e) = store.save(&self.config.account, blob).await {
                    warn!(error = %e, "Failed to persist encrypted credentials");
                }
            }
            Some((_, Err(e))) => warn!(error = %e, "Failed to encrypt credentials for storage"),
            None => {}
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("config", &self.config)
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

async fn load_persisted(
    store: &CredentialStore,
    account: &str,
    cipher: &CredentialCipher,
) -> Result<Option<Credentials>, AuthError> {
    let row = match store.load(account).await {
        Ok(row) => row,
        Err(e) => {
            warn!(error = %e, "Credential store unavailable; starting without credentials");
            return Ok(None);
        }
    };
    let Some(row) = row else {
        return Ok(None);
    };
    match cipher.decrypt_credentials(&row.blob) {
        Ok(creds) => {
            info!(account, updated_at = %row.updated_at, "Loaded persisted credentials");
            Ok(Some(creds))
        }
        Err(e) if cipher.is_ephemeral() => {
            warn!(account, "Persisted credentials were sealed with another key; ignoring them");
            debug!(error = %e, "Decrypt failure detail");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
