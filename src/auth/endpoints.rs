use super::AuthConfig;
use crate::error::{AuthError, OauthError};
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    ExtraTokenFields, RedirectUrl, RefreshToken, Scope, StandardRevocableToken,
    StandardTokenResponse, TokenUrl,
};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;
use url::Url;

/// Extra (non-standard) token response fields; `id_token` plus anything else Google adds.
#[derive(Clone, Deserialize, Serialize)]
pub(crate) struct CustomTokenFields {
    pub id_token: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ExtraTokenFields for CustomTokenFields {}

impl std::fmt::Debug for CustomTokenFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id_token = self.id_token.as_ref().map(|_| "<redacted>");
        let mut keys: Vec<&String> = self.extra.keys().collect();
        keys.sort();

        f.debug_struct("CustomTokenFields")
            .field("id_token", &id_token)
            .field("extra_keys", &keys)
            .finish()
    }
}

pub(crate) type OauthTokenResponse = StandardTokenResponse<CustomTokenFields, BasicTokenType>;

pub(crate) type WorkspaceOauth2Client<
    HasAuthUrl = oauth2::EndpointSet,
    HasDeviceAuthUrl = oauth2::EndpointNotSet,
    HasIntrospectionUrl = oauth2::EndpointNotSet,
    HasRevocationUrl = oauth2::EndpointNotSet,
    HasTokenUrl = oauth2::EndpointSet,
> = OAuth2Client<
    BasicErrorResponse,
    OauthTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    HasAuthUrl,
    HasDeviceAuthUrl,
    HasIntrospectionUrl,
    HasRevocationUrl,
    HasTokenUrl,
>;

/// Build the authorization-code client from a validated `oauth2` config.
pub(crate) fn build_oauth2_client(cfg: &AuthConfig) -> Result<WorkspaceOauth2Client, AuthError> {
    let client_id = cfg
        .client_id
        .as_deref()
        .ok_or_else(|| AuthError::Config("auth.client_id is missing".to_string()))?;
    let redirect = cfg
        .redirect_uri
        .as_ref()
        .ok_or_else(|| AuthError::Config("auth.redirect_uri is missing".to_string()))?;

    let mut client = OAuth2Client::<
        BasicErrorResponse,
        OauthTokenResponse,
        BasicTokenIntrospectionResponse,
        StandardRevocableToken,
        BasicRevocationErrorResponse,
    >::new(ClientId::new(client_id.to_string()));

    if let Some(secret) = cfg.client_secret.as_deref() {
        client = client.set_client_secret(ClientSecret::new(secret.to_string()));
    }

    let bad_url = |e: url::ParseError| AuthError::Config(format!("invalid OAuth2 URL: {e}"));
    Ok(client
        .set_auth_uri(AuthUrl::new(cfg.auth_url.to_string()).map_err(bad_url)?)
        .set_token_uri(TokenUrl::new(cfg.token_url.to_string()).map_err(bad_url)?)
        .set_redirect_uri(RedirectUrl::new(redirect.to_string()).map_err(bad_url)?))
}

/// Stateless OAuth2 calls against the configured endpoints.
pub(crate) struct OauthEndpoints;

impl OauthEndpoints {
    /// Consent URL asking for offline access so a refresh token is issued.
    pub(crate) fn authorize_url<'a>(
        client: &WorkspaceOauth2Client,
        scopes: impl IntoIterator<Item = &'a str>,
        state: Option<&str>,
    ) -> (Url, CsrfToken) {
        let state = state.map(str::to_string);
        let mut req = client
            .authorize_url(move || state.map_or_else(CsrfToken::new_random, CsrfToken::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");

        for scope in scopes {
            req = req.add_scope(Scope::new(scope.to_string()));
        }

        req.url()
    }

    pub(crate) async fn exchange_code(
        client: &WorkspaceOauth2Client,
        code: &str,
        http_client: &reqwest::Client,
    ) -> Result<OauthTokenResponse, OauthError> {
        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(http_client)
            .await?;
        info!("OAuth2 code exchange completed");
        Ok(token)
    }

    pub(crate) async fn refresh(
        client: &WorkspaceOauth2Client,
        refresh_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<OauthTokenResponse, OauthError> {
        let token = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http_client)
            .await?;
        info!("OAuth2 access token refreshed");
        Ok(token)
    }

    /// RFC 7009 revocation; the token travels as a query parameter like Google documents.
    pub(crate) async fn revoke(
        revoke_url: &Url,
        token: &str,
        http_client: &reqwest::Client,
    ) -> Result<(), OauthError> {
        let mut url = revoke_url.clone();
        url.query_pairs_mut().append_pair("token", token);
        let resp = http_client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(OauthError::UpstreamStatus(resp.status()));
        }
        Ok(())
    }
}
