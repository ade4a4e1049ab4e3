use super::oauth::OauthError;
use super::workspace::{ApiErrorBody, ApiErrorObject};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

/// Credential lifecycle failures. All are terminal: the caller has to intervene.
#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("Auth configuration error: {0}")]
    Config(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(#[source] OauthError),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(#[source] OauthError),

    #[error("Token revoke failed: {0}")]
    TokenRevoke(String),

    #[error("Credential encryption failed: {0}")]
    Encryption(String),

    #[error("Credential decryption failed: {0}")]
    Decryption(String),

    #[error("No credentials available; complete the authorization flow first")]
    MissingCredentials,

    #[error("Service account key invalid: {0}")]
    ServiceAccountKey(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Config(_) => "CONFIG_ERROR",
            AuthError::TokenExchange(_) => "TOKEN_EXCHANGE_FAILED",
            AuthError::TokenRefresh(_) => "TOKEN_REFRESH_FAILED",
            AuthError::TokenRevoke(_) => "TOKEN_REVOKE_FAILED",
            AuthError::Encryption(_) => "ENCRYPTION_FAILED",
            AuthError::Decryption(_) => "DECRYPTION_FAILED",
            AuthError::MissingCredentials => "MISSING_CREDENTIALS",
            AuthError::ServiceAccountKey(_) => "SERVICE_ACCOUNT_KEY_INVALID",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::TokenRefresh(_) | AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthError::TokenExchange(_) => StatusCode::FORBIDDEN,
            AuthError::TokenRevoke(_) => StatusCode::BAD_GATEWAY,
            AuthError::Config(_)
            | AuthError::Encryption(_)
            | AuthError::Decryption(_)
            | AuthError::ServiceAccountKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn to_api_object(&self) -> ApiErrorObject {
        let details = match self {
            AuthError::TokenExchange(e) | AuthError::TokenRefresh(e) => e
                .server_code()
                .map(|code| json!({ "oauth_error": code })),
            _ => None,
        };
        let message = match self {
            // Internal failures never echo key material or upstream bodies.
            AuthError::Encryption(_) | AuthError::Decryption(_) => {
                "Stored credentials could not be processed.".to_string()
            }
            other => other.to_string(),
        };
        ApiErrorObject {
            code: self.code().to_string(),
            message,
            details,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Auth error");
        } else {
            tracing::warn!(code = self.code(), error = %self, "Auth error");
        }
        (
            status,
            Json(ApiErrorBody {
                inner: self.to_api_object(),
            }),
        )
            .into_response()
    }
}
