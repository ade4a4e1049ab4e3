use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error as ThisError;

use super::IsRetryable;
use super::auth::AuthError;

/// One failed read strategy, reported when every strategy fails.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: String,
}

#[derive(Debug, ThisError)]
pub enum WorkspaceError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Daily request quota of {limit} exhausted")]
    RateLimitExceeded { limit: u64 },

    #[error("Upstream error {status}: {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        reason: Option<String>,
    },

    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: usize,
        last: Box<WorkspaceError>,
    },

    #[error("All read strategies failed")]
    ReadFailed { attempts: Vec<StrategyFailure> },

    #[error("Write unavailable: {0}")]
    WriteUnavailable(String),

    #[error("Fallback write endpoint reported: {0}")]
    Fallback(String),

    #[error("Request gateway is closed")]
    GatewayClosed,

    #[error("Accessor not initialized")]
    NotInitialized,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl WorkspaceError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkspaceError::InvalidQuery(_) => "INVALID_QUERY",
            WorkspaceError::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            WorkspaceError::Validation(_) => "VALIDATION_ERROR",
            WorkspaceError::NotFound(_) => "NOT_FOUND",
            WorkspaceError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            WorkspaceError::Upstream { status, .. } => match *status {
                StatusCode::TOO_MANY_REQUESTS => "RATE_LIMIT",
                StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
                StatusCode::FORBIDDEN => "PERMISSION_DENIED",
                StatusCode::NOT_FOUND => "NOT_FOUND",
                _ => "UPSTREAM_ERROR",
            },
            WorkspaceError::Transport(_) => "UPSTREAM_UNREACHABLE",
            WorkspaceError::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            WorkspaceError::ReadFailed { .. } => "READ_FAILED",
            WorkspaceError::WriteUnavailable(_) => "WRITE_UNAVAILABLE",
            WorkspaceError::Fallback(_) => "FALLBACK_ERROR",
            WorkspaceError::GatewayClosed => "GATEWAY_CLOSED",
            WorkspaceError::NotInitialized => "NOT_INITIALIZED",
            WorkspaceError::Auth(e) => e.code(),
            WorkspaceError::Store(_) | WorkspaceError::Database(_) => "INTERNAL_ERROR",
            WorkspaceError::Json(_) | WorkspaceError::Csv(_) => "BAD_UPSTREAM_PAYLOAD",
            WorkspaceError::Url(_) => "INVALID_URL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WorkspaceError::InvalidQuery(_)
            | WorkspaceError::UnsupportedOperation(_)
            | WorkspaceError::Validation(_)
            | WorkspaceError::Url(_) => StatusCode::BAD_REQUEST,
            WorkspaceError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkspaceError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            WorkspaceError::Upstream { status, .. } => *status,
            WorkspaceError::RetriesExhausted { last, .. } => last.status(),
            WorkspaceError::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            WorkspaceError::Transport(_)
            | WorkspaceError::ReadFailed { .. }
            | WorkspaceError::Fallback(_)
            | WorkspaceError::Json(_)
            | WorkspaceError::Csv(_) => StatusCode::BAD_GATEWAY,
            WorkspaceError::WriteUnavailable(_) => StatusCode::FORBIDDEN,
            WorkspaceError::GatewayClosed | WorkspaceError::NotInitialized => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WorkspaceError::Auth(e) => e.status(),
            WorkspaceError::Store(_) | WorkspaceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Innermost error, looking through retry wrapping.
    pub fn root(&self) -> &WorkspaceError {
        match self {
            WorkspaceError::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.root(),
            WorkspaceError::Upstream {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        )
    }

    /// The authenticated path is unusable: rejected or missing credentials, or no permission.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.root(),
            WorkspaceError::Auth(_)
                | WorkspaceError::Upstream {
                    status: StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN,
                    ..
                }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            WorkspaceError::NotFound(_)
                | WorkspaceError::Upstream {
                    status: StatusCode::NOT_FOUND,
                    ..
                }
        )
    }

    pub fn to_api_object(&self) -> ApiErrorObject {
        match self {
            WorkspaceError::Auth(e) => e.to_api_object(),
            WorkspaceError::Store(_) | WorkspaceError::Database(_) => ApiErrorObject {
                code: self.code().to_string(),
                message: "An internal server error occurred.".to_string(),
                details: None,
            },
            WorkspaceError::ReadFailed { attempts } => ApiErrorObject {
                code: self.code().to_string(),
                message: self.to_string(),
                details: Some(json!({ "attempts": attempts })),
            },
            WorkspaceError::RetriesExhausted { attempts, last } => ApiErrorObject {
                code: self.code().to_string(),
                message: self.to_string(),
                details: Some(json!({ "attempts": attempts, "last_code": last.code() })),
            },
            WorkspaceError::Upstream {
                reason: Some(reason),
                ..
            } => ApiErrorObject {
                code: self.code().to_string(),
                message: self.to_string(),
                details: Some(json!({ "reason": reason })),
            },
            _ => ApiErrorObject {
                code: self.code().to_string(),
                message: self.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
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

/// Standardized API error response payload.
#[derive(Debug, Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

impl IsRetryable for WorkspaceError {
    fn is_retryable(&self) -> bool {
        match self {
            WorkspaceError::Transport(e) => !e.is_decode() && !e.is_builder(),
            WorkspaceError::Upstream { status, .. } => matches!(
                *status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
            _ => false,
        }
    }
}
