mod auth;
mod oauth;
mod workspace;

pub use auth::AuthError;
pub use oauth::OauthError;
pub use workspace::{ApiErrorBody, ApiErrorObject, StrategyFailure, WorkspaceError};

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
