//! Credential lifecycle: configuration binding, token issuance and refresh, encryption at rest.

mod cipher;
mod config;
mod credentials;
mod endpoints;
mod manager;
mod service_account;

pub use cipher::CredentialCipher;
pub use config::AuthConfig;
pub use credentials::Credentials;
pub use manager::{Authorizer, CredentialManager};
pub use service_account::ServiceAccountKey;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Oauth2,
    ServiceAccount,
    ApiKey,
}

impl AuthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthMode::Oauth2 => "oauth2",
            AuthMode::ServiceAccount => "service_account",
            AuthMode::ApiKey => "api_key",
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
