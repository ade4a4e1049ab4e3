use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct StoredCredentialBlob {
    pub account: String,
    pub blob: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
