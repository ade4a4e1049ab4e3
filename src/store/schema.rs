//! SQL DDL for initializing the database schema.

/// One encrypted blob (`ivHex:cipherHex`) per account label. No plaintext columns.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS encrypted_credentials (
    account TEXT PRIMARY KEY NOT NULL,
    blob TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL  -- RFC3339
);
"#;
