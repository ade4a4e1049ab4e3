//! Persistent storage for encrypted credential blobs.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)

pub mod actor;
pub mod models;
pub mod schema;

pub use actor::{CredentialStore, spawn};
pub use models::StoredCredentialBlob;
pub use schema::SQLITE_INIT;
