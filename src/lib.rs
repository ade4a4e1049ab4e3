pub mod accessor;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod query;
pub mod remote;
pub mod server;
pub mod store;
pub(crate) mod utils;

pub use accessor::{DataAccessor, WorkspaceAccessor};
pub use error::{AuthError, WorkspaceError};
