//! The accessor contract shared with the plain database connectors, and its workspace implementation.

mod fallback;
mod reader;
mod workspace;
mod writer;

pub use fallback::FallbackWriter;
pub use workspace::WorkspaceAccessor;

use crate::error::WorkspaceError;
use async_trait::async_trait;
use serde_json::Value;
use sheetwise_infer::{InferredTable, Record};

/// Record key naming the table a document row came from.
pub const TABLE_KEY: &str = "_table";

/// What an orchestrator can do with any bound data source.
///
/// Construction plays the role of `initialize`; implementations are bound to one resource
/// for their whole life.
#[async_trait]
pub trait DataAccessor: Send + Sync {
    /// Run a JSON operation descriptor with positional `$N` arguments.
    async fn execute_query(&self, query: &str, params: &[Value])
    -> Result<Vec<Record>, WorkspaceError>;

    async fn get_schema(&self) -> Result<Vec<InferredTable>, WorkspaceError>;

    async fn test_connection(&self) -> bool;

    /// Drain outstanding work. The accessor rejects calls afterwards.
    async fn close(&self);
}
