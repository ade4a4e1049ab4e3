//! Clients for the remote workspace service. Every call goes through the [`crate::gateway::Gateway`].

mod docs;
mod drive;
mod http;
mod public;
mod range;
mod resource;
mod sheets;

pub use docs::DocsApi;
pub use drive::DriveApi;
pub use http::{UPSTREAM_BODY_PREVIEW_CHARS, build_client, build_export_client};
pub use public::PublicExport;
pub use range::A1Range;
pub use resource::{ResourceHandle, ResourceKind, is_valid_resource_id};
pub use sheets::SheetsApi;
