use crate::remote::ResourceKind;
use serde::{Deserialize, Serialize};
use sheetwise_infer::InferenceOptions;
use sheetwise_infer::cache::DEFAULT_SCHEMA_TTL_SECS;
use url::Url;

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/";
pub const DOCS_BASE_URL: &str = "https://docs.googleapis.com/v1/";
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3/";
pub const PUBLIC_BASE_URL: &str = "https://docs.google.com/";

/// Remote resource and read/write behaviour (see `workspace` table in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSettings {
    /// Resource id or full document/spreadsheet URL opened at startup.
    /// TOML: `workspace.resource`.
    #[serde(default)]
    pub resource: Option<String>,

    /// Kind assumed for a bare id.
    /// TOML: `workspace.kind`. Default: `sheet`.
    #[serde(default)]
    pub kind: ResourceKind,

    /// User-provisioned endpoint receiving `{action, resourceId, ...params}` writes.
    /// TOML: `workspace.fallback_write_url`.
    #[serde(default)]
    pub fallback_write_url: Option<Url>,

    /// TOML: `workspace.sheets_base_url`.
    #[serde(default = "default_sheets_base_url")]
    pub sheets_base_url: Url,

    /// TOML: `workspace.docs_base_url`.
    #[serde(default = "default_docs_base_url")]
    pub docs_base_url: Url,

    /// TOML: `workspace.drive_base_url`.
    #[serde(default = "default_drive_base_url")]
    pub drive_base_url: Url,

    /// Host of the unauthenticated export endpoints.
    /// TOML: `workspace.public_base_url`.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: Url,

    /// TOML: `workspace.default_page_size`. Default: `100`.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Hard ceiling for any single page, whatever the caller asks for.
    /// TOML: `workspace.max_page_size`. Default: `1000`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// TOML: `workspace.header_scan_rows`. Default: `30`.
    #[serde(default = "default_header_scan_rows")]
    pub header_scan_rows: usize,

    /// Data rows sampled for typing and semantic mapping.
    /// TOML: `workspace.preview_rows`. Default: `20`.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// TOML: `workspace.schema_cache_ttl_secs`. Default: `300`.
    #[serde(default = "default_schema_cache_ttl_secs")]
    pub schema_cache_ttl_secs: u64,
}

impl WorkspaceSettings {
    pub fn inference_options(&self) -> InferenceOptions {
        InferenceOptions {
            header_scan_rows: self.header_scan_rows.max(1),
            preview_rows: Some(self.preview_rows.max(1)),
        }
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            resource: None,
            kind: ResourceKind::default(),
            fallback_write_url: None,
            sheets_base_url: default_sheets_base_url(),
            docs_base_url: default_docs_base_url(),
            drive_base_url: default_drive_base_url(),
            public_base_url: default_public_base_url(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            header_scan_rows: default_header_scan_rows(),
            preview_rows: default_preview_rows(),
            schema_cache_ttl_secs: default_schema_cache_ttl_secs(),
        }
    }
}

fn default_sheets_base_url() -> Url {
    Url::parse(SHEETS_BASE_URL).expect("valid sheets base url")
}

fn default_docs_base_url() -> Url {
    Url::parse(DOCS_BASE_URL).expect("valid docs base url")
}

fn default_drive_base_url() -> Url {
    Url::parse(DRIVE_BASE_URL).expect("valid drive base url")
}

fn default_public_base_url() -> Url {
    Url::parse(PUBLIC_BASE_URL).expect("valid public base url")
}

fn default_page_size() -> usize {
    100
}

fn default_max_page_size() -> usize {
    1_000
}

fn default_header_scan_rows() -> usize {
    sheetwise_infer::header::HEADER_SCAN_ROWS
}

fn default_preview_rows() -> usize {
    sheetwise_infer::table::DEFAULT_PREVIEW_ROWS
}

fn default_schema_cache_ttl_secs() -> u64 {
    DEFAULT_SCHEMA_TTL_SECS
}
