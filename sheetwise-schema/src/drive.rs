use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
pub const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    pub fn kind(&self) -> Option<&'static str> {
        match self.mime_type.as_str() {
            SPREADSHEET_MIME => Some("sheet"),
            DOCUMENT_MIME => Some("document"),
            _ => None,
        }
    }
}
