use super::http::{endpoint, execute_json};
use crate::auth::Authorizer;
use crate::error::WorkspaceError;
use crate::gateway::Gateway;
use sheetwise_schema::drive::{DOCUMENT_MIME, SPREADSHEET_MIME};
use sheetwise_schema::{DriveFile, FileList};
use std::sync::Arc;
use url::Url;

const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,webViewLink,trashed";

/// File listing and lookup, restricted to spreadsheets and documents.
#[derive(Clone)]
pub struct DriveApi {
    http: reqwest::Client,
    base: Url,
    gateway: Arc<Gateway>,
}

impl DriveApi {
    pub fn new(http: reqwest::Client, base: Url, gateway: Arc<Gateway>) -> Self {
        Self {
            http,
            base,
            gateway,
        }
    }

    pub async fn list_files(
        &self,
        auth: &Authorizer,
        name_contains: Option<&str>,
        page_size: usize,
    ) -> Result<FileList, WorkspaceError> {
        let mut url = endpoint(&self.base, &["files"])?;
        url.query_pairs_mut()
            .append_pair("q", &list_query(name_contains))
            .append_pair("pageSize", &page_size.to_string())
            .append_pair("orderBy", "modifiedTime desc")
            .append_pair("fields", &format!("nextPageToken,files({FILE_FIELDS})"));
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || auth.apply(http.get(url.clone()))).await
    }

    pub async fn get_file(
        &self,
        auth: &Authorizer,
        file_id: &str,
    ) -> Result<DriveFile, WorkspaceError> {
        let mut url = endpoint(&self.base, &["files", file_id])?;
        url.query_pairs_mut().append_pair("fields", FILE_FIELDS);
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || auth.apply(http.get(url.clone()))).await
    }
}

fn list_query(name_contains: Option<&str>) -> String {
    let mut q = format!(
        "trashed = false and (mimeType = '{SPREADSHEET_MIME}' or mimeType = '{DOCUMENT_MIME}')"
    );
    if let Some(name) = name_contains.filter(|n| !n.trim().is_empty()) {
        let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
        q.push_str(&format!(" and name contains '{escaped}'"));
    }
    q
}
