use super::http::{endpoint, execute_json};
use crate::auth::Authorizer;
use crate::error::WorkspaceError;
use crate::gateway::Gateway;
use sheetwise_schema::{BatchUpdateDocumentRequest, BatchUpdateDocumentResponse, Document};
use std::sync::Arc;
use url::Url;

#[derive(Clone)]
pub struct DocsApi {
    http: reqwest::Client,
    base: Url,
    gateway: Arc<Gateway>,
}

impl DocsApi {
    pub fn new(http: reqwest::Client, base: Url, gateway: Arc<Gateway>) -> Self {
        Self {
            http,
            base,
            gateway,
        }
    }

    pub async fn get_document(
        &self,
        auth: &Authorizer,
        document_id: &str,
    ) -> Result<Document, WorkspaceError> {
        let url = endpoint(&self.base, &["documents", document_id])?;
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || auth.apply(http.get(url.clone()))).await
    }

    pub async fn batch_update(
        &self,
        auth: &Authorizer,
        document_id: &str,
        request: BatchUpdateDocumentRequest,
    ) -> Result<BatchUpdateDocumentResponse, WorkspaceError> {
        let action = format!("{document_id}:batchUpdate");
        let url = endpoint(&self.base, &["documents", &action])?;
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || {
            auth.apply(http.post(url.clone())).json(&request)
        })
        .await
    }
}
