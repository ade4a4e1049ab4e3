use crate::error::WorkspaceError;
use crate::remote::UPSTREAM_BODY_PREVIEW_CHARS;
use serde_json::{Map, Value};
use sheetwise_schema::{FallbackWriteRequest, FallbackWriteResponse};
use tracing::{debug, info, warn};
use url::Url;

/// User-provisioned write endpoint used when the authenticated API cannot write.
///
/// One POST per write, outside the gateway quotas: the endpoint is not the workspace service.
#[derive(Debug, Clone)]
pub struct FallbackWriter {
    http: reqwest::Client,
    url: Url,
}

impl FallbackWriter {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// POST `{action, resourceId, ...params}`; an `error` field in the reply fails the write.
    pub async fn send(
        &self,
        action: &str,
        resource_id: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, WorkspaceError> {
        let body = FallbackWriteRequest {
            action: action.to_string(),
            resource_id: resource_id.to_string(),
            params,
        };
        let resp = self.http.post(self.url.clone()).json(&body).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        let parsed: Option<FallbackWriteResponse> = serde_json::from_slice(&bytes).ok();
        if let Some(message) = parsed.as_ref().and_then(FallbackWriteResponse::error_message) {
            warn!(action, %status, error = %message, "Fallback endpoint rejected write");
            return Err(WorkspaceError::Fallback(message));
        }
        if !status.is_success() {
            let preview = String::from_utf8_lossy(&bytes);
            debug!(
                %status,
                body = %format!("{:.len$}", preview, len = UPSTREAM_BODY_PREVIEW_CHARS),
                "Fallback endpoint error body"
            );
            return Err(WorkspaceError::Fallback(format!(
                "endpoint answered {status}"
            )));
        }
        let Some(parsed) = parsed else {
            return Err(WorkspaceError::Fallback(
                "endpoint did not answer with a JSON object".to_string(),
            ));
        };

        info!(action, resource_id, "Write delivered via fallback endpoint");
        Ok(parsed.extra)
    }
}
