use super::{DataAccessor, FallbackWriter};
use crate::auth::CredentialManager;
use crate::config::{GatewayConfig, WorkspaceSettings};
use crate::error::WorkspaceError;
use crate::gateway::{Gateway, GatewayStats};
use crate::query::{Operation, PageLimits, parse_query};
use crate::remote::{
    DocsApi, DriveApi, PublicExport, ResourceHandle, ResourceKind, SheetsApi, build_client,
    build_export_client,
};
use async_trait::async_trait;
use serde_json::Value;
use sheetwise_infer::{InferenceOptions, InferredTable, Record, SchemaCache};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Accessor bound to one spreadsheet or document.
pub struct WorkspaceAccessor {
    pub(super) handle: ResourceHandle,
    pub(super) gateway: Arc<Gateway>,
    pub(super) credentials: Arc<CredentialManager>,
    pub(super) sheets: SheetsApi,
    pub(super) docs: DocsApi,
    pub(super) drive: DriveApi,
    pub(super) public: PublicExport,
    pub(super) fallback: Option<FallbackWriter>,
    pub(super) cache: SchemaCache,
    pub(super) pages: PageLimits,
    pub(super) inference: InferenceOptions,
}

impl WorkspaceAccessor {
    /// Resolve the configured resource and start a gateway of its own.
    ///
    /// Must be called inside a tokio runtime.
    pub fn initialize(
        settings: &WorkspaceSettings,
        gateway_cfg: &GatewayConfig,
        credentials: Arc<CredentialManager>,
    ) -> Result<Self, WorkspaceError> {
        let resource = settings.resource.as_deref().ok_or_else(|| {
            WorkspaceError::Validation("workspace.resource is not set".to_string())
        })?;
        let handle = ResourceHandle::resolve(resource, settings.kind)?;

        let http = build_client(gateway_cfg)?;
        let redirecting = build_export_client(gateway_cfg)?;
        let gateway = Arc::new(Gateway::new(gateway_cfg));

        info!(
            resource_id = %handle.resource_id,
            kind = %handle.resource_kind,
            auth_mode = %credentials.mode(),
            fallback = settings.fallback_write_url.is_some(),
            "Workspace accessor initialized"
        );

        Ok(Self {
            sheets: SheetsApi::new(http.clone(), settings.sheets_base_url.clone(), gateway.clone()),
            docs: DocsApi::new(http.clone(), settings.docs_base_url.clone(), gateway.clone()),
            drive: DriveApi::new(http, settings.drive_base_url.clone(), gateway.clone()),
            public: PublicExport::new(
                redirecting.clone(),
                settings.public_base_url.clone(),
                gateway.clone(),
            ),
            fallback: settings
                .fallback_write_url
                .clone()
                .map(|url| FallbackWriter::new(redirecting, url)),
            cache: SchemaCache::new(settings.schema_cache_ttl_secs, 256),
            pages: PageLimits::new(settings.default_page_size, settings.max_page_size),
            inference: settings.inference_options(),
            handle,
            gateway,
            credentials,
        })
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub fn stats(&self) -> GatewayStats {
        self.gateway.stats()
    }

    fn check_kind(&self, op: &Operation) -> Result<(), WorkspaceError> {
        let mismatch = match self.handle.resource_kind {
            ResourceKind::Sheet => op.is_document_only(),
            ResourceKind::Document => op.is_sheet_only(),
        };
        if mismatch {
            return Err(WorkspaceError::UnsupportedOperation(format!(
                "{} is not available for a {}",
                op.name(),
                self.handle.resource_kind
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DataAccessor for WorkspaceAccessor {
    async fn execute_query(
        &self,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Record>, WorkspaceError> {
        if self.gateway.is_closed() {
            return Err(WorkspaceError::NotInitialized);
        }
        let parsed = parse_query(query, params)?;
        let op = parsed.operation;
        self.check_kind(&op)?;

        let target = parsed
            .resource_id
            .unwrap_or_else(|| self.handle.resource_id.clone());
        debug!(operation = op.name(), resource_id = %target, "Executing query");

        if op.is_write() {
            self.write(&target, &op).await
        } else {
            self.read(&target, &op).await
        }
    }

    async fn get_schema(&self) -> Result<Vec<InferredTable>, WorkspaceError> {
        if self.gateway.is_closed() {
            return Err(WorkspaceError::NotInitialized);
        }
        let id = self.handle.resource_id.as_str();
        if let Some(cached) = self.cache.get(id) {
            debug!(resource_id = id, "Schema cache hit");
            return Ok(cached.to_vec());
        }
        let tables = self.infer_schema(id).await?;
        Ok(self.cache.insert(id, tables).to_vec())
    }

    async fn test_connection(&self) -> bool {
        match self.metadata(&self.handle.resource_id).await {
            Ok(_) => true,
            Err(e) => {
                warn!(code = e.code(), error = %e, "Connection test failed");
                false
            }
        }
    }

    async fn close(&self) {
        self.gateway.cleanup().await;
        self.cache.invalidate(&self.handle.resource_id);
        info!(resource_id = %self.handle.resource_id, "Workspace accessor closed");
    }
}
