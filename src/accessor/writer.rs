use super::WorkspaceAccessor;
use crate::auth::{AuthMode, Authorizer};
use crate::error::{AuthError, WorkspaceError};
use crate::query::Operation;
use serde_json::{Value, json};
use std::future::Future;
use sheetwise_infer::{Record, a1_range, quote_sheet_name};
use sheetwise_schema::docs::{EndOfSegmentLocation, SubstringMatchCriteria};
use sheetwise_schema::sheets::{DimensionRange, SheetProperties};
use sheetwise_schema::{
    BatchUpdateDocumentRequest, BatchUpdateSpreadsheetRequest, DocRequest, SheetRequest,
};
use tracing::{info, warn};

fn remediation(reason: &str) -> String {
    format!(
        "authenticated write unavailable ({reason}) and no fallback write endpoint is configured; \
         authorize an account via GET /auth or set workspace.fallback_write_url"
    )
}

/// Authorizer for the remote calls of one write.
///
/// A call rejected as unauthorized triggers one token refresh per write, and only that call
/// is sent again; steps that already succeeded are not repeated.
struct WriteSession<'a> {
    accessor: &'a WorkspaceAccessor,
    operation: &'static str,
    auth: Authorizer,
    refreshed: bool,
}

impl<'a> WriteSession<'a> {
    async fn open(
        accessor: &'a WorkspaceAccessor,
        operation: &'static str,
    ) -> Result<Self, WorkspaceError> {
        let auth = accessor.credentials.authorizer().await?;
        if !auth.can_write() {
            return Err(AuthError::Config("API keys are read-only".to_string()).into());
        }
        Ok(Self {
            accessor,
            operation,
            auth,
            refreshed: false,
        })
    }

    async fn call<T, F, Fut>(&mut self, mut step: F) -> Result<T, WorkspaceError>
    where
        F: FnMut(Authorizer) -> Fut,
        Fut: Future<Output = Result<T, WorkspaceError>>,
    {
        match step(self.auth.clone()).await {
            Err(e) if e.is_unauthorized() && !self.refreshed => {
                warn!(operation = self.operation, "Write rejected as unauthorized; refreshing once");
                self.refreshed = true;
                self.accessor.credentials.refresh_tokens().await?;
                self.auth = self.accessor.credentials.authorizer().await?;
                step(self.auth.clone()).await
            }
            other => other,
        }
    }
}

impl WorkspaceAccessor {
    /// Authenticated API first, fallback endpoint second. Success drops the cached schema.
    pub(super) async fn write(
        &self,
        id: &str,
        op: &Operation,
    ) -> Result<Vec<Record>, WorkspaceError> {
        let mut record = self.dispatch_write(id, op).await?;
        self.cache.invalidate(id);
        record.insert("operation".to_string(), Value::from(op.name()));
        Ok(vec![record])
    }

    async fn dispatch_write(&self, id: &str, op: &Operation) -> Result<Record, WorkspaceError> {
        let reason = if self.credentials.has_write_credentials() {
            match self.api_write(id, op).await {
                Ok(mut record) => {
                    record.insert("via".to_string(), Value::from("api"));
                    return Ok(record);
                }
                Err(e) if e.is_auth_failure() => e.to_string(),
                Err(e) => return Err(e),
            }
        } else if self.credentials.mode() == AuthMode::ApiKey {
            "API keys are read-only".to_string()
        } else {
            "no OAuth credentials".to_string()
        };

        let Some(fallback) = &self.fallback else {
            return Err(WorkspaceError::WriteUnavailable(remediation(&reason)));
        };
        warn!(operation = op.name(), %reason, "Routing write to fallback endpoint");
        let mut record = fallback.send(op.name(), id, op.parameters()).await?;
        record.insert("via".to_string(), Value::from("fallback"));
        Ok(record)
    }

    async fn tab(
        &self,
        auth: &Authorizer,
        id: &str,
        sheet: Option<&str>,
    ) -> Result<SheetProperties, WorkspaceError> {
        let spreadsheet = self.sheets.get_spreadsheet(auth, id).await?;
        let tab = match sheet {
            Some(title) => spreadsheet.sheet(title),
            None => spreadsheet.first_sheet(),
        };
        tab.cloned().ok_or_else(|| {
            WorkspaceError::NotFound(match sheet {
                Some(title) => format!("tab {title:?} in spreadsheet {id}"),
                None => format!("spreadsheet {id} has no tabs"),
            })
        })
    }

    async fn api_write(&self, id: &str, op: &Operation) -> Result<Record, WorkspaceError> {
        let mut session = WriteSession::open(self, op.name()).await?;
        let outcome = match op {
            Operation::UpdateCells { range, values } => {
                let resp = session
                    .call(move |auth| async move {
                        self.sheets
                            .update_values(&auth, id, range, values.clone())
                            .await
                    })
                    .await?;
                json!({
                    "updatedRange": resp.updated_range,
                    "updatedRows": resp.updated_rows,
                    "updatedCells": resp.updated_cells,
                })
            }
            Operation::AppendRows { sheet, values } => {
                // Without a tab the service appends after the table on the first tab.
                let range = sheet
                    .as_deref()
                    .map_or_else(|| "A1".to_string(), quote_sheet_name);
                let range = range.as_str();
                let resp = session
                    .call(move |auth| async move {
                        self.sheets
                            .append_values(&auth, id, range, values.clone())
                            .await
                    })
                    .await?;
                json!({
                    "updatedRange": resp.updates.updated_range,
                    "updatedRows": resp.updates.updated_rows,
                    "tableRange": resp.table_range,
                })
            }
            Operation::InsertRows {
                sheet,
                start_index,
                count,
                values,
            } => {
                let sheet = sheet.as_deref();
                let tab = session
                    .call(move |auth| async move { self.tab(&auth, id, sheet).await })
                    .await?;
                let provided = values.as_ref().map_or(0, Vec::len) as u64;
                let count = count.unwrap_or(provided.max(1));
                let request = BatchUpdateSpreadsheetRequest {
                    requests: vec![SheetRequest::InsertDimension {
                        range: DimensionRange::rows(
                            tab.sheet_id,
                            *start_index,
                            start_index + count,
                        ),
                        inherit_from_before: *start_index > 0,
                    }],
                };
                let request = &request;
                session
                    .call(move |auth| async move {
                        self.sheets.batch_update(&auth, id, request.clone()).await
                    })
                    .await?;

                if let Some(values) = values.as_ref().filter(|v| !v.is_empty()) {
                    let first = usize::try_from(*start_index).map_err(|_| {
                        WorkspaceError::Validation("start_index is out of range".to_string())
                    })? + 1;
                    let width = values.iter().map(Vec::len).max().unwrap_or(1);
                    let range = a1_range(
                        Some(&tab.title),
                        width,
                        first,
                        Some(first + values.len() - 1),
                    );
                    let range = range.as_str();
                    let filled = session
                        .call(move |auth| async move {
                            self.sheets
                                .update_values(&auth, id, range, values.clone())
                                .await
                        })
                        .await;
                    if let Err(e) = filled {
                        warn!(
                            resource_id = id,
                            sheet = %tab.title,
                            start_index,
                            count,
                            error = %e,
                            "Rows were inserted but filling them failed; blank rows remain"
                        );
                        return Err(e);
                    }
                }
                json!({ "insertedRows": count, "startIndex": start_index, "sheet": tab.title })
            }
            Operation::DeleteRows {
                sheet,
                start_index,
                end_index,
            } => {
                let sheet = sheet.as_deref();
                let tab = session
                    .call(move |auth| async move { self.tab(&auth, id, sheet).await })
                    .await?;
                let request = BatchUpdateSpreadsheetRequest {
                    requests: vec![SheetRequest::DeleteDimension {
                        range: DimensionRange::rows(tab.sheet_id, *start_index, *end_index),
                    }],
                };
                let request = &request;
                session
                    .call(move |auth| async move {
                        self.sheets.batch_update(&auth, id, request.clone()).await
                    })
                    .await?;
                json!({ "deletedRows": end_index - start_index, "sheet": tab.title })
            }
            Operation::ClearRange { range } => {
                let resp = session
                    .call(move |auth| async move { self.sheets.clear_values(&auth, id, range).await })
                    .await?;
                json!({ "clearedRange": resp.cleared_range })
            }
            Operation::AppendText { text } => {
                let request = BatchUpdateDocumentRequest {
                    requests: vec![DocRequest::InsertText {
                        text: text.clone(),
                        end_of_segment_location: EndOfSegmentLocation::default(),
                    }],
                };
                let request = &request;
                session
                    .call(move |auth| async move {
                        self.docs.batch_update(&auth, id, request.clone()).await
                    })
                    .await?;
                json!({ "appendedChars": text.chars().count() })
            }
            Operation::ReplaceText {
                find,
                replace,
                match_case,
            } => {
                let request = BatchUpdateDocumentRequest {
                    requests: vec![DocRequest::ReplaceAllText {
                        contains_text: SubstringMatchCriteria {
                            text: find.clone(),
                            match_case: *match_case,
                        },
                        replace_text: replace.clone(),
                    }],
                };
                let request = &request;
                let resp = session
                    .call(move |auth| async move {
                        self.docs.batch_update(&auth, id, request.clone()).await
                    })
                    .await?;
                json!({ "occurrencesChanged": resp.occurrences_changed() })
            }
            read => {
                return Err(WorkspaceError::UnsupportedOperation(format!(
                    "{} is not a write",
                    read.name()
                )));
            }
        };
        info!(operation = op.name(), resource_id = id, "Write applied");
        Ok(match outcome {
            Value::Object(map) => map,
            _ => Record::new(),
        })
    }
}
