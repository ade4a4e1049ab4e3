use super::{TABLE_KEY, WorkspaceAccessor};
use crate::error::{StrategyFailure, WorkspaceError};
use crate::query::Operation;
use crate::remote::{A1Range, ResourceKind};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value, json};
use sheetwise_infer::{
    DocumentElement, DocumentInference, GridSource, Inference, InferredTable, Record,
    infer_document, infer_table, info_table, quote_sheet_name,
};
use sheetwise_schema::{Document, Spreadsheet};
use tracing::{info, warn};

const API: &str = "authenticated_api";
const PUBLIC: &str = "public_export";
/// Table name for a grid whose tab title is unknown (first tab of a public export).
const UNNAMED_TABLE: &str = "sheet";

struct Grid {
    sheet: Option<String>,
    /// Physical 1-based row of `rows[0]`.
    first_row: usize,
    /// Physical 0-based column of `rows[_][0]`.
    first_column: usize,
    rows: Vec<Vec<String>>,
}

type Attempt<'a, T> = (&'static str, BoxFuture<'a, Result<T, WorkspaceError>>);

/// Try each strategy in order; report every failure when none succeeds.
///
/// An exhausted daily quota or a closed gateway ends the read at once.
async fn first_success<T>(
    operation: &'static str,
    attempts: Vec<Attempt<'_, T>>,
) -> Result<T, WorkspaceError> {
    let mut failures = Vec::new();
    for (strategy, attempt) in attempts {
        match attempt.await {
            Ok(value) => {
                if !failures.is_empty() {
                    info!(operation, strategy, "Read served by fallback strategy");
                }
                return Ok(value);
            }
            Err(e) => {
                if matches!(
                    e.root(),
                    WorkspaceError::RateLimitExceeded { .. } | WorkspaceError::GatewayClosed
                ) {
                    return Err(e);
                }
                warn!(operation, strategy, code = e.code(), error = %e, "Read strategy failed");
                failures.push(StrategyFailure {
                    strategy: strategy.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    Err(WorkspaceError::ReadFailed { attempts: failures })
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Paragraphs and tables of a document body, in order.
pub(crate) fn document_elements(doc: &Document) -> Vec<DocumentElement> {
    doc.body
        .content
        .iter()
        .filter_map(|element| match (&element.paragraph, &element.table) {
            (Some(p), _) => Some(DocumentElement::Paragraph {
                style: p.style_name().to_string(),
                text: p.text(),
            }),
            (None, Some(table)) => Some(DocumentElement::Table {
                rows: table.to_grid(),
            }),
            (None, None) => None,
        })
        .collect()
}

/// Plain-text export: one paragraph per line, no tables.
pub(crate) fn text_elements(text: &str) -> Vec<DocumentElement> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .map(|line| DocumentElement::Paragraph {
            style: "NORMAL_TEXT".to_string(),
            text: line.to_string(),
        })
        .collect()
}

impl WorkspaceAccessor {
    pub(super) async fn read(
        &self,
        id: &str,
        op: &Operation,
    ) -> Result<Vec<Record>, WorkspaceError> {
        match op {
            Operation::ReadRows {
                sheet,
                offset,
                limit,
            } => {
                let limit = self.pages.clamp(*limit);
                let records = self.all_records(id, sheet.as_deref()).await?;
                Ok(records
                    .into_iter()
                    .skip(offset.unwrap_or(0))
                    .take(limit)
                    .collect())
            }
            Operation::ReadAll { sheet } => {
                let mut records = self.all_records(id, sheet.as_deref()).await?;
                records.truncate(self.pages.max());
                Ok(records)
            }
            Operation::ReadRange { range } => self.read_range(id, range).await,
            Operation::ListTabs {} => self.list_tabs(id).await,
            Operation::ListResources { query, limit } => {
                self.list_resources(query.as_deref(), *limit).await
            }
            Operation::ResourceExists { resource_id } => {
                let target = resource_id.as_deref().unwrap_or(id);
                let exists = self.resource_exists(target).await?;
                Ok(vec![record(
                    json!({ "resourceId": target, "exists": exists }),
                )])
            }
            Operation::GetMetadata {} => Ok(vec![self.metadata(id).await?]),
            Operation::ReadDocument {} => self.document_records(id).await,
            write => Err(WorkspaceError::UnsupportedOperation(format!(
                "{} is not a read",
                write.name()
            ))),
        }
    }

    fn infer_grid(&self, id: &str, grid: &Grid) -> Option<Inference> {
        let source = GridSource {
            resource_id: id,
            sheet_name: grid.sheet.as_deref(),
            first_row: grid.first_row,
            first_column: grid.first_column,
        };
        let name = grid.sheet.as_deref().unwrap_or(UNNAMED_TABLE);
        infer_table(name, source, &grid.rows, &self.inference)
    }

    fn grid_records(&self, id: &str, grid: &Grid) -> Vec<Record> {
        self.infer_grid(id, grid)
            .map(|inference| inference.records(&grid.rows).collect())
            .unwrap_or_default()
    }

    async fn all_records(
        &self,
        id: &str,
        sheet: Option<&str>,
    ) -> Result<Vec<Record>, WorkspaceError> {
        if self.handle.resource_kind == ResourceKind::Document {
            return self.document_records(id).await;
        }
        let grid = first_success(
            "read_sheet",
            vec![
                (API, self.api_sheet_grid(id, sheet).boxed()),
                (PUBLIC, self.public_sheet_grid(id, sheet).boxed()),
            ],
        )
        .await?;
        Ok(self.grid_records(id, &grid))
    }

    async fn api_spreadsheet(&self, id: &str) -> Result<Spreadsheet, WorkspaceError> {
        let auth = self.credentials.authorizer().await?;
        self.sheets.get_spreadsheet(&auth, id).await
    }

    async fn api_sheet_grid(&self, id: &str, sheet: Option<&str>) -> Result<Grid, WorkspaceError> {
        let auth = self.credentials.authorizer().await?;
        let title = match sheet {
            Some(title) => title.to_string(),
            None => self
                .sheets
                .get_spreadsheet(&auth, id)
                .await?
                .first_sheet()
                .map(|tab| tab.title.clone())
                .ok_or_else(|| WorkspaceError::NotFound(format!("spreadsheet {id} has no tabs")))?,
        };
        let values = self
            .sheets
            .get_values(&auth, id, &quote_sheet_name(&title))
            .await?;
        Ok(Grid {
            sheet: Some(title),
            first_row: 1,
            first_column: 0,
            rows: values.to_grid(),
        })
    }

    async fn public_sheet_grid(
        &self,
        id: &str,
        sheet: Option<&str>,
    ) -> Result<Grid, WorkspaceError> {
        Ok(Grid {
            sheet: sheet.map(str::to_string),
            first_row: 1,
            first_column: 0,
            rows: self.public.sheet_csv(id, sheet).await?,
        })
    }

    async fn read_range(&self, id: &str, range: &str) -> Result<Vec<Record>, WorkspaceError> {
        let parsed = A1Range::parse(range);
        let grid = first_success(
            "read_range",
            vec![
                (API, self.api_range_grid(id, range, &parsed).boxed()),
                (PUBLIC, self.public_range_grid(id, &parsed).boxed()),
            ],
        )
        .await?;
        let mut records = self.grid_records(id, &grid);
        records.truncate(self.pages.max());
        Ok(records)
    }

    async fn api_range_grid(
        &self,
        id: &str,
        range: &str,
        parsed: &A1Range,
    ) -> Result<Grid, WorkspaceError> {
        let auth = self.credentials.authorizer().await?;
        let values = self.sheets.get_values(&auth, id, range).await?;
        // The service reports the range it actually returned, with the tab made explicit.
        let returned = values.range.as_deref().map(A1Range::parse);
        let origin = returned.as_ref().unwrap_or(parsed);
        let (first_row, first_column) = (origin.first_row(), origin.first_column());
        let sheet = returned
            .and_then(|r| r.sheet)
            .or_else(|| parsed.sheet.clone());
        Ok(Grid {
            sheet,
            first_row,
            first_column,
            rows: values.to_grid(),
        })
    }

    async fn public_range_grid(&self, id: &str, parsed: &A1Range) -> Result<Grid, WorkspaceError> {
        Ok(Grid {
            sheet: parsed.sheet.clone(),
            first_row: parsed.first_row(),
            first_column: parsed.first_column(),
            rows: self.public.range_csv(id, parsed).await?,
        })
    }

    async fn list_tabs(&self, id: &str) -> Result<Vec<Record>, WorkspaceError> {
        let spreadsheet =
            first_success("list_tabs", vec![(API, self.api_spreadsheet(id).boxed())]).await?;
        Ok(spreadsheet
            .sheets
            .iter()
            .map(|tab| {
                let props = &tab.properties;
                let grid = props.grid_properties.as_ref();
                record(json!({
                    "sheetId": props.sheet_id,
                    "title": props.title,
                    "index": props.index,
                    "rowCount": grid.map(|g| g.row_count),
                    "columnCount": grid.map(|g| g.column_count),
                }))
            })
            .collect())
    }

    async fn api_files(
        &self,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Record>, WorkspaceError> {
        let auth = self.credentials.authorizer().await?;
        let list = self.drive.list_files(&auth, query, limit).await?;
        Ok(list
            .files
            .into_iter()
            .filter(|f| !f.trashed)
            .map(|f| {
                record(json!({
                    "resourceId": f.id,
                    "name": f.name,
                    "kind": f.kind(),
                    "modifiedTime": f.modified_time,
                    "webViewLink": f.web_view_link,
                }))
            })
            .collect())
    }

    async fn list_resources(
        &self,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, WorkspaceError> {
        let limit = self.pages.clamp(limit);
        first_success(
            "list_resources",
            vec![(API, self.api_files(query, limit).boxed())],
        )
        .await
    }

    async fn api_exists(&self, id: &str) -> Result<bool, WorkspaceError> {
        let auth = self.credentials.authorizer().await?;
        match self.drive.get_file(&auth, id).await {
            Ok(file) => Ok(!file.trashed),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn public_exists(&self, id: &str) -> Result<bool, WorkspaceError> {
        let fetched = match self.handle.resource_kind {
            ResourceKind::Sheet => self.public.sheet_csv(id, None).await.map(drop),
            ResourceKind::Document => self.public.document_text(id).await.map(drop),
        };
        match fetched {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn resource_exists(&self, id: &str) -> Result<bool, WorkspaceError> {
        first_success(
            "resource_exists",
            vec![
                (API, self.api_exists(id).boxed()),
                (PUBLIC, self.public_exists(id).boxed()),
            ],
        )
        .await
    }

    async fn api_metadata(&self, id: &str) -> Result<Record, WorkspaceError> {
        let auth = self.credentials.authorizer().await?;
        Ok(match self.handle.resource_kind {
            ResourceKind::Sheet => {
                let s = self.sheets.get_spreadsheet(&auth, id).await?;
                record(json!({
                    "resourceId": s.spreadsheet_id,
                    "kind": ResourceKind::Sheet,
                    "access": "authenticated",
                    "title": s.properties.title,
                    "locale": s.properties.locale,
                    "timeZone": s.properties.time_zone,
                    "tabCount": s.sheets.len(),
                    "url": s.spreadsheet_url,
                }))
            }
            ResourceKind::Document => {
                let d = self.docs.get_document(&auth, id).await?;
                record(json!({
                    "resourceId": d.document_id,
                    "kind": ResourceKind::Document,
                    "access": "authenticated",
                    "title": d.title,
                    "revisionId": d.revision_id,
                    "endIndex": d.end_index(),
                }))
            }
        })
    }

    async fn public_metadata(&self, id: &str) -> Result<Record, WorkspaceError> {
        if !self.public_exists(id).await? {
            return Err(WorkspaceError::NotFound(format!("resource {id}")));
        }
        Ok(record(json!({
            "resourceId": id,
            "kind": self.handle.resource_kind,
            "access": "public",
        })))
    }

    pub(super) async fn metadata(&self, id: &str) -> Result<Record, WorkspaceError> {
        first_success(
            "get_metadata",
            vec![
                (API, self.api_metadata(id).boxed()),
                (PUBLIC, self.public_metadata(id).boxed()),
            ],
        )
        .await
    }

    async fn api_document(&self, id: &str) -> Result<Vec<DocumentElement>, WorkspaceError> {
        let auth = self.credentials.authorizer().await?;
        let doc = self.docs.get_document(&auth, id).await?;
        Ok(document_elements(&doc))
    }

    async fn public_document(&self, id: &str) -> Result<Vec<DocumentElement>, WorkspaceError> {
        Ok(text_elements(&self.public.document_text(id).await?))
    }

    async fn read_document(&self, id: &str) -> Result<DocumentInference, WorkspaceError> {
        let elements = first_success(
            "read_document",
            vec![
                (API, self.api_document(id).boxed()),
                (PUBLIC, self.public_document(id).boxed()),
            ],
        )
        .await?;
        Ok(infer_document(id, &elements, &self.inference))
    }

    /// Paragraph rows then embedded-table rows, each tagged with its table name.
    pub(super) async fn document_records(&self, id: &str) -> Result<Vec<Record>, WorkspaceError> {
        let DocumentInference {
            paragraphs,
            paragraph_records,
            tables,
        } = self.read_document(id).await?;

        let tag = |name: &str, mut r: Record| {
            r.insert(TABLE_KEY.to_string(), Value::from(name));
            r
        };
        let mut records: Vec<Record> = paragraph_records
            .into_iter()
            .map(|r| tag(paragraphs.table_name.as_str(), r))
            .collect();
        for table in &tables {
            let name = table.inference.table.table_name.as_str();
            records.extend(table.records().into_iter().map(|r| tag(name, r)));
        }
        records.truncate(self.pages.max());
        Ok(records)
    }

    async fn api_all_grids(&self, id: &str) -> Result<Vec<Grid>, WorkspaceError> {
        let auth = self.credentials.authorizer().await?;
        let spreadsheet = self.sheets.get_spreadsheet(&auth, id).await?;
        let mut grids = Vec::with_capacity(spreadsheet.sheets.len());
        for tab in &spreadsheet.sheets {
            let props = &tab.properties;
            if props.sheet_type.as_deref().is_some_and(|t| t != "GRID") {
                continue;
            }
            let values = self
                .sheets
                .get_values(&auth, id, &quote_sheet_name(&props.title))
                .await?;
            grids.push(Grid {
                sheet: Some(props.title.clone()),
                first_row: 1,
                first_column: 0,
                rows: values.to_grid(),
            });
        }
        Ok(grids)
    }

    async fn public_all_grids(&self, id: &str) -> Result<Vec<Grid>, WorkspaceError> {
        Ok(vec![self.public_sheet_grid(id, None).await?])
    }

    /// One table per tab (or per document part) plus the `_info` summary table.
    pub(super) async fn infer_schema(&self, id: &str) -> Result<Vec<InferredTable>, WorkspaceError> {
        let mut summary = Map::new();
        summary.insert("resourceId".to_string(), Value::from(id));
        summary.insert(
            "kind".to_string(),
            Value::from(self.handle.resource_kind.to_string()),
        );

        let mut tables = match self.handle.resource_kind {
            ResourceKind::Document => {
                let doc = self.read_document(id).await?;
                summary.insert("paragraphCount".to_string(), Value::from(doc.paragraph_records.len()));
                summary.insert("tableCount".to_string(), Value::from(doc.tables.len()));
                doc.schema()
            }
            ResourceKind::Sheet => {
                let grids = first_success(
                    "get_schema",
                    vec![
                        (API, self.api_all_grids(id).boxed()),
                        (PUBLIC, self.public_all_grids(id).boxed()),
                    ],
                )
                .await?;
                summary.insert("tabCount".to_string(), Value::from(grids.len()));
                grids
                    .iter()
                    .filter_map(|grid| self.infer_grid(id, grid).map(|i| i.table))
                    .collect()
            }
        };
        tables.push(info_table(id, summary));
        Ok(tables)
    }
}
