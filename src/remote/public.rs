use super::http::{endpoint, execute_export};
use super::range::A1Range;
use crate::error::WorkspaceError;
use crate::gateway::Gateway;
use std::sync::Arc;
use url::Url;

/// Unauthenticated export formats: CSV per tab for spreadsheets, plain text for documents.
#[derive(Clone)]
pub struct PublicExport {
    http: reqwest::Client,
    base: Url,
    gateway: Arc<Gateway>,
}

impl PublicExport {
    pub fn new(http: reqwest::Client, base: Url, gateway: Arc<Gateway>) -> Self {
        Self {
            http,
            base,
            gateway,
        }
    }

    /// Grid of one tab (by name), or of the first tab when `sheet` is `None`.
    pub async fn sheet_csv(
        &self,
        spreadsheet_id: &str,
        sheet: Option<&str>,
    ) -> Result<Vec<Vec<String>>, WorkspaceError> {
        let url = match sheet {
            Some(name) => {
                let mut url = endpoint(&self.base, &["spreadsheets", "d", spreadsheet_id, "gviz", "tq"])?;
                url.query_pairs_mut()
                    .append_pair("tqx", "out:csv")
                    .append_pair("sheet", name);
                url
            }
            None => {
                let mut url = endpoint(&self.base, &["spreadsheets", "d", spreadsheet_id, "export"])?;
                url.query_pairs_mut().append_pair("format", "csv");
                url
            }
        };
        let http = self.http.clone();
        let body = execute_export(&self.gateway, move || http.get(url.clone())).await?;
        parse_csv(&body)
    }

    /// Grid of one A1 range through the query export.
    pub async fn range_csv(
        &self,
        spreadsheet_id: &str,
        range: &A1Range,
    ) -> Result<Vec<Vec<String>>, WorkspaceError> {
        let mut url = endpoint(&self.base, &["spreadsheets", "d", spreadsheet_id, "gviz", "tq"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("tqx", "out:csv");
            if let Some(sheet) = &range.sheet {
                query.append_pair("sheet", sheet);
            }
            if let Some(cells) = &range.cells {
                query.append_pair("range", cells);
            }
        }
        let http = self.http.clone();
        let body = execute_export(&self.gateway, move || http.get(url.clone())).await?;
        parse_csv(&body)
    }

    pub async fn document_text(&self, document_id: &str) -> Result<String, WorkspaceError> {
        let mut url = endpoint(&self.base, &["document", "d", document_id, "export"])?;
        url.query_pairs_mut().append_pair("format", "txt");
        let http = self.http.clone();
        execute_export(&self.gateway, move || http.get(url.clone())).await
    }
}

pub(crate) fn parse_csv(body: &str) -> Result<Vec<Vec<String>>, WorkspaceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());
    let mut grid = Vec::new();
    for record in reader.records() {
        grid.push(record?.iter().map(str::to_string).collect());
    }
    Ok(grid)
}
