use super::http::{endpoint, execute_json};
use crate::auth::Authorizer;
use crate::error::WorkspaceError;
use crate::gateway::Gateway;
use serde_json::{Value, json};
use sheetwise_schema::{
    AppendValuesResponse, BatchUpdateSpreadsheetRequest, BatchUpdateSpreadsheetResponse,
    ClearValuesResponse, Spreadsheet, UpdateValuesResponse, ValueRange,
};
use std::sync::Arc;
use url::Url;

const SPREADSHEET_FIELDS: &str =
    "spreadsheetId,properties(title,locale,timeZone),sheets.properties,spreadsheetUrl";

/// Spreadsheet values and structure endpoints.
#[derive(Clone)]
pub struct SheetsApi {
    http: reqwest::Client,
    base: Url,
    gateway: Arc<Gateway>,
}

impl SheetsApi {
    pub fn new(http: reqwest::Client, base: Url, gateway: Arc<Gateway>) -> Self {
        Self {
            http,
            base,
            gateway,
        }
    }

    pub async fn get_spreadsheet(
        &self,
        auth: &Authorizer,
        spreadsheet_id: &str,
    ) -> Result<Spreadsheet, WorkspaceError> {
        let mut url = endpoint(&self.base, &["spreadsheets", spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", SPREADSHEET_FIELDS);
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || auth.apply(http.get(url.clone()))).await
    }

    pub async fn get_values(
        &self,
        auth: &Authorizer,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<ValueRange, WorkspaceError> {
        let mut url = endpoint(&self.base, &["spreadsheets", spreadsheet_id, "values", range])?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || auth.apply(http.get(url.clone()))).await
    }

    pub async fn update_values(
        &self,
        auth: &Authorizer,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<UpdateValuesResponse, WorkspaceError> {
        let mut url = endpoint(&self.base, &["spreadsheets", spreadsheet_id, "values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let mut body = ValueRange::rows(values);
        body.range = Some(range.to_string());
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || {
            auth.apply(http.put(url.clone())).json(&body)
        })
        .await
    }

    pub async fn append_values(
        &self,
        auth: &Authorizer,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<AppendValuesResponse, WorkspaceError> {
        let action = format!("{range}:append");
        let mut url = endpoint(&self.base, &["spreadsheets", spreadsheet_id, "values", &action])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = ValueRange::rows(values);
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || {
            auth.apply(http.post(url.clone())).json(&body)
        })
        .await
    }

    pub async fn clear_values(
        &self,
        auth: &Authorizer,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<ClearValuesResponse, WorkspaceError> {
        let action = format!("{range}:clear");
        let url = endpoint(&self.base, &["spreadsheets", spreadsheet_id, "values", &action])?;
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || {
            auth.apply(http.post(url.clone())).json(&json!({}))
        })
        .await
    }

    pub async fn batch_update(
        &self,
        auth: &Authorizer,
        spreadsheet_id: &str,
        request: BatchUpdateSpreadsheetRequest,
    ) -> Result<BatchUpdateSpreadsheetResponse, WorkspaceError> {
        let action = format!("{spreadsheet_id}:batchUpdate");
        let url = endpoint(&self.base, &["spreadsheets", &action])?;
        let (http, auth) = (self.http.clone(), auth.clone());
        execute_json(&self.gateway, move || {
            auth.apply(http.post(url.clone())).json(&request)
        })
        .await
    }
}
