use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use sheetwise::auth::{AuthConfig, AuthMode, CredentialCipher, CredentialManager, Credentials};
use sheetwise::config::{AuthSettings, GatewayConfig, WorkspaceSettings};
use sheetwise::error::StrategyFailure;
use sheetwise::remote::{ResourceKind, build_client};
use sheetwise::{DataAccessor, WorkspaceAccessor, WorkspaceError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

const RESOURCE_ID: &str = "ledger-1";
const DOCUMENT_ID: &str = "notes-1";

#[derive(Debug, Clone)]
struct Captured {
    method: Method,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    body: Vec<u8>,
}

impl Captured {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    fn query_param(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_deref().unwrap_or_default().as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

#[derive(Clone)]
struct MockWorkspace {
    reqs: Arc<Mutex<Vec<Captured>>>,
    /// Status every authenticated API call answers with, unless `None`.
    api_failure: Option<StatusCode>,
    public_missing: bool,
    /// Bearer token the API rejects with 401.
    stale_token: Option<&'static str>,
    /// When set, the next values PUT is rejected with 401 whatever its token.
    reject_next_put: Arc<AtomicBool>,
    fallback_reply: Value,
}

impl Default for MockWorkspace {
    fn default() -> Self {
        Self {
            reqs: Arc::default(),
            api_failure: None,
            public_missing: false,
            stale_token: None,
            reject_next_put: Arc::default(),
            fallback_reply: json!({ "ok": true, "updatedCells": 4 }),
        }
    }
}

impl MockWorkspace {
    fn captured(&self) -> Vec<Captured> {
        self.reqs.lock().unwrap().clone()
    }

    fn paths(&self) -> Vec<String> {
        self.captured().into_iter().map(|c| c.path).collect()
    }

    fn requests_to(&self, method: Method, path: &str) -> Vec<Captured> {
        self.captured()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }
}

fn expense_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Household expenses"],
        vec!["Exported 2024-02-01"],
        vec!["Owner: finance team"],
        vec!["Date", "Vendor", "Amount"],
        vec!["2024-01-05", "Staples", "$12.50"],
        vec!["2024-01-06", "Grocer", "$40.00"],
        vec![],
        vec!["2024-01-09", "Staples", "$3.25"],
        vec!["2024-01-12", "Cafe", "$8.10"],
        vec!["2024-01-15", "Grocer", "$22.00"],
    ]
}

fn expense_csv() -> String {
    expense_rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| format!("\"{c}\""))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn google_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": { "code": status.as_u16(), "message": message, "status": "MOCK" }
        })),
    )
        .into_response()
}

fn text_paragraph(style: &str, text: &str) -> Value {
    json!({
        "paragraph": {
            "elements": [{ "textRun": { "content": text } }],
            "paragraphStyle": { "namedStyleType": style }
        }
    })
}

fn table_row(cells: &[&str]) -> Value {
    let cells: Vec<Value> = cells
        .iter()
        .map(|c| json!({ "content": [{ "paragraph": { "elements": [{ "textRun": { "content": format!("{c}\n") } }] } }] }))
        .collect();
    json!({ "tableCells": cells })
}

fn trip_document() -> Value {
    json!({
        "documentId": DOCUMENT_ID,
        "title": "Trip notes",
        "revisionId": "rev-7",
        "body": { "content": [
            { "endIndex": 1, "sectionBreak": {} },
            text_paragraph("HEADING_1", "Trip report\n"),
            text_paragraph("NORMAL_TEXT", "\n"),
            text_paragraph("NORMAL_TEXT", "Receipts are attached.\n"),
            { "endIndex": 120, "table": {
                "rows": 3,
                "columns": 3,
                "tableRows": [
                    table_row(&["Date", "Vendor", "Amount"]),
                    table_row(&["2024-03-01", "Hotel", "$120.00"]),
                    table_row(&["2024-03-02", "Taxi", "$18.40"]),
                ]
            }}
        ]}
    })
}

async fn workspace_handler(
    State(state): State<MockWorkspace>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let path = uri.path().to_string();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.reqs.lock().unwrap().push(Captured {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: authorization.clone(),
        body: body.to_vec(),
    });

    if path == "/token" {
        return Json(json!({
            "access_token": "access-from-refresh",
            "token_type": "bearer",
            "expires_in": 3600
        }))
        .into_response();
    }

    if path == "/fallback" {
        return Json(state.fallback_reply.clone()).into_response();
    }

    if path.starts_with("/v4/") {
        if let Some(status) = state.api_failure {
            return google_error(status, "mock API failure");
        }
        if let (Some(stale), Some(auth)) = (state.stale_token, authorization.as_deref()) {
            if auth == format!("Bearer {stale}") {
                return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
            }
        }

        let sheet_path = format!("/v4/spreadsheets/{RESOURCE_ID}");
        let values_prefix = format!("{sheet_path}/values/");
        if method == Method::GET && path == sheet_path {
            return Json(json!({
                "spreadsheetId": RESOURCE_ID,
                "properties": { "title": "Household", "locale": "en_US", "timeZone": "UTC" },
                "sheets": [{
                    "properties": {
                        "sheetId": 0,
                        "title": "Expenses",
                        "index": 0,
                        "sheetType": "GRID",
                        "gridProperties": { "rowCount": 1000, "columnCount": 26 }
                    }
                }]
            }))
            .into_response();
        }
        if method == Method::GET && path == format!("{values_prefix}Expenses") {
            return Json(json!({
                "range": "Expenses!A1:Z1000",
                "majorDimension": "ROWS",
                "values": expense_rows(),
            }))
            .into_response();
        }
        if method == Method::GET && path == format!("{values_prefix}Expenses!B4:D9") {
            return Json(json!({
                "range": "Expenses!B4:D9",
                "majorDimension": "ROWS",
                "values": [
                    ["Date", "Vendor", "Amount"],
                    ["2024-01-05", "Staples", "$12.50"],
                    ["2024-01-06", "Grocer", "$40.00"],
                ],
            }))
            .into_response();
        }
        if method == Method::POST && path == format!("{sheet_path}:batchUpdate") {
            return Json(json!({ "spreadsheetId": RESOURCE_ID, "replies": [{}] })).into_response();
        }
        if method == Method::PUT && state.reject_next_put.swap(false, Ordering::SeqCst) {
            return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
        }
        if method == Method::PUT && path.starts_with(&values_prefix) {
            return Json(json!({
                "spreadsheetId": RESOURCE_ID,
                "updatedRange": "Expenses!A1:B1",
                "updatedRows": 1,
                "updatedColumns": 2,
                "updatedCells": 2
            }))
            .into_response();
        }
        return google_error(StatusCode::NOT_FOUND, "Requested entity was not found.");
    }

    if path.starts_with("/docs/v1/") {
        if let Some(status) = state.api_failure {
            return google_error(status, "mock API failure");
        }
        let doc_path = format!("/docs/v1/documents/{DOCUMENT_ID}");
        if method == Method::GET && path == doc_path {
            return Json(trip_document()).into_response();
        }
        if method == Method::POST && path == format!("{doc_path}:batchUpdate") {
            return Json(json!({
                "documentId": DOCUMENT_ID,
                "replies": [{ "replaceAllText": { "occurrencesChanged": 2 } }]
            }))
            .into_response();
        }
        return google_error(StatusCode::NOT_FOUND, "Requested entity was not found.");
    }

    if path.starts_with("/drive/v3/") {
        if path == "/drive/v3/files" {
            return Json(json!({
                "files": [
                    {
                        "id": RESOURCE_ID,
                        "name": "Household budget",
                        "mimeType": "application/vnd.google-apps.spreadsheet",
                        "modifiedTime": "2024-02-01T10:00:00Z",
                        "webViewLink": "https://docs.google.com/spreadsheets/d/ledger-1/edit"
                    },
                    {
                        "id": "old-budget",
                        "name": "Old budget",
                        "mimeType": "application/vnd.google-apps.spreadsheet",
                        "trashed": true
                    },
                    {
                        "id": DOCUMENT_ID,
                        "name": "Budget notes",
                        "mimeType": "application/vnd.google-apps.document"
                    }
                ]
            }))
            .into_response();
        }
        if path == format!("/drive/v3/files/{RESOURCE_ID}") {
            return Json(json!({
                "id": RESOURCE_ID,
                "name": "Household budget",
                "mimeType": "application/vnd.google-apps.spreadsheet"
            }))
            .into_response();
        }
        return google_error(StatusCode::NOT_FOUND, "File not found.");
    }

    if path.starts_with(&format!("/spreadsheets/d/{RESOURCE_ID}/")) {
        if state.public_missing {
            return (StatusCode::NOT_FOUND, "not found").into_response();
        }
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            expense_csv(),
        )
            .into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

async fn spawn_mock(state: MockWorkspace) -> Url {
    let app = Router::new().fallback(workspace_handler).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}/", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

fn oauth_settings(base: &Url) -> AuthSettings {
    AuthSettings {
        mode: AuthMode::Oauth2,
        client_id: Some("client-id".to_string()),
        client_secret: Some("client-secret".to_string()),
        redirect_uri: Some(Url::parse("http://localhost:8190/oauth2callback").unwrap()),
        token_url: base.join("token").unwrap(),
        ..AuthSettings::default()
    }
}

fn seeded(base: &Url, access: &str) -> AuthConfig {
    AuthConfig::from_settings(&oauth_settings(base)).with_credentials(Credentials {
        access_token: access.to_string(),
        refresh_token: Some("rt-seed".to_string()),
        expiry_epoch_millis: (Utc::now() + Duration::hours(1)).timestamp_millis(),
        token_type: Some("Bearer".to_string()),
        scope: None,
    })
}

fn api_key() -> AuthConfig {
    AuthConfig::from_settings(&AuthSettings {
        mode: AuthMode::ApiKey,
        api_key: Some("AIza-test".to_string()),
        ..AuthSettings::default()
    })
}

async fn accessor(base: &Url, auth: AuthConfig, with_fallback: bool) -> WorkspaceAccessor {
    accessor_for(base, auth, with_fallback, RESOURCE_ID, ResourceKind::Sheet).await
}

async fn document_accessor(base: &Url, auth: AuthConfig) -> WorkspaceAccessor {
    accessor_for(base, auth, false, DOCUMENT_ID, ResourceKind::Document).await
}

async fn accessor_for(
    base: &Url,
    auth: AuthConfig,
    with_fallback: bool,
    resource: &str,
    kind: ResourceKind,
) -> WorkspaceAccessor {
    let settings = WorkspaceSettings {
        resource: Some(resource.to_string()),
        kind,
        fallback_write_url: with_fallback.then(|| base.join("fallback").unwrap()),
        sheets_base_url: base.join("v4/").unwrap(),
        docs_base_url: base.join("docs/v1/").unwrap(),
        drive_base_url: base.join("drive/v3/").unwrap(),
        public_base_url: base.clone(),
        ..WorkspaceSettings::default()
    };
    let gateway = GatewayConfig {
        max_retries: 0,
        courtesy_delay_ms: 0,
        ..GatewayConfig::default()
    };
    let http = build_client(&gateway).expect("http client");
    let cipher = CredentialCipher::from_secret("accessor-test-secret").expect("cipher");
    let credentials = CredentialManager::initialize(auth, cipher, http, None)
        .await
        .expect("credentials");
    WorkspaceAccessor::initialize(&settings, &gateway, Arc::new(credentials)).expect("accessor")
}

#[tokio::test]
async fn read_rows_skips_preamble_and_maps_semantic_fields() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(r#"{"operation":"read_rows"}"#, &[])
        .await
        .expect("read");

    assert_eq!(records.len(), 5);
    let first = &records[0];
    assert_eq!(first["_row"], json!(5));
    assert_eq!(first["date"], json!("2024-01-05"));
    assert_eq!(first["category"], json!("Staples"));
    assert_eq!(first["amount"], json!("$12.50"));
    assert_eq!(first["amount_numeric"].as_f64(), Some(12.5));
    assert_eq!(records[4]["amount_numeric"].as_f64(), Some(22.0));

    let captured = mock.captured();
    assert!(!captured.is_empty());
    assert!(
        captured
            .iter()
            .all(|c| c.authorization.as_deref() == Some("Bearer at-seed"))
    );
    assert!(captured.iter().all(|c| c.path.starts_with("/v4/")));

    acc.close().await;
}

#[tokio::test]
async fn read_rows_pages_with_offset_and_limit() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(
            r#"{"operation":"read_rows","sheet":"Expenses","offset":"$1","limit":"$2"}"#,
            &[json!(1), json!(2)],
        )
        .await
        .expect("read");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["category"], json!("Grocer"));
    assert_eq!(records[1]["_row"], json!(8));

    acc.close().await;
}

#[tokio::test]
async fn schema_is_inferred_once_then_cached() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let tables = acc.get_schema().await.expect("schema");
    assert_eq!(tables.len(), 2);

    let expenses = &tables[0];
    assert_eq!(expenses.table_name, "Expenses");
    let mapping = &expenses.metadata.semantic_field_mapping;
    assert_eq!(mapping.date, Some(0));
    assert_eq!(mapping.amount, Some(2));
    assert_eq!(mapping.category, Some(1));
    assert_eq!(expenses.metadata.data_start_row, Some(5));

    let info = &tables[1];
    assert_eq!(info.table_name, "_info");
    assert!(!info.queryable);

    let calls = mock.captured().len();
    let again = acc.get_schema().await.expect("cached schema");
    assert_eq!(again, tables);
    assert_eq!(mock.captured().len(), calls, "second call served from cache");

    acc.close().await;
}

#[tokio::test]
async fn denied_api_falls_back_to_public_export() {
    let mock = MockWorkspace {
        api_failure: Some(StatusCode::FORBIDDEN),
        ..MockWorkspace::default()
    };
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(r#"{"operation":"read_rows"}"#, &[])
        .await
        .expect("public export read");

    assert_eq!(records.len(), 5);
    assert_eq!(records[0]["amount_numeric"].as_f64(), Some(12.5));

    let paths = mock.paths();
    assert!(paths.iter().any(|p| p.starts_with("/v4/")));
    assert!(paths.contains(&format!("/spreadsheets/d/{RESOURCE_ID}/export")));

    acc.close().await;
}

#[tokio::test]
async fn every_strategy_failing_lists_each_attempt() {
    let mock = MockWorkspace {
        api_failure: Some(StatusCode::NOT_FOUND),
        public_missing: true,
        ..MockWorkspace::default()
    };
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let err = acc
        .execute_query(r#"{"operation":"read_all"}"#, &[])
        .await
        .expect_err("nothing can serve the read");

    assert_eq!(err.code(), "READ_FAILED");
    let WorkspaceError::ReadFailed { attempts } = err else {
        panic!("expected ReadFailed");
    };
    let strategies: Vec<&str> = attempts
        .iter()
        .map(|a: &StrategyFailure| a.strategy.as_str())
        .collect();
    assert_eq!(strategies, vec!["authenticated_api", "public_export"]);

    acc.close().await;
}

#[tokio::test]
async fn forbidden_payload_never_reaches_the_network() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), true).await;

    let err = acc
        .execute_query(
            r#"{"operation":"read_rows","sheet":"function(){}"}"#,
            &[],
        )
        .await
        .expect_err("rejected");
    assert_eq!(err.code(), "INVALID_QUERY");

    let err = acc
        .execute_query(r#"{"operation":"read_range","range":"$1"}"#, &[json!("eval(1)")])
        .await
        .expect_err("rejected after substitution");
    assert_eq!(err.code(), "INVALID_QUERY");

    let err = acc
        .execute_query(r#"{"operation":"drop_table"}"#, &[])
        .await
        .expect_err("unknown operation");
    assert_eq!(err.code(), "UNSUPPORTED_OPERATION");

    let err = acc
        .execute_query(r#"{"operation":"read_document"}"#, &[])
        .await
        .expect_err("document operation on a sheet");
    assert_eq!(err.code(), "UNSUPPORTED_OPERATION");

    assert!(mock.captured().is_empty());
    acc.close().await;
}

#[tokio::test]
async fn api_key_writes_go_to_the_fallback_endpoint() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, api_key(), true).await;

    let records = acc
        .execute_query(
            r#"{"operation":"update_cells","range":"Expenses!A1:B2","values":[[1,2],[3,4]]}"#,
            &[],
        )
        .await
        .expect("fallback write");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["via"], json!("fallback"));
    assert_eq!(records[0]["operation"], json!("update_cells"));
    assert_eq!(records[0]["updatedCells"], json!(4));

    let captured = mock.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].method, Method::POST);
    assert_eq!(captured[0].path, "/fallback");
    let body: Value = serde_json::from_slice(&captured[0].body).expect("json body");
    assert_eq!(body["action"], json!("update_cells"));
    assert_eq!(body["resourceId"], json!(RESOURCE_ID));
    assert_eq!(body["range"], json!("Expenses!A1:B2"));
    assert_eq!(body["values"], json!([[1, 2], [3, 4]]));

    acc.close().await;
}

#[tokio::test]
async fn fallback_error_field_fails_the_write() {
    let mock = MockWorkspace {
        fallback_reply: json!({ "error": "sheet is protected" }),
        ..MockWorkspace::default()
    };
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, api_key(), true).await;

    let err = acc
        .execute_query(r#"{"operation":"clear_range","range":"Expenses!A2:C9"}"#, &[])
        .await
        .expect_err("endpoint reported an error");

    assert_eq!(err.code(), "FALLBACK_ERROR");
    assert!(err.to_string().contains("sheet is protected"));
    acc.close().await;
}

#[tokio::test]
async fn unauthorized_write_refreshes_once_and_retries() {
    let mock = MockWorkspace {
        stale_token: Some("at-stale"),
        ..MockWorkspace::default()
    };
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-stale"), false).await;

    let records = acc
        .execute_query(
            r#"{"operation":"update_cells","range":"Expenses!A1:B1","values":[["x","y"]]}"#,
            &[],
        )
        .await
        .expect("write after refresh");

    assert_eq!(records[0]["via"], json!("api"));
    assert_eq!(records[0]["updatedCells"], json!(2));

    let captured = mock.captured();
    let writes: Vec<&Captured> = captured.iter().filter(|c| c.method == Method::PUT).collect();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].authorization.as_deref(), Some("Bearer at-stale"));
    assert_eq!(
        writes[1].authorization.as_deref(),
        Some("Bearer access-from-refresh")
    );
    assert_eq!(captured.iter().filter(|c| c.path == "/token").count(), 1);

    acc.close().await;
}

#[tokio::test]
async fn write_without_credentials_or_fallback_is_unavailable() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let auth = AuthConfig::from_settings(&oauth_settings(&base));
    let acc = accessor(&base, auth, false).await;

    let err = acc
        .execute_query(
            r#"{"operation":"append_rows","sheet":"Expenses","values":[["2024-02-01","Cafe","$4.00"]]}"#,
            &[],
        )
        .await
        .expect_err("no way to write");

    assert_eq!(err.code(), "WRITE_UNAVAILABLE");
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert!(err.to_string().contains("workspace.fallback_write_url"));
    assert!(mock.captured().is_empty());

    acc.close().await;
}

#[tokio::test]
async fn closed_accessor_rejects_queries() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    assert!(acc.test_connection().await);
    acc.close().await;

    let err = acc
        .execute_query(r#"{"operation":"list_tabs"}"#, &[])
        .await
        .expect_err("closed");
    assert_eq!(err.code(), "NOT_INITIALIZED");
}

#[tokio::test]
async fn insert_rows_opens_space_then_fills_it() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(
            r#"{"operation":"insert_rows","sheet":"Expenses","startIndex":4,
                "values":[["2024-01-07","Cafe","$4.00"],["2024-01-08","Cafe","$5.00"]]}"#,
            &[],
        )
        .await
        .expect("insert");

    assert_eq!(records[0]["via"], json!("api"));
    assert_eq!(records[0]["operation"], json!("insert_rows"));
    assert_eq!(records[0]["insertedRows"], json!(2));
    assert_eq!(records[0]["sheet"], json!("Expenses"));

    let batch = mock.requests_to(
        Method::POST,
        &format!("/v4/spreadsheets/{RESOURCE_ID}:batchUpdate"),
    );
    assert_eq!(batch.len(), 1);
    assert_eq!(
        batch[0].json(),
        json!({"requests": [{"insertDimension": {
            "range": {"sheetId": 0, "dimension": "ROWS", "startIndex": 4, "endIndex": 6},
            "inheritFromBefore": true
        }}]})
    );

    let fill = mock.requests_to(
        Method::PUT,
        &format!("/v4/spreadsheets/{RESOURCE_ID}/values/Expenses!A5:C6"),
    );
    assert_eq!(fill.len(), 1);
    assert_eq!(
        fill[0].json()["values"],
        json!([["2024-01-07", "Cafe", "$4.00"], ["2024-01-08", "Cafe", "$5.00"]])
    );

    acc.close().await;
}

#[tokio::test]
async fn unauthorized_fill_retries_only_the_fill() {
    let mock = MockWorkspace::default();
    mock.reject_next_put.store(true, Ordering::SeqCst);
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    acc.execute_query(
        r#"{"operation":"insert_rows","sheet":"Expenses","start_index":1,"count":2,
            "values":[["a","b"]]}"#,
        &[],
    )
    .await
    .expect("insert after refresh");

    let captured = mock.captured();
    let count = |method: Method, suffix: &str| {
        captured
            .iter()
            .filter(|c| c.method == method && c.path.ends_with(suffix))
            .count()
    };
    assert_eq!(count(Method::GET, &format!("/spreadsheets/{RESOURCE_ID}")), 1);
    assert_eq!(count(Method::POST, ":batchUpdate"), 1, "rows inserted once");
    assert_eq!(count(Method::PUT, "/values/Expenses!A2:B2"), 2);
    assert_eq!(count(Method::POST, "/token"), 1);

    let puts: Vec<&Captured> = captured.iter().filter(|c| c.method == Method::PUT).collect();
    assert_eq!(
        puts[1].authorization.as_deref(),
        Some("Bearer access-from-refresh")
    );

    acc.close().await;
}

#[tokio::test]
async fn delete_rows_sends_a_half_open_span() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(
            r#"{"operation":"delete_rows","start_index":6,"end_index":7}"#,
            &[],
        )
        .await
        .expect("delete");

    assert_eq!(records[0]["deletedRows"], json!(1));
    assert_eq!(records[0]["sheet"], json!("Expenses"));

    let batch = mock.requests_to(
        Method::POST,
        &format!("/v4/spreadsheets/{RESOURCE_ID}:batchUpdate"),
    );
    assert_eq!(batch.len(), 1);
    assert_eq!(
        batch[0].json(),
        json!({"requests": [{"deleteDimension": {
            "range": {"sheetId": 0, "dimension": "ROWS", "startIndex": 6, "endIndex": 7}
        }}]})
    );

    acc.close().await;
}

#[tokio::test]
async fn read_range_keeps_physical_rows_of_an_offset_block() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(r#"{"operation":"read_range","range":"Expenses!B4:D9"}"#, &[])
        .await
        .expect("range read");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["_row"], json!(5));
    assert_eq!(records[1]["_row"], json!(6));
    assert_eq!(records[0]["date"], json!("2024-01-05"));
    assert_eq!(records[1]["amount_numeric"].as_f64(), Some(40.0));

    assert_eq!(
        mock.paths(),
        vec![format!("/v4/spreadsheets/{RESOURCE_ID}/values/Expenses!B4:D9")]
    );

    acc.close().await;
}

#[tokio::test]
async fn list_resources_filters_by_name_and_drops_trashed_files() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(
            r#"{"operation":"list_resources","query":"budget","limit":5}"#,
            &[],
        )
        .await
        .expect("listing");

    let ids: Vec<&Value> = records.iter().map(|r| &r["resourceId"]).collect();
    assert_eq!(ids, vec![&json!(RESOURCE_ID), &json!(DOCUMENT_ID)]);
    assert_eq!(records[0]["kind"], json!("sheet"));
    assert_eq!(records[1]["kind"], json!("document"));
    assert_eq!(records[0]["name"], json!("Household budget"));

    let list = mock.requests_to(Method::GET, "/drive/v3/files");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].query_param("pageSize").as_deref(), Some("5"));
    let q = list[0].query_param("q").expect("drive query");
    assert!(q.starts_with("trashed = false"));
    assert!(q.ends_with("and name contains 'budget'"));

    acc.close().await;
}

#[tokio::test]
async fn resource_exists_reports_missing_files_without_failing() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let found = acc
        .execute_query(r#"{"operation":"resource_exists"}"#, &[])
        .await
        .expect("exists");
    assert_eq!(found[0]["resourceId"], json!(RESOURCE_ID));
    assert_eq!(found[0]["exists"], json!(true));

    let missing = acc
        .execute_query(
            r#"{"operation":"resource_exists","parameters":{"resourceId":"$1"}}"#,
            &[json!("missing-1")],
        )
        .await
        .expect("exists");
    assert_eq!(missing[0]["resourceId"], json!("missing-1"));
    assert_eq!(missing[0]["exists"], json!(false));

    assert!(mock.paths().iter().all(|p| p.starts_with("/drive/v3/files/")));

    acc.close().await;
}

#[tokio::test]
async fn metadata_comes_from_the_api_when_authorized() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(r#"{"operation":"get_metadata"}"#, &[])
        .await
        .expect("metadata");

    let meta = &records[0];
    assert_eq!(meta["resourceId"], json!(RESOURCE_ID));
    assert_eq!(meta["kind"], json!("sheet"));
    assert_eq!(meta["access"], json!("authenticated"));
    assert_eq!(meta["title"], json!("Household"));
    assert_eq!(meta["tabCount"], json!(1));

    acc.close().await;
}

#[tokio::test]
async fn metadata_falls_back_to_public_access() {
    let mock = MockWorkspace {
        api_failure: Some(StatusCode::FORBIDDEN),
        ..MockWorkspace::default()
    };
    let base = spawn_mock(mock.clone()).await;
    let acc = accessor(&base, seeded(&base, "at-seed"), false).await;

    let records = acc
        .execute_query(r#"{"operation":"get_metadata"}"#, &[])
        .await
        .expect("public metadata");

    assert_eq!(records[0]["access"], json!("public"));
    assert_eq!(records[0]["kind"], json!("sheet"));
    assert!(records[0].get("title").is_none());

    acc.close().await;
}

#[tokio::test]
async fn read_document_lists_paragraphs_then_table_rows() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = document_accessor(&base, seeded(&base, "at-seed")).await;

    let records = acc
        .execute_query(r#"{"operation":"read_document"}"#, &[])
        .await
        .expect("document read");

    assert_eq!(records.len(), 4);
    assert_eq!(records[0]["_table"], json!("paragraphs"));
    assert_eq!(records[0]["text"], json!("Trip report"));
    assert_eq!(records[0]["style"], json!("HEADING_1"));
    assert_eq!(records[1]["index"], json!(1));
    assert_eq!(records[1]["text"], json!("Receipts are attached."));

    assert_eq!(records[2]["_table"], json!("table_1"));
    assert_eq!(records[2]["category"], json!("Hotel"));
    assert_eq!(records[3]["amount_numeric"].as_f64(), Some(18.4));

    assert_eq!(mock.paths(), vec![format!("/docs/v1/documents/{DOCUMENT_ID}")]);

    acc.close().await;
}

#[tokio::test]
async fn document_schema_has_paragraph_table_and_info() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = document_accessor(&base, seeded(&base, "at-seed")).await;

    let tables = acc.get_schema().await.expect("schema");
    let names: Vec<&str> = tables.iter().map(|t| t.table_name.as_str()).collect();
    assert_eq!(names, vec!["paragraphs", "table_1", "_info"]);

    let embedded = &tables[1].metadata.semantic_field_mapping;
    assert_eq!(embedded.date, Some(0));
    assert_eq!(embedded.amount, Some(2));

    let summary = &tables[2].metadata.summary;
    assert_eq!(summary["kind"], json!("document"));
    assert_eq!(summary["paragraphCount"], json!(2));
    assert_eq!(summary["tableCount"], json!(1));

    acc.close().await;
}

#[tokio::test]
async fn append_text_inserts_at_the_end_of_the_body() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = document_accessor(&base, seeded(&base, "at-seed")).await;

    let records = acc
        .execute_query(r#"{"operation":"append_text","text":"Signed off.\n"}"#, &[])
        .await
        .expect("append");

    assert_eq!(records[0]["via"], json!("api"));
    assert_eq!(records[0]["appendedChars"], json!(12));

    let batch = mock.requests_to(
        Method::POST,
        &format!("/docs/v1/documents/{DOCUMENT_ID}:batchUpdate"),
    );
    assert_eq!(batch.len(), 1);
    assert_eq!(
        batch[0].json(),
        json!({"requests": [{"insertText": {
            "text": "Signed off.\n",
            "endOfSegmentLocation": {}
        }}]})
    );

    acc.close().await;
}

#[tokio::test]
async fn replace_text_reports_changed_occurrences() {
    let mock = MockWorkspace::default();
    let base = spawn_mock(mock.clone()).await;
    let acc = document_accessor(&base, seeded(&base, "at-seed")).await;

    let records = acc
        .execute_query(
            r#"{"operation":"replace_text","find":"draft","replace":"final","matchCase":true}"#,
            &[],
        )
        .await
        .expect("replace");

    assert_eq!(records[0]["operation"], json!("replace_text"));
    assert_eq!(records[0]["occurrencesChanged"], json!(2));

    let batch = mock.requests_to(
        Method::POST,
        &format!("/docs/v1/documents/{DOCUMENT_ID}:batchUpdate"),
    );
    assert_eq!(
        batch[0].json(),
        json!({"requests": [{"replaceAllText": {
            "containsText": {"text": "draft", "matchCase": true},
            "replaceText": "final"
        }}]})
    );

    let err = acc
        .execute_query(r#"{"operation":"insert_rows","start_index":0}"#, &[])
        .await
        .expect_err("sheet operation on a document");
    assert_eq!(err.code(), "UNSUPPORTED_OPERATION");

    acc.close().await;
}
