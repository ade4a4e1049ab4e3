use crate::accessor::DataAccessor;
use crate::error::WorkspaceError;
use crate::server::router::SheetwiseState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::{Value, json};

/// `query` may be the descriptor itself or its JSON text.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Value,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// POST /v1/query
pub async fn query_handler(
    State(state): State<SheetwiseState>,
    Json(req): Json<QueryRequest>,
) -> Result<impl IntoResponse, WorkspaceError> {
    let text = match req.query {
        Value::String(text) => text,
        descriptor => serde_json::to_string(&descriptor)?,
    };
    let records = state.accessor.execute_query(&text, &req.params).await?;
    Ok(Json(json!({ "count": records.len(), "records": records })))
}

/// GET /v1/schema
pub async fn schema_handler(
    State(state): State<SheetwiseState>,
) -> Result<impl IntoResponse, WorkspaceError> {
    let tables = state.accessor.get_schema().await?;
    Ok(Json(json!({ "resource": state.accessor.handle(), "tables": tables })))
}

/// GET /v1/health
pub async fn health_handler(State(state): State<SheetwiseState>) -> impl IntoResponse {
    let connected = state.accessor.test_connection().await;
    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if connected { "ok" } else { "degraded" },
            "resource": state.accessor.handle(),
        })),
    )
}

/// GET /v1/stats
pub async fn stats_handler(State(state): State<SheetwiseState>) -> impl IntoResponse {
    let credentials = state.accessor.credentials();
    Json(json!({
        "gateway": state.accessor.stats(),
        "auth": {
            "mode": credentials.mode(),
            "tokenValid": credentials.is_token_valid(),
            "needsProactiveRefresh": credentials.needs_proactive_refresh(),
            "canWrite": credentials.has_write_credentials(),
        },
    }))
}
