use crate::server::router::SheetwiseState;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde_json::json;
use subtle::ConstantTimeEq;

fn extract_header_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

fn extract_query_token(query: Option<&str>) -> Option<String> {
    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "key")
            .map(|(_, v)| v.into_owned())
    })
}

/// Shared-key guard for the `/v1` surface: bearer header or `?key=`.
#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl FromRequestParts<SheetwiseState> for RequireKeyAuth {
    type Rejection = KeyRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SheetwiseState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            extract_header_token(&parts.headers).or_else(|| extract_query_token(parts.uri.query()));

        match token {
            Some(key) => {
                let expected = state.sheetwise_key.as_ref();
                if key.as_bytes().ct_eq(expected.as_bytes()).into() {
                    Ok(RequireKeyAuth)
                } else {
                    Err(KeyRejection::InvalidKey)
                }
            }
            None => Err(KeyRejection::MissingKey),
        }
    }
}

pub enum KeyRejection {
    MissingKey,
    InvalidKey,
}

impl IntoResponse for KeyRejection {
    fn into_response(self) -> Response {
        let reason = match self {
            KeyRejection::MissingKey => "Missing API key",
            KeyRejection::InvalidKey => "Invalid API key",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "code": "UNAUTHORIZED", "message": reason } })),
        )
            .into_response()
    }
}
