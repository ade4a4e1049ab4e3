use crate::error::WorkspaceError;
use crate::server::router::SheetwiseState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use time::Duration;
use tracing::{error, info, warn};

const CSRF_COOKIE: &str = "sheetwise_oauth_csrf_token";

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Callback rejected before any token exchange.
#[derive(Debug)]
pub enum FlowRejection {
    Denied(String),
    MissingParams,
    SessionMissing,
    CsrfMismatch,
}

impl IntoResponse for FlowRejection {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            FlowRejection::Denied(reason) => ("OAUTH_DENIED", format!("Consent was not granted: {reason}")),
            FlowRejection::MissingParams => ("OAUTH_CALLBACK_INVALID", "Missing code or state".to_string()),
            FlowRejection::SessionMissing => ("OAUTH_SESSION_MISSING", "Missing OAuth session cookie".to_string()),
            FlowRejection::CsrfMismatch => ("CSRF_MISMATCH", "CSRF token mismatch".to_string()),
        };
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}

/// GET /auth
///
/// Starts the authorization-code flow and redirects the browser to the consent screen.
pub async fn oauth_entry(
    State(state): State<SheetwiseState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, WorkspaceError> {
    let (auth_url, csrf_token) = state
        .accessor
        .credentials()
        .generate_auth_url(&[], None)?;

    let jar = jar.add(build_cookie(
        CSRF_COOKIE,
        csrf_token.secret().to_string(),
        !state.insecure_cookie,
    ));

    info!("Dispatching OAuth redirect to consent screen");
    Ok((jar, Redirect::temporary(auth_url.as_ref())))
}

/// GET /oauth2callback
///
/// Checks the state against the session cookie, exchanges the code and installs the tokens.
pub async fn oauth_callback(
    State(state): State<SheetwiseState>,
    Query(params): Query<CallbackParams>,
    jar: PrivateCookieJar,
) -> Response {
    let expected = jar.get(CSRF_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::from(CSRF_COOKIE));

    if let Some(reason) = params.error {
        warn!(%reason, "OAuth consent denied");
        return (jar, FlowRejection::Denied(reason)).into_response();
    }
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let (Some(code), Some(state_param)) = (non_empty(params.code), non_empty(params.state)) else {
        return (jar, FlowRejection::MissingParams).into_response();
    };
    let Some(expected) = expected else {
        return (jar, FlowRejection::SessionMissing).into_response();
    };
    if state_param != expected {
        return (jar, FlowRejection::CsrfMismatch).into_response();
    }

    match state
        .accessor
        .credentials()
        .exchange_code_for_tokens(&code)
        .await
    {
        Ok(creds) => {
            info!("OAuth callback accepted; credentials installed");
            (
                jar,
                Json(json!({
                    "authorized": true,
                    "expiresAt": creds.expiry(),
                    "hasRefreshToken": creds.refresh_token.is_some(),
                })),
            )
                .into_response()
        }
        Err(err) => {
            error!(code = err.code(), error = %err, "OAuth code exchange failed");
            (jar, err).into_response()
        }
    }
}

fn build_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}
