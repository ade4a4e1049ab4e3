use crate::config::GatewayConfig;
use crate::error::WorkspaceError;
use crate::gateway::Gateway;
use crate::utils::logging::with_pretty_json_debug;
use reqwest::StatusCode;
use reqwest::header::{CONNECTION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use sheetwise_schema::GoogleErrorBody;
use std::time::Duration;
use tracing::{debug, warn};

pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 300;

const EXPORT_MAX_REDIRECTS: usize = 5;

const USER_AGENT: &str = concat!("sheetwise/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the token endpoints and the workspace APIs. Redirects are not followed.
pub fn build_client(cfg: &GatewayConfig) -> Result<reqwest::Client, WorkspaceError> {
    client_builder(cfg, reqwest::redirect::Policy::none())
}

/// Client for the export URLs and the fallback endpoint; both may answer with a redirect.
pub fn build_export_client(cfg: &GatewayConfig) -> Result<reqwest::Client, WorkspaceError> {
    client_builder(cfg, reqwest::redirect::Policy::limited(EXPORT_MAX_REDIRECTS))
}

fn client_builder(
    cfg: &GatewayConfig,
    redirect: reqwest::redirect::Policy,
) -> Result<reqwest::Client, WorkspaceError> {
    let mut headers = HeaderMap::new();

    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirect)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs.max(1)))
        .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)));

    if let Some(proxy_url) = &cfg.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if !cfg.enable_multiplexing {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    } else {
        builder = builder.http2_adaptive_window(true);
    }

    Ok(builder.default_headers(headers).build()?)
}

/// Turn a non-success response into a [`WorkspaceError::Upstream`].
///
/// Quota errors reported as 403 with a rate-limit reason are normalised to 429.
pub(crate) async fn classify_upstream_error(resp: reqwest::Response) -> WorkspaceError {
    let status = resp.status();
    let canonical = status.canonical_reason().unwrap_or("upstream error");
    let bytes = match resp.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%status, error = %e, "Failed to read upstream error body");
            return WorkspaceError::Upstream {
                status,
                message: format!("{canonical} (error body unreadable: {e})"),
                reason: None,
            };
        }
    };

    if let Ok(error) = serde_json::from_slice::<GoogleErrorBody>(&bytes) {
        if !error.inner.message.is_empty() {
            with_pretty_json_debug(&error, |pretty_error| {
                debug!(%status, body = %pretty_error, "Upstream structured error");
            });
            let status = if error.is_rate_limited() {
                StatusCode::TOO_MANY_REQUESTS
            } else {
                status
            };
            return WorkspaceError::Upstream {
                status,
                message: error.inner.message.clone(),
                reason: error.reason().map(str::to_string),
            };
        }
    }

    let raw_body = String::from_utf8_lossy(&bytes);
    debug!(
        %status,
        body = %format!("{:.len$}", raw_body, len = UPSTREAM_BODY_PREVIEW_CHARS),
        "Upstream unstructured error"
    );
    WorkspaceError::Upstream {
        status,
        message: canonical.to_string(),
        reason: None,
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, WorkspaceError> {
    if !resp.status().is_success() {
        return Err(classify_upstream_error(resp).await);
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        debug!(
            error = %e,
            body = %format!("{:.len$}", String::from_utf8_lossy(&bytes), len = UPSTREAM_BODY_PREVIEW_CHARS),
            "Upstream body did not match the expected shape"
        );
        WorkspaceError::Json(e)
    })
}

/// Text body of a public export. An HTML page means the export was refused (sign-in wall).
pub(crate) async fn decode_export_text(resp: reqwest::Response) -> Result<String, WorkspaceError> {
    if !resp.status().is_success() {
        return Err(classify_upstream_error(resp).await);
    }
    let is_html = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if is_html {
        return Err(WorkspaceError::Upstream {
            status: StatusCode::FORBIDDEN,
            message: "resource is not publicly exported".to_string(),
            reason: Some("notPublic".to_string()),
        });
    }
    Ok(resp.text().await?)
}

/// Send a JSON request through the gateway; `build` runs once per attempt.
pub(crate) async fn execute_json<T, B>(gateway: &Gateway, build: B) -> Result<T, WorkspaceError>
where
    T: DeserializeOwned + Send + 'static,
    B: Fn() -> reqwest::RequestBuilder + Send + 'static,
{
    gateway
        .execute(move || {
            let req = build();
            async move { decode_json(req.send().await?).await }
        })
        .await
}

pub(crate) async fn execute_export<B>(gateway: &Gateway, build: B) -> Result<String, WorkspaceError>
where
    B: Fn() -> reqwest::RequestBuilder + Send + 'static,
{
    gateway
        .execute(move || {
            let req = build();
            async move { decode_export_text(req.send().await?).await }
        })
        .await
}

/// Append path segments to a base URL, percent-encoding each.
pub(crate) fn endpoint(base: &url::Url, segments: &[&str]) -> Result<url::Url, WorkspaceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| WorkspaceError::Validation(format!("base URL cannot hold a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP/1.1 response per connection, then closes it.
    async fn raw_server(response: &'static str) -> url::Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        url::Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn http1_config() -> GatewayConfig {
        GatewayConfig {
            enable_multiplexing: false,
            ..GatewayConfig::default()
        }
    }

    #[tokio::test]
    async fn api_client_does_not_follow_redirects() {
        let base = raw_server(
            "HTTP/1.1 302 Found\r\nLocation: http://127.0.0.1:9/elsewhere\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let resp = build_client(&http1_config())
            .unwrap()
            .get(base.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);

        // The export client follows it and fails to reach the unroutable target.
        let followed = build_export_client(&http1_config())
            .unwrap()
            .get(base)
            .send()
            .await;
        assert!(followed.is_err());
    }

    #[tokio::test]
    async fn truncated_error_body_is_reported() {
        let base = raw_server(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort",
        )
        .await;

        let resp = build_client(&http1_config())
            .unwrap()
            .get(base)
            .send()
            .await
            .unwrap();
        match classify_upstream_error(resp).await {
            WorkspaceError::Upstream {
                status, message, ..
            } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert!(message.contains("error body unreadable"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn endpoint_encodes_ranges() {
        let base = url::Url::parse("https://sheets.googleapis.com/v4/").unwrap();
        let url = endpoint(&base, &["spreadsheets", "abc", "values", "'My Tab'!A1:B2"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'My%20Tab'!A1:B2"
        );
    }
}
