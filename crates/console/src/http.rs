use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::logging::escape_log_body;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_PREVIEW_CHARS: usize = 512;
static HTTP_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Raw response body chunks as they arrive off the wire.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

pub type Query = Vec<(&'static str, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    /// Applies to every request except streamed bodies, which stay open
    /// until cancelled.
    pub io_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// JSON-over-HTTP access to the dashboard backend.
#[derive(Debug, Clone)]
pub struct ConsoleHttp {
    base_url: String,
    client: Client,
    io_timeout: Duration,
}

impl ConsoleHttp {
    pub fn new(base_url: impl Into<String>, settings: HttpSettings) -> Result<Self> {
        let base_url = base_url.into();
        join_base_path(&base_url, "/")?;
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()?;
        Ok(Self {
            base_url,
            client,
            io_timeout: settings.io_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T> {
        let body = self.get_text(path, query).await?;
        serde_json::from_str(&body).map_err(|err| {
            warn!(path, error = %err, "console http GET parse error");
            ClientError::decode("response body", err)
        })
    }

    pub async fn post_json<B, T>(&self, path: &str, payload: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload =
            serde_json::to_string(payload).map_err(|err| ClientError::decode("request body", err))?;
        debug!(path, payload = %escape_log_body(&payload), "console http POST payload");
        let response = self
            .send(Method::POST, path, &Vec::new(), Some(payload), true)
            .await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| {
            warn!(path, error = %err, "console http POST parse error");
            ClientError::decode("response body", err)
        })
    }

    pub async fn get_text(&self, path: &str, query: &Query) -> Result<String> {
        let response = self.send(Method::GET, path, query, None, true).await?;
        let body = response.text().await?;
        debug!(path, body_len = body.len(), "console http GET body read");
        Ok(body)
    }

    /// Opens a long-lived GET whose body is yielded chunk by chunk.
    pub async fn get_stream(&self, path: &str, query: &Query) -> Result<ByteStream> {
        let response = self.send(Method::GET, path, query, None, false).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<String>,
        with_timeout: bool,
    ) -> Result<Response> {
        let request_id = HTTP_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let body_len = body.as_ref().map(|value| value.len()).unwrap_or(0);
        debug!(%method, request_id, path, body_len, "console http start");
        let url = join_base_path(&self.base_url, path)?;
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json")
            .query(query);
        if with_timeout {
            request = request.timeout(self.io_timeout);
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    %method,
                    request_id,
                    timeout = err.is_timeout(),
                    connect = err.is_connect(),
                    error = %err,
                    "console http reqwest error"
                );
                return Err(err.into());
            }
        };
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        debug!(%method, request_id, status = status.as_u16(), content_type = %content_type, "console http response");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
            warn!(
                %method,
                request_id,
                path,
                status = status.as_u16(),
                body = %escape_log_body(&preview),
                "console http non-success status"
            );
            return Err(ClientError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body: preview,
            });
        }
        Ok(response)
    }
}

pub fn join_base_path(base: &str, path: &str) -> Result<String> {
    if base.trim().is_empty() {
        return Err(ClientError::InvalidUrl("base_url is empty".to_string()));
    }
    let normalized_base = base.trim().trim_end_matches('/');
    if !normalized_base.starts_with("http://") && !normalized_base.starts_with("https://") {
        return Err(ClientError::InvalidUrl(format!(
            "base_url {normalized_base} must start with http:// or https://"
        )));
    }
    let normalized_path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(format!("{normalized_base}{normalized_path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_path_with_single_slash() {
        assert_eq!(
            join_base_path("http://127.0.0.1:8000/", "api/logs/stream").unwrap(),
            "http://127.0.0.1:8000/api/logs/stream"
        );
        assert_eq!(
            join_base_path("https://deck.local", "/api/v1/sdlc/tasks").unwrap(),
            "https://deck.local/api/v1/sdlc/tasks"
        );
    }

    #[test]
    fn rejects_empty_or_schemeless_base() {
        assert!(matches!(
            join_base_path("  ", "/x"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            join_base_path("deck.local", "/x"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn non_success_status_carries_body_preview() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/secrets")
            .with_status(503)
            .with_body("backend down")
            .create_async()
            .await;
        let http = ConsoleHttp::new(server.url(), HttpSettings::default()).expect("client");
        let err = http
            .get_text("/api/secrets", &Vec::new())
            .await
            .expect_err("status error");
        match err {
            ClientError::Status {
                method,
                status,
                body,
                ..
            } => {
                assert_eq!(method, "GET");
                assert_eq!(status, 503);
                assert_eq!(body, "backend down");
            }
            other => panic!("unexpected error {other:?}"),
        }
        mock.assert_async().await;
    }
}
