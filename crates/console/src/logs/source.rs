use async_trait::async_trait;
use protocol::LogTimestamp;

use crate::error::Result;
use crate::http::{ByteStream, ConsoleHttp, Query};

pub const LOG_STREAM_PATH: &str = "/api/logs/stream";

/// Parameters of one `GET /api/logs/stream` call.
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub log_file: String,
    pub max_lines: Option<usize>,
    pub follow: bool,
    pub since: Option<LogTimestamp>,
}

impl LogQuery {
    pub fn batch(log_file: impl Into<String>, max_lines: usize) -> Self {
        Self {
            log_file: log_file.into(),
            max_lines: Some(max_lines),
            follow: false,
            since: None,
        }
    }

    /// Follow request resuming after `since` when known, otherwise asking
    /// for the last `fallback_lines`.
    pub fn follow(
        log_file: impl Into<String>,
        since: Option<LogTimestamp>,
        fallback_lines: usize,
    ) -> Self {
        let max_lines = since.is_none().then_some(fallback_lines);
        Self {
            log_file: log_file.into(),
            max_lines,
            follow: true,
            since,
        }
    }

    pub fn to_query(&self) -> Query {
        let mut query = vec![("log_file", self.log_file.clone())];
        if let Some(max_lines) = self.max_lines {
            query.push(("max_lines", max_lines.to_string()));
        }
        query.push(("follow", self.follow.to_string()));
        if let Some(since) = self.since.as_ref() {
            query.push(("since", since.as_query_value()));
        }
        query
    }
}

/// Where log lines come from. Lines are delivered oldest-first.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_batch(&self, query: &LogQuery) -> Result<String>;

    async fn open_stream(&self, query: &LogQuery) -> Result<ByteStream>;
}

#[derive(Debug, Clone)]
pub struct HttpLogSource {
    http: ConsoleHttp,
}

impl HttpLogSource {
    pub fn new(http: ConsoleHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn fetch_batch(&self, query: &LogQuery) -> Result<String> {
        self.http.get_text(LOG_STREAM_PATH, &query.to_query()).await
    }

    async fn open_stream(&self, query: &LogQuery) -> Result<ByteStream> {
        self.http.get_stream(LOG_STREAM_PATH, &query.to_query()).await
    }
}
