/// Errors surfaced by the HTTP-backed log viewer and task poller.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {path} returned status {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("polling timeout: task {task_id} did not finish after {attempts} attempts")]
    PollTimeout { task_id: String, attempts: u32 },
}

impl ClientError {
    pub fn decode(what: &'static str, source: serde_json::Error) -> Self {
        ClientError::Decode { what, source }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
