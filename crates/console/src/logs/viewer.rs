use std::sync::Arc;

use futures_util::StreamExt;
use protocol::LogTimestamp;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::buffer::{newest_timestamp, LogBuffer, DEFAULT_MAX_STORED_LOGS};
use super::filter::LogFilter;
use super::lines::{split_lines, LineSplitter};
use super::source::{LogQuery, LogSource};
use crate::error::{ClientError, Result};
use crate::http::ByteStream;

pub const DEFAULT_LOG_FILE: &str = "app.log";
pub const DEFAULT_MAX_LINES: usize = 500;
pub const DEFAULT_FALLBACK_LINES: usize = 50;
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerOptions {
    pub log_file: String,
    /// Lines requested by a full (non-follow) load.
    pub max_lines: usize,
    /// Lines requested when following starts without a resume timestamp.
    pub fallback_lines: usize,
    pub max_stored_logs: usize,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            log_file: DEFAULT_LOG_FILE.to_string(),
            max_lines: DEFAULT_MAX_LINES,
            fallback_lines: DEFAULT_FALLBACK_LINES,
            max_stored_logs: DEFAULT_MAX_STORED_LOGS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerStatus {
    Idle,
    Loading,
    Loaded,
    Streaming,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// Lines just added to the buffer, newest first.
    Batch { lines: Vec<String> },
    StreamEnded,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSnapshot {
    pub status: ViewerStatus,
    pub following: bool,
    /// Newest first.
    pub lines: Vec<String>,
    pub last_timestamp: Option<LogTimestamp>,
    pub error: Option<String>,
}

struct ViewerState {
    buffer: LogBuffer,
    status: ViewerStatus,
    following: bool,
    last_timestamp: Option<LogTimestamp>,
    error: Option<String>,
    stream_generation: u64,
}

struct ActiveStream {
    generation: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Bounded, filterable view over a backend log file with optional live
/// follow. At most one follow stream runs at a time.
pub struct LogViewer {
    source: Arc<dyn LogSource>,
    options: ViewerOptions,
    state: Arc<Mutex<ViewerState>>,
    active: Mutex<Option<ActiveStream>>,
    events: broadcast::Sender<LogEvent>,
}

impl LogViewer {
    pub fn new(source: Arc<dyn LogSource>, options: ViewerOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = ViewerState {
            buffer: LogBuffer::new(options.max_stored_logs),
            status: ViewerStatus::Idle,
            following: false,
            last_timestamp: None,
            error: None,
            stream_generation: 0,
        };
        Self {
            source,
            options,
            state: Arc::new(Mutex::new(state)),
            active: Mutex::new(None),
            events,
        }
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.events.subscribe()
    }

    /// Full load of the newest `max_lines` lines. On failure the buffer is
    /// left as it was and the error is recorded.
    pub async fn load_initial(&self) -> Result<()> {
        self.state.lock().await.status = ViewerStatus::Loading;
        let query = LogQuery::batch(&self.options.log_file, self.options.max_lines.max(1));
        match self.source.fetch_batch(&query).await {
            Ok(body) => {
                let lines = split_lines(&body);
                let mut state = self.state.lock().await;
                state.buffer.replace_with(lines);
                if let Some(timestamp) = state.buffer.newest_timestamp() {
                    state.last_timestamp = Some(timestamp);
                }
                state.error = None;
                state.status = if state.following {
                    ViewerStatus::Streaming
                } else {
                    ViewerStatus::Loaded
                };
                info!(
                    log_file = %self.options.log_file,
                    lines = state.buffer.len(),
                    "log batch loaded"
                );
                Ok(())
            }
            Err(err) => {
                warn!(log_file = %self.options.log_file, error = %err, "log batch failed");
                self.record_error(&err).await;
                Err(err)
            }
        }
    }

    /// Opens a follow stream, cancelling any stream already running.
    /// Resumes after the remembered timestamp, or the newest buffered
    /// record's, and falls back to the last `fallback_lines` lines.
    pub async fn start_stream(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            debug!(generation = previous.generation, "replacing active log stream");
            previous.cancel.cancel();
            let _ = previous.handle.await;
        }

        let (since, generation) = {
            let mut state = self.state.lock().await;
            let since = state
                .last_timestamp
                .clone()
                .or_else(|| state.buffer.newest_timestamp());
            state.stream_generation += 1;
            state.following = true;
            state.status = ViewerStatus::Loading;
            (since, state.stream_generation)
        };

        let query = LogQuery::follow(&self.options.log_file, since, self.options.fallback_lines);
        let stream = match self.source.open_stream(&query).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(log_file = %self.options.log_file, error = %err, "log stream failed to open");
                {
                    let mut state = self.state.lock().await;
                    if state.stream_generation == generation {
                        state.following = false;
                    }
                }
                self.record_error(&err).await;
                return Err(err);
            }
        };

        {
            let mut state = self.state.lock().await;
            state.status = ViewerStatus::Streaming;
            state.error = None;
        }
        info!(
            log_file = %self.options.log_file,
            since = ?query.since,
            generation,
            "log stream started"
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_stream(
            Arc::clone(&self.state),
            self.events.clone(),
            stream,
            cancel.clone(),
            generation,
        ));
        *active = Some(ActiveStream {
            generation,
            cancel,
            handle,
        });
        Ok(())
    }

    /// Cancels the follow stream if one is running. Safe to call repeatedly.
    pub async fn stop_stream(&self) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
            let _ = previous.handle.await;
            debug!(generation = previous.generation, "log stream stopped");
        }
        let mut state = self.state.lock().await;
        state.following = false;
        if state.status == ViewerStatus::Streaming {
            state.status = ViewerStatus::Loaded;
        }
    }

    /// Forgets the resume timestamp and reloads in full, resuming follow
    /// afterwards when it was on.
    pub async fn refresh(&self) -> Result<()> {
        let was_following = self.state.lock().await.following;
        self.stop_stream().await;
        self.state.lock().await.last_timestamp = None;
        self.load_initial().await?;
        if was_following {
            self.start_stream().await?;
        }
        Ok(())
    }

    pub async fn set_follow(&self, follow: bool) -> Result<()> {
        if follow {
            self.start_stream().await
        } else {
            self.stop_stream().await;
            Ok(())
        }
    }

    pub async fn snapshot(&self) -> ViewerSnapshot {
        let state = self.state.lock().await;
        ViewerSnapshot {
            status: state.status,
            following: state.following,
            lines: state.buffer.to_vec(),
            last_timestamp: state.last_timestamp.clone(),
            error: state.error.clone(),
        }
    }

    /// Buffered lines that pass `filter`, newest first.
    pub async fn filtered(&self, filter: &LogFilter) -> Vec<String> {
        let state = self.state.lock().await;
        filter
            .apply(&state.buffer)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    async fn record_error(&self, err: &ClientError) {
        let message = err.to_string();
        {
            let mut state = self.state.lock().await;
            state.status = ViewerStatus::Error;
            state.error = Some(message.clone());
        }
        let _ = self.events.send(LogEvent::Error { message });
    }
}

impl Drop for LogViewer {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.cancel.cancel();
        }
    }
}

async fn run_stream(
    state: Arc<Mutex<ViewerState>>,
    events: broadcast::Sender<LogEvent>,
    mut stream: ByteStream,
    cancel: CancellationToken,
    generation: u64,
) {
    let mut splitter = LineSplitter::new();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(generation, "log stream cancelled");
                return;
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    let lines = splitter.push(&bytes);
                    if !lines.is_empty() {
                        apply_batch(&state, &events, generation, lines).await;
                    }
                }
                Some(Err(err)) => {
                    warn!(generation, error = %err, "log stream failed");
                    let message = err.to_string();
                    {
                        let mut state = state.lock().await;
                        if state.stream_generation == generation {
                            state.status = ViewerStatus::Error;
                            state.following = false;
                            state.error = Some(message.clone());
                        }
                    }
                    let _ = events.send(LogEvent::Error { message });
                    return;
                }
                None => {
                    if let Some(line) = splitter.finish() {
                        apply_batch(&state, &events, generation, vec![line]).await;
                    }
                    {
                        let mut state = state.lock().await;
                        if state.stream_generation == generation {
                            state.status = ViewerStatus::Loaded;
                            state.following = false;
                        }
                    }
                    info!(generation, "log stream ended by server");
                    let _ = events.send(LogEvent::StreamEnded);
                    return;
                }
            }
        }
    }
}

/// Applies one chunk's lines (oldest-first) in a single lock section.
async fn apply_batch(
    state: &Mutex<ViewerState>,
    events: &broadcast::Sender<LogEvent>,
    generation: u64,
    oldest_first: Vec<String>,
) {
    let mut state = state.lock().await;
    if state.stream_generation != generation {
        return;
    }
    if let Some(timestamp) = newest_timestamp(oldest_first.iter().rev().map(String::as_str)) {
        state.last_timestamp = Some(timestamp);
    }
    let newest_first: Vec<String> = oldest_first.iter().rev().cloned().collect();
    debug!(generation, lines = newest_first.len(), "log stream batch");
    state.buffer.add_new_logs(oldest_first);
    let _ = events.send(LogEvent::Batch {
        lines: newest_first,
    });
}
