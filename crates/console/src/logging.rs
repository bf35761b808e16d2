use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "mcpdeck.log";

/// Installs the global subscriber. With `log_dir` set, events are written
/// as JSON to a daily rolling file and the returned guard must be kept
/// alive for the writer to flush. Without one, events go to stderr.
pub fn init_tracing(
    log_dir: Option<&Path>,
    log_to_stderr: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_target(false)
                .json();
            (Some(layer), Some(file_guard))
        }
        None => (None, None),
    };

    let stderr_layer = writes_to_stderr(log_dir, log_to_stderr).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(guard)
}

fn writes_to_stderr(log_dir: Option<&Path>, log_to_stderr: bool) -> bool {
    log_to_stderr || log_dir.is_none()
}

pub(crate) fn escape_log_body(body: &str) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    body.replace('\n', "\\n").replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_is_the_fallback_sink() {
        assert!(writes_to_stderr(None, false));
        assert!(writes_to_stderr(None, true));
        assert!(!writes_to_stderr(Some(Path::new("logs")), false));
        assert!(writes_to_stderr(Some(Path::new("logs")), true));
    }

    #[test]
    fn escapes_newlines_and_marks_empty_bodies() {
        assert_eq!(escape_log_body(""), "<empty>");
        assert_eq!(escape_log_body("a\r\nb"), "a\\r\\nb");
    }
}
