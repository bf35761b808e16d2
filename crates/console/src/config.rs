use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::http::{HttpSettings, DEFAULT_BASE_URL};
use crate::logs::ViewerOptions;
use crate::tasks::{BackoffPolicy, PollOptions};

#[derive(Debug, Default, Deserialize)]
pub struct DeckConfig {
    pub base_url: Option<String>,
    pub http: Option<HttpConfig>,
    pub logs: Option<LogsConfig>,
    pub tasks: Option<TasksConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_ms: Option<u64>,
    pub io_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsConfig {
    pub log_file: Option<String>,
    pub max_lines: Option<usize>,
    pub fallback_lines: Option<usize>,
    pub max_stored_logs: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TasksConfig {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_jitter_ms: Option<u64>,
}

/// Settings with every default filled in, handed to each component.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub http: HttpSettings,
    pub viewer: ViewerOptions,
    pub poll: PollOptions,
}

/// Reads the TOML config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> anyhow::Result<DeckConfig> {
    if !path.exists() {
        tracing::debug!(config = %path.display(), "config file not found; using defaults");
        return Ok(DeckConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: DeckConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

impl DeckConfig {
    pub fn resolve(self, base_url_override: Option<String>) -> anyhow::Result<ResolvedConfig> {
        let base_url = base_url_override
            .or(self.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.trim().is_empty() {
            anyhow::bail!("base_url cannot be empty");
        }

        let http = self.http.unwrap_or_default();
        let defaults = HttpSettings::default();
        let http = HttpSettings {
            connect_timeout: http
                .connect_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            io_timeout: http
                .io_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.io_timeout),
        };

        let logs = self.logs.unwrap_or_default();
        let defaults = ViewerOptions::default();
        let viewer = ViewerOptions {
            log_file: logs.log_file.unwrap_or(defaults.log_file),
            max_lines: positive("logs.max_lines", logs.max_lines, defaults.max_lines)?,
            fallback_lines: positive(
                "logs.fallback_lines",
                logs.fallback_lines,
                defaults.fallback_lines,
            )?,
            max_stored_logs: positive(
                "logs.max_stored_logs",
                logs.max_stored_logs,
                defaults.max_stored_logs,
            )?,
        };
        if viewer.log_file.trim().is_empty() {
            anyhow::bail!("logs.log_file cannot be empty");
        }

        let tasks = self.tasks.unwrap_or_default();
        let defaults = PollOptions::default();
        let max_attempts = tasks.max_attempts.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            anyhow::bail!("tasks.max_attempts must be greater than 0");
        }
        let backoff = BackoffPolicy {
            initial_delay: tasks
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff.initial_delay),
            multiplier: tasks
                .backoff_multiplier
                .unwrap_or(defaults.backoff.multiplier),
            max_delay: tasks
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff.max_delay),
            max_jitter: tasks
                .max_jitter_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff.max_jitter),
        };
        if !backoff.multiplier.is_finite() || backoff.multiplier < 1.0 {
            anyhow::bail!("tasks.backoff_multiplier must be at least 1.0");
        }
        if backoff.initial_delay > backoff.max_delay {
            anyhow::bail!("tasks.initial_delay_ms must not exceed tasks.max_delay_ms");
        }

        Ok(ResolvedConfig {
            base_url,
            http,
            viewer,
            poll: PollOptions {
                max_attempts,
                backoff,
            },
        })
    }
}

fn positive(name: &str, value: Option<usize>, default: usize) -> anyhow::Result<usize> {
    let value = value.unwrap_or(default);
    if value == 0 {
        anyhow::bail!("{name} must be greater than 0");
    }
    Ok(value)
}
