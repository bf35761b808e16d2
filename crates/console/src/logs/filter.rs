use std::collections::BTreeSet;

use protocol::LogLevel;
use serde_json::Value;

use super::buffer::LogBuffer;

/// Level toggles plus a case-insensitive search query.
///
/// JSON lines must carry an enabled `level`; anything that is not JSON
/// skips the level check. The query is matched against the line as
/// received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    enabled: BTreeSet<LogLevel>,
    query: String,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            enabled: LogLevel::ALL.into_iter().collect(),
            query: String::new(),
        }
    }
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only(levels: impl IntoIterator<Item = LogLevel>) -> Self {
        Self {
            enabled: levels.into_iter().collect(),
            query: String::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.set_query(query);
        self
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into().to_lowercase();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn enable(&mut self, level: LogLevel) {
        self.enabled.insert(level);
    }

    pub fn disable(&mut self, level: LogLevel) {
        self.enabled.remove(&level);
    }

    /// Flips a level and returns whether it is now enabled.
    pub fn toggle(&mut self, level: LogLevel) -> bool {
        if self.enabled.remove(&level) {
            false
        } else {
            self.enabled.insert(level);
            true
        }
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.enabled.contains(&level)
    }

    pub fn matches(&self, line: &str) -> bool {
        match serde_json::from_str::<Value>(line.trim()) {
            Ok(value) => {
                let level = value
                    .get("level")
                    .and_then(Value::as_str)
                    .and_then(|level| level.parse::<LogLevel>().ok());
                match level {
                    Some(level) if self.is_enabled(level) => self.contains_query(line),
                    _ => false,
                }
            }
            Err(_) => self.contains_query(line),
        }
    }

    /// Matching lines in buffer order (newest first).
    pub fn apply<'a>(&self, buffer: &'a LogBuffer) -> Vec<&'a str> {
        buffer.iter().filter(|line| self.matches(line)).collect()
    }

    fn contains_query(&self, text: &str) -> bool {
        self.query.is_empty() || text.to_lowercase().contains(&self.query)
    }
}
