use std::collections::VecDeque;

use protocol::{parse_line, LogTimestamp, ParsedLine};

pub const DEFAULT_MAX_STORED_LOGS: usize = 1000;

/// Raw log lines, newest first, never longer than `max_stored_logs`.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    max_stored_logs: usize,
}

impl LogBuffer {
    pub fn new(max_stored_logs: usize) -> Self {
        let max_stored_logs = max_stored_logs.max(1);
        Self {
            lines: VecDeque::with_capacity(max_stored_logs.min(DEFAULT_MAX_STORED_LOGS)),
            max_stored_logs,
        }
    }

    /// Replaces the contents with a batch the server sent oldest-first.
    pub fn replace_with(&mut self, oldest_first: Vec<String>) {
        self.lines.clear();
        self.add_new_logs(oldest_first);
    }

    /// Prepends a batch the server sent oldest-first and evicts from the
    /// tail past the cap.
    pub fn add_new_logs(&mut self, oldest_first: Vec<String>) {
        for line in oldest_first {
            self.lines.push_front(line);
        }
        self.lines.truncate(self.max_stored_logs);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn max_stored_logs(&self) -> usize {
        self.max_stored_logs
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// Timestamp of the newest line that parses as a record.
    pub fn newest_timestamp(&self) -> Option<LogTimestamp> {
        newest_timestamp(self.iter())
    }
}

/// Scans newest-first lines and returns the first parsable record's
/// timestamp. Unparsable lines are skipped.
pub fn newest_timestamp<'a>(newest_first: impl IntoIterator<Item = &'a str>) -> Option<LogTimestamp> {
    newest_first
        .into_iter()
        .find_map(|line| match parse_line(line) {
            ParsedLine::Record(record) => Some(record.timestamp),
            ParsedLine::Raw(_) => None,
        })
}
