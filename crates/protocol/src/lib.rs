//! Wire types shared by the mcpdeck client and its front ends.
//!
//! `logs` covers the records served by `GET /api/logs/stream`, `tasks`
//! covers the SDLC task endpoints under `/api/v1/sdlc/tasks`.

pub mod logs;
pub mod tasks;

pub use logs::{parse_line, LogLevel, LogRecord, LogTimestamp, ParsedLine};
pub use tasks::{
    CreateTaskRequest, CreateTaskResponse, TaskDocument, TaskResult, TaskState, TaskStatusReport,
};
