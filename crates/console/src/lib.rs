//! Client for the dashboard backend's log stream and SDLC task endpoints.
//!
//! [`logs::LogViewer`] keeps a bounded, filterable, newest-first view of a
//! backend log file and can follow it live. [`tasks::TaskPoller`] submits a
//! task and polls it to completion with jittered exponential backoff.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod logs;
pub mod tasks;

pub use error::{ClientError, Result};
