pub mod buffer;
pub mod filter;
pub mod lines;
pub mod render;
pub mod source;
pub mod viewer;

pub use buffer::LogBuffer;
pub use filter::LogFilter;
pub use lines::LineSplitter;
pub use source::{HttpLogSource, LogQuery, LogSource};
pub use viewer::{LogEvent, LogViewer, ViewerOptions, ViewerSnapshot, ViewerStatus};
