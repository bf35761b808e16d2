pub mod api;
pub mod backoff;
pub mod poller;

pub use api::{HttpTaskClient, TaskApi};
pub use backoff::{Backoff, BackoffPolicy, JitterSource, RandomJitter, Sleeper, TokioSleeper};
pub use poller::{PollOptions, TaskPoller};
