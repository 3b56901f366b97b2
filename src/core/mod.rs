pub mod coordinator;
pub mod engine;
pub mod lookup_client;
pub mod rate_limiter;
pub mod retry;
pub mod worker_pool;

pub use crate::domain::model::{
    Chunk, FailureReason, LookupOutcome, LookupRecord, RunReport, WorkItem,
};
pub use crate::domain::ports::{Lookup, Notifier, ResultSink, WorkerId};
pub use crate::utils::error::Result;
