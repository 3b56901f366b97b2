pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::LookupSettings;

pub use adapters::{CsvSink, DomainReader, TelegramNotifier};
pub use core::{
    coordinator::BatchCoordinator, engine::LookupEngine, lookup_client::IpApiClient,
    rate_limiter::RateLimiter, retry::RetryPolicy, worker_pool::WorkerPool,
};
pub use utils::error::{LookupError, Result};
