use crate::domain::ports::WorkerId;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;

/// 傳輸層重試設定，只重試冪等的伺服器錯誤與連線錯誤
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retryable_statuses: Vec<StatusCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            retryable_statuses: vec![
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
        }
    }
}

impl RetryPolicy {
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before the n-th retry (1-based): base, 2*base, 4*base, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

/// Runs `call`, retrying retryable statuses and connect errors.
///
/// When retries run out the last response (or error) is returned as-is, so
/// the caller still sees the final status.
pub async fn with_retry<F, Fut>(
    policy: &RetryPolicy,
    worker: WorkerId,
    target: &str,
    mut call: F,
) -> reqwest::Result<Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = reqwest::Result<Response>>,
{
    let mut retry = 0;
    loop {
        let result = call().await;

        let retryable = match &result {
            Ok(response) => policy.is_retryable_status(response.status()),
            Err(e) => e.is_connect(),
        };
        if !retryable || retry >= policy.max_retries {
            return result;
        }

        retry += 1;
        let delay = policy.delay_for(retry);
        match &result {
            Ok(response) => tracing::debug!(
                "[worker-{}] [RETRY] {} returned HTTP {}, retry {}/{} in {:?}",
                worker,
                target,
                response.status(),
                retry,
                policy.max_retries,
                delay
            ),
            Err(e) => tracing::debug!(
                "[worker-{}] [RETRY] {} connection failed ({}), retry {}/{} in {:?}",
                worker,
                target,
                e,
                retry,
                policy.max_retries,
                delay
            ),
        }
        tokio::time::sleep(delay).await;
    }
}
