// 全域水位線：所有 worker 共用，只會往後移

use crate::domain::ports::WorkerId;
use reqwest::header::HeaderMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::{sleep_until, Duration, Instant};

/// Remaining requests in the current window.
pub const REMAINING_HEADER: &str = "x-rl";
/// Seconds until the window resets.
pub const TTL_HEADER: &str = "x-ttl";

#[derive(Debug, Default)]
pub struct RateLimiter {
    next_allowed_at: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_allowed_at(&self) -> Option<Instant> {
        *self.state()
    }

    fn state(&self) -> MutexGuard<'_, Option<Instant>> {
        // 守衛內只有讀寫 Instant，不會留下不一致的狀態
        self.next_allowed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 等到目前時間超過水位線；睡眠時不持有鎖
    pub async fn wait_if_needed(&self, worker: WorkerId) {
        loop {
            let deadline = match *self.state() {
                Some(at) if at > Instant::now() => at,
                _ => return,
            };

            let wait = deadline.saturating_duration_since(Instant::now());
            tracing::debug!(
                "[worker-{}] [RATE_LIMIT] Global limit active, waiting {:.2}s",
                worker,
                wait.as_secs_f64()
            );
            sleep_until(deadline).await;
        }
    }

    /// Returns true when the watermark moved forward.
    pub fn record_limit(&self, remaining: u64, retry_after_secs: u64) -> bool {
        if remaining != 0 || retry_after_secs == 0 {
            return false;
        }

        let Some(candidate) = Instant::now().checked_add(Duration::from_secs(retry_after_secs))
        else {
            tracing::warn!(
                "[RATE_LIMIT] Ignoring out-of-range reset time of {}s",
                retry_after_secs
            );
            return false;
        };
        let mut next_allowed_at = self.state();
        match *next_allowed_at {
            Some(current) if current >= candidate => false,
            _ => {
                *next_allowed_at = Some(candidate);
                true
            }
        }
    }

    /// 解析 X-Rl / X-Ttl；缺少或格式錯誤時只記錄日誌
    pub fn record_headers(&self, headers: &HeaderMap, worker: WorkerId) {
        let (remaining, ttl) = match (
            parse_header(headers, REMAINING_HEADER),
            parse_header(headers, TTL_HEADER),
        ) {
            (Some(remaining), Some(ttl)) => (remaining, ttl.unwrap_or(0)),
            _ => {
                tracing::warn!(
                    "[worker-{}] [RATE_LIMIT] Malformed X-Rl/X-Ttl headers: {:?}/{:?}",
                    worker,
                    headers.get(REMAINING_HEADER),
                    headers.get(TTL_HEADER)
                );
                return;
            }
        };

        let Some(remaining) = remaining else {
            return;
        };

        tracing::debug!(
            "[worker-{}] [RATE_LIMIT] Remaining requests: {}, reset in {}s",
            worker,
            remaining,
            ttl
        );

        if self.record_limit(remaining, ttl) {
            tracing::info!(
                "⏳ [worker-{}] Rate limit exhausted, pausing outbound calls for {}s",
                worker,
                ttl
            );
        }
    }
}

/// `None` when the header is present but not a non-negative integer.
fn parse_header(headers: &HeaderMap, name: &str) -> Option<Option<u64>> {
    match headers.get(name) {
        None => Some(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Some),
    }
}
