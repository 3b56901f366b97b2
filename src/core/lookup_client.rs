use crate::core::rate_limiter::RateLimiter;
use crate::core::retry::{with_retry, RetryPolicy};
use crate::domain::model::{FailureReason, LookupOutcome, LookupRecord, WorkItem};
use crate::domain::ports::{Lookup, WorkerId};
use crate::utils::error::Result;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://ip-api.com/json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const RESPONSE_FIELDS: &str = "status,message,country,isp,org,as";
const SUCCESS_STATUS: &str = "success";

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    country: Option<String>,
    isp: Option<String>,
    org: Option<String>,
    #[serde(rename = "as")]
    as_number: Option<String>,
}

/// ip-api.com 風格的 JSON 查詢客戶端
pub struct IpApiClient {
    client: Client,
    endpoint: String,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl IpApiClient {
    pub fn new(endpoint: &str, timeout: Duration, limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            limiter,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    fn url_for(&self, item: &WorkItem) -> String {
        format!("{}/{}?fields={}", self.endpoint, item, RESPONSE_FIELDS)
    }

    fn transient(item: &WorkItem, worker: WorkerId, detail: String) -> LookupOutcome {
        tracing::warn!("[worker-{}] [API] Lookup failed for {}: {}", worker, item, detail);
        LookupOutcome::failure(item, FailureReason::Transient(detail))
    }
}

#[async_trait::async_trait]
impl Lookup for IpApiClient {
    async fn lookup(&self, item: &WorkItem, worker: WorkerId) -> LookupOutcome {
        tracing::debug!("[worker-{}] [LOOKUP] Start lookup for {}", worker, item);

        self.limiter.wait_if_needed(worker).await;

        let url = self.url_for(item);
        let response = match with_retry(&self.retry, worker, item.as_str(), || {
            self.client.get(&url).send()
        })
        .await
        {
            Ok(response) => response,
            Err(e) => return Self::transient(item, worker, e.to_string()),
        };

        // 每個收到的回應都要更新全域水位線，包括錯誤狀態碼
        self.limiter.record_headers(response.headers(), worker);

        let http_status = response.status();
        if !http_status.is_success() {
            return Self::transient(item, worker, format!("HTTP {}", http_status));
        }

        let body: IpApiResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return Self::transient(item, worker, format!("malformed response body: {}", e))
            }
        };

        tracing::debug!(
            "[worker-{}] [LOOKUP] Received status={:?} for {}",
            worker,
            body.status,
            item
        );

        if body.status.as_deref() != Some(SUCCESS_STATUS) {
            tracing::debug!(
                "[worker-{}] [LOOKUP] Unsuccessful status for {}, skipping",
                worker,
                item
            );
            return LookupOutcome::failure(item, FailureReason::NonSuccessStatus(body.message));
        }

        LookupOutcome::Success(LookupRecord {
            domain: item.as_str().to_string(),
            country: body.country,
            isp: body.isp,
            organization: body.org,
            as_number: body.as_number,
        })
    }
}
