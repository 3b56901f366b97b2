use crate::domain::model::{LookupOutcome, LookupRecord, WorkItem};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// 工作槽編號 (1..=worker_count)，只用於日誌標記
pub type WorkerId = usize;

#[async_trait]
pub trait Lookup: Send + Sync {
    /// 失敗以 `LookupOutcome::Failure` 表示，不回傳錯誤
    async fn lookup(&self, item: &WorkItem, worker: WorkerId) -> LookupOutcome;
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// 回傳前必須已寫入穩定儲存
    async fn append(&self, records: &[LookupRecord]) -> Result<()>;

    fn location(&self) -> &Path;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<()>;

    async fn deliver_artifact(&self, path: &Path, caption: &str) -> Result<()>;
}
