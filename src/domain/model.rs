use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// 單一查詢目標 (網域或 IP)，建立後不可變
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem(String);

impl WorkItem {
    /// 去除空白後為空字串則回傳 None
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 查詢成功的結果列，欄位順序即 CSV 欄位順序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRecord {
    pub domain: String,
    pub country: Option<String>,
    pub isp: Option<String>,
    pub organization: Option<String>,
    #[serde(rename = "as")]
    pub as_number: Option<String>,
}

impl LookupRecord {
    pub const HEADER: [&'static str; 5] = ["domain", "country", "isp", "organization", "as"];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// 逾時、連線錯誤、無法解析的回應或重試後仍為錯誤狀態碼
    Transient(String),
    /// API 回應的 status 不是 "success"
    NonSuccessStatus(Option<String>),
    /// 查詢任務 panic 或被取消
    Aborted(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(detail) => write!(f, "transient: {}", detail),
            Self::NonSuccessStatus(Some(message)) => write!(f, "non-success status: {}", message),
            Self::NonSuccessStatus(None) => f.write_str("non-success status"),
            Self::Aborted(detail) => write!(f, "aborted: {}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Success(LookupRecord),
    Failure {
        domain: String,
        reason: FailureReason,
    },
}

impl LookupOutcome {
    pub fn failure(item: &WorkItem, reason: FailureReason) -> Self {
        Self::Failure {
            domain: item.as_str().to_string(),
            reason,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// 連續切片的一段，flush 完成後才處理下一段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub offset: usize,
    pub items: Vec<WorkItem>,
}

impl Chunk {
    /// 1-based 的起訖位置，用於進度日誌
    pub fn bounds(&self) -> (usize, usize) {
        (self.offset + 1, self.offset + self.items.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub chunks: usize,
    pub output: PathBuf,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn file_name(&self) -> String {
        self.output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output.display().to_string())
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch ip-lookup finished. File: {}\nTotal: {}, succeeded: {}, failed: {}",
            self.file_name(),
            self.total,
            self.succeeded,
            self.failed
        )
    }
}
