use crate::config::toml_config::TomlConfig;
use crate::core::coordinator::DEFAULT_CHUNK_SIZE;
use crate::core::lookup_client::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use crate::core::retry::RetryPolicy;
use crate::core::worker_pool::DEFAULT_WORKERS;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RESULTS_DIR: &str = "results";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: String,
}

/// 一次批次執行的最終設定 (命令列 > TOML > 內建預設)
#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub input: PathBuf,
    pub api_endpoint: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub workers: usize,
    pub chunk_size: usize,
    pub output_dir: PathBuf,
    pub telegram: Option<TelegramSettings>,
    pub monitor: bool,
}

impl LookupSettings {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            api_endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            workers: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            output_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            telegram: None,
            monitor: false,
        }
    }

    pub fn apply_toml(mut self, config: &TomlConfig) -> Self {
        let api = config.api();
        if let Some(endpoint) = api.endpoint {
            self.api_endpoint = endpoint;
        }
        if let Some(timeout) = api.timeout_seconds {
            self.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(attempts) = api.retry_attempts {
            self.retry.max_retries = attempts;
        }
        if let Some(delay) = api.retry_delay_ms {
            self.retry.base_delay = Duration::from_millis(delay);
        }

        let batch = config.batch();
        if let Some(workers) = batch.workers {
            self.workers = workers;
        }
        if let Some(chunk_size) = batch.chunk_size {
            self.chunk_size = chunk_size;
        }

        if let Some(directory) = config.output_directory() {
            self.output_dir = PathBuf::from(directory);
        }

        let (token, chat_id) = config.telegram_credentials();
        self = self.with_telegram(token, chat_id);
        self.monitor |= config.monitoring_enabled();
        self
    }

    /// 只有 token 與 chat id 都存在時才啟用通知；單一值會覆蓋既有設定
    pub fn with_telegram(mut self, token: Option<String>, chat_id: Option<String>) -> Self {
        let token = token.or_else(|| self.telegram.as_ref().map(|t| t.token.clone()));
        let chat_id = chat_id.or_else(|| self.telegram.as_ref().map(|t| t.chat_id.clone()));

        self.telegram = match (token, chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramSettings { token, chat_id })
            }
            _ => None,
        };
        self
    }
}

impl Validate for LookupSettings {
    fn validate(&self) -> Result<()> {
        validate_path("input", &self.input.to_string_lossy())?;
        validate_url("api.endpoint", &self.api_endpoint)?;
        validate_positive_number("batch.workers", self.workers, 1)?;
        validate_positive_number("batch.chunk_size", self.chunk_size, 1)?;
        validate_positive_number(
            "api.timeout_seconds",
            self.request_timeout.as_secs() as usize,
            1,
        )?;
        validate_path("output.directory", &self.output_dir.to_string_lossy())?;

        if let Some(telegram) = &self.telegram {
            validate_non_empty_string("telegram.token", &telegram.token)?;
            validate_non_empty_string("telegram.chat_id", &telegram.chat_id)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = LookupSettings::new("domains.txt");

        assert_eq!(settings.workers, 3);
        assert_eq!(settings.chunk_size, 100);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.output_dir, PathBuf::from("results"));
        assert!(settings.telegram.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
[api]
endpoint = "https://pro.ip-api.com/json"
retry_attempts = 1
retry_delay_ms = 100

[batch]
workers = 6

[telegram]
token = "123:abc"
chat_id = "42"
"#,
        )
        .unwrap();

        let settings = LookupSettings::new("domains.txt").apply_toml(&config);

        assert_eq!(settings.api_endpoint, "https://pro.ip-api.com/json");
        assert_eq!(settings.retry.max_retries, 1);
        assert_eq!(settings.retry.base_delay, Duration::from_millis(100));
        assert_eq!(settings.workers, 6);
        assert_eq!(settings.chunk_size, 100);
        assert_eq!(
            settings.telegram,
            Some(TelegramSettings {
                token: "123:abc".to_string(),
                chat_id: "42".to_string(),
            })
        );
    }

    #[test]
    fn test_telegram_requires_both_values() {
        let settings =
            LookupSettings::new("domains.txt").with_telegram(Some("123:abc".to_string()), None);
        assert!(settings.telegram.is_none());
    }

    #[test]
    fn test_zero_workers_fail_validation() {
        let mut settings = LookupSettings::new("domains.txt");
        settings.workers = 0;
        assert!(settings.validate().is_err());

        let mut settings = LookupSettings::new("domains.txt");
        settings.api_endpoint = "not a url".to_string();
        assert!(settings.validate().is_err());
    }
}
