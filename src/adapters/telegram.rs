use crate::domain::ports::Notifier;
use crate::utils::error::{LookupError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::path::Path;
use std::time::Duration;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TelegramNotifier {
    client: Client,
    bot_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self::with_api_base(TELEGRAM_API_BASE, token, chat_id)
    }

    pub fn with_api_base(api_base: &str, token: &str, chat_id: &str) -> Self {
        Self {
            client: Client::new(),
            bot_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        }
    }

    async fn check(method: &str, result: reqwest::Result<Response>) -> Result<()> {
        let response = result.map_err(|e| LookupError::Notification {
            message: format!("{} request failed: {}", method, e),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(LookupError::Notification {
            message: format!("{} returned HTTP {}: {}", method, status, body),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        let result = self
            .client
            .post(format!("{}/sendMessage", self.bot_url))
            .timeout(MESSAGE_TIMEOUT)
            .json(&serde_json::json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await;

        Self::check("sendMessage", result).await
    }

    async fn deliver_artifact(&self, path: &Path, caption: &str) -> Result<()> {
        let bytes = tokio::fs::read(path).await.map_err(|e| LookupError::Notification {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results.csv".to_string());

        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name));

        let result = self
            .client
            .post(format!("{}/sendDocument", self.bot_url))
            .timeout(DOCUMENT_TIMEOUT)
            .multipart(form)
            .send()
            .await;

        Self::check("sendDocument", result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_notify_posts_message() {
        let server = MockServer::start();
        let telegram_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .json_body(serde_json::json!({"chat_id": "42", "text": "done"}));
            then.status(200).json_body(serde_json::json!({"ok": true}));
        });

        let notifier = TelegramNotifier::with_api_base(&server.base_url(), "123:abc", "42");
        notifier.notify("done").await.unwrap();

        telegram_mock.assert();
    }

    #[tokio::test]
    async fn test_deliver_artifact_uploads_file() {
        let server = MockServer::start();
        let telegram_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendDocument")
                .body_contains("domain,country")
                .body_contains("Batch finished");
            then.status(200).json_body(serde_json::json!({"ok": true}));
        });

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"domain,country,isp,organization,as\n").unwrap();

        let notifier = TelegramNotifier::with_api_base(&server.base_url(), "123:abc", "42");
        notifier
            .deliver_artifact(file.path(), "Batch finished")
            .await
            .unwrap();

        telegram_mock.assert();
    }

    #[tokio::test]
    async fn test_api_error_is_notification_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/botbad/sendMessage");
            then.status(401)
                .json_body(serde_json::json!({"ok": false, "description": "Unauthorized"}));
        });

        let notifier = TelegramNotifier::with_api_base(&server.base_url(), "bad", "42");
        let err = notifier.notify("done").await.unwrap_err();

        assert!(matches!(err, LookupError::Notification { .. }));
        assert!(err.to_string().contains("401"));
    }
}
