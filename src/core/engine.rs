use crate::adapters::{CsvSink, DomainReader, TelegramNotifier};
use crate::config::LookupSettings;
use crate::core::coordinator::BatchCoordinator;
use crate::core::lookup_client::IpApiClient;
use crate::core::rate_limiter::RateLimiter;
use crate::core::worker_pool::WorkerPool;
use crate::core::{Notifier, ResultSink, RunReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::sync::Arc;

/// 讀取輸入、執行批次查詢、寫出結果並發送通知
pub struct LookupEngine {
    settings: LookupSettings,
    notifier: Option<Box<dyn Notifier>>,
}

impl LookupEngine {
    pub fn new(settings: LookupSettings) -> Self {
        let notifier = settings.telegram.as_ref().map(|telegram| {
            Box::new(TelegramNotifier::new(&telegram.token, &telegram.chat_id)) as Box<dyn Notifier>
        });

        Self { settings, notifier }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn settings(&self) -> &LookupSettings {
        &self.settings
    }

    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("🚀 Starting batch ip-lookup");

        let items = DomainReader::read(&self.settings.input)?;
        tracing::info!(
            "📑 Total items: {}, workers: {}",
            items.len(),
            self.settings.workers
        );

        let sink = CsvSink::create(&self.settings.output_dir)?;
        tracing::info!("📝 Writing results to {}", sink.location().display());

        let limiter = Arc::new(RateLimiter::new());
        let client = IpApiClient::new(
            &self.settings.api_endpoint,
            self.settings.request_timeout,
            limiter,
        )?
        .with_retry_policy(self.settings.retry.clone());

        let coordinator = BatchCoordinator::new(
            Arc::new(client),
            sink,
            WorkerPool::new(self.settings.workers),
            self.settings.chunk_size,
        )
        .with_monitor(SystemMonitor::new(self.settings.monitor));

        let report = coordinator.run(items).await?;
        coordinator.monitor().log_final_stats();

        tracing::info!(
            "🎉 All chunks processed, results in {}",
            report.output.display()
        );
        tracing::info!(
            "📊 Total: {}, succeeded: {}, failed: {}, elapsed: {:?}",
            report.total,
            report.succeeded,
            report.failed,
            report.elapsed
        );

        if let Some(notifier) = &self.notifier {
            Self::announce(notifier.as_ref(), &report).await;
        }

        Ok(report)
    }

    /// 通知失敗只記錄，不影響執行結果
    async fn announce(notifier: &dyn Notifier, report: &RunReport) {
        let summary = report.summary();

        tracing::info!("📤 Sending Telegram notification...");
        match notifier.notify(&summary).await {
            Ok(()) => tracing::info!("📤 Notification sent"),
            Err(e) => tracing::error!("[Telegram] {}", e),
        }

        tracing::info!("📤 Sending results file...");
        match notifier.deliver_artifact(&report.output, &summary).await {
            Ok(()) => tracing::info!("📤 Results file sent"),
            Err(e) => tracing::error!("[Telegram] {}", e),
        }
    }
}
