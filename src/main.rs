use anyhow::Context;
use clap::Parser;
use ip_batch_lookup::utils::error::ErrorSeverity;
use ip_batch_lookup::utils::{logger, validation::Validate};
use ip_batch_lookup::{CliConfig, LookupEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    let log_file = config.log_file().map(|p| p.as_path());
    let logger_ready = if config.json_logs {
        logger::init_json_logger(config.verbose, log_file)
    } else {
        logger::init_cli_logger(config.verbose, log_file)
    };
    logger_ready.with_context(|| format!("cannot open log file {}", config.log_file.display()))?;

    tracing::info!("Starting ip-batch-lookup CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if !config.input.exists() {
        tracing::error!("❌ Input file not found: {}", config.input.display());
        eprintln!("❌ Input file not found: {}", config.input.display());
        std::process::exit(1);
    }

    // 解析並驗證配置
    let settings = match config.to_settings().and_then(|settings| {
        settings.validate()?;
        Ok(settings)
    }) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if settings.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    if settings.telegram.is_some() {
        tracing::info!("📨 Telegram notifications enabled");
    }

    let engine = LookupEngine::new(settings);

    match engine.run().await {
        Ok(report) => {
            println!("✅ Batch lookup completed");
            println!(
                "📊 Total: {}, succeeded: {}, failed: {}",
                report.total, report.succeeded, report.failed
            );
            println!("📁 Output saved to: {}", report.output.display());
        }
        Err(e) => {
            tracing::error!(
                "❌ Batch lookup failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
