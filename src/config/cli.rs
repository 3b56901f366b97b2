use crate::config::settings::LookupSettings;
use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "ip-batch-lookup")]
#[command(about = "Batch IP lookup: TXT/JSON domain list to CSV with concurrent, rate-limited requests")]
pub struct CliConfig {
    #[arg(short, long, help = "File with domains (.txt or .json)")]
    pub input: PathBuf,

    #[arg(short, long, help = "Number of concurrent workers [default: 3]")]
    pub workers: Option<usize>,

    #[arg(long, help = "Items per persisted chunk [default: 100]")]
    pub chunk_size: Option<usize>,

    #[arg(long, help = "Directory for result files [default: results]")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Lookup API base URL [default: http://ip-api.com/json]")]
    pub api_endpoint: Option<String>,

    #[arg(long, help = "Per-request timeout in seconds [default: 10]")]
    pub timeout_secs: Option<u64>,

    #[arg(short, long, help = "Optional TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    #[arg(long, default_value = "batch_ip_lookup.log", help = "Debug log file")]
    pub log_file: PathBuf,

    #[arg(long, help = "Do not write the debug log file")]
    pub no_log_file: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage after each chunk")]
    pub monitor: bool,
}

impl CliConfig {
    pub fn log_file(&self) -> Option<&PathBuf> {
        (!self.no_log_file).then_some(&self.log_file)
    }

    /// 命令列 > TOML > 內建預設
    pub fn to_settings(&self) -> Result<LookupSettings> {
        let mut settings = LookupSettings::new(self.input.clone());

        if let Some(path) = &self.config {
            let toml = TomlConfig::from_file(path)?;
            settings = settings.apply_toml(&toml);
        }

        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(chunk_size) = self.chunk_size {
            settings.chunk_size = chunk_size;
        }
        if let Some(output_dir) = &self.output_dir {
            settings.output_dir = output_dir.clone();
        }
        if let Some(endpoint) = &self.api_endpoint {
            settings.api_endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.timeout_secs {
            settings.request_timeout = Duration::from_secs(timeout);
        }
        settings.monitor |= self.monitor;

        Ok(settings.with_telegram(self.telegram_token.clone(), self.telegram_chat_id.clone()))
    }
}
