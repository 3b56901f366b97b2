use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Input error for {path}: {message}")]
    Input { path: String, message: String },

    #[error("Failed to persist chunk {chunk}: {message}")]
    Persistence { chunk: usize, message: String },

    #[error("Notification failed: {message}")]
    Notification { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Persistence,
    Network,
    Configuration,
    Notification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LookupError {
    pub fn input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input { .. } | Self::Serialization(_) => ErrorCategory::Input,
            Self::Persistence { .. } | Self::Csv(_) | Self::Io(_) => ErrorCategory::Persistence,
            Self::Http(_) => ErrorCategory::Network,
            Self::Notification { .. } => ErrorCategory::Notification,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 通知失敗不影響批次結果
            ErrorCategory::Notification => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Persistence => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Check that the input file exists and is a .txt or .json list of domains"
            }
            ErrorCategory::Persistence => {
                "Check free disk space and write permissions of the output directory; chunks already saved remain valid"
            }
            ErrorCategory::Network => "Check network connectivity and the API endpoint, then retry",
            ErrorCategory::Configuration => "Review the command line flags and the TOML config file",
            ErrorCategory::Notification => "Verify TELEGRAM_TOKEN and TELEGRAM_CHAT_ID",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Input { path, message } => format!("Cannot read input '{}': {}", path, message),
            Self::Persistence { chunk, .. } => {
                format!("Results could not be saved (chunk {}), run stopped", chunk)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;
