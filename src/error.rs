use teloxide::RequestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GastoBotError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Message source unavailable: {0}")]
    Source(#[from] RequestError),

    #[error("Parser error: {message}")]
    Parser { message: String },

    #[error("Invalid numeric data for key {key}: {message}")]
    InvalidNumericData { key: i64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, GastoBotError>;

impl GastoBotError {
    pub fn parser_error(message: impl Into<String>) -> Self {
        Self::Parser {
            message: message.into(),
        }
    }

    pub fn invalid_numeric_data(key: i64, message: impl Into<String>) -> Self {
        Self::InvalidNumericData {
            key,
            message: message.into(),
        }
    }

    /// Transient failures worth another attempt: the store, the message
    /// source, and raw IO. Grammar and config problems never heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GastoBotError::Database(_) | GastoBotError::Source(_) | GastoBotError::Io(_)
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GastoBotError::Config(_) => ErrorSeverity::Critical,
            GastoBotError::Database(_) => ErrorSeverity::High,
            GastoBotError::Source(_) => ErrorSeverity::Medium,
            GastoBotError::Parser { .. } => ErrorSeverity::Low,
            GastoBotError::InvalidNumericData { .. } => ErrorSeverity::Low,
            GastoBotError::Io(_) => ErrorSeverity::Medium,
            GastoBotError::Env(_) => ErrorSeverity::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
