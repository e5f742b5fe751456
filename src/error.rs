use thiserror::Error;

// Error taxonomy shared by the client, the provider service and the store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        status: Option<u16>,
    },
    #[error("Client error ({status}): {message}")]
    Client { status: u16, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn network(message: impl Into<String>) -> Self {
        AppError::Network {
            message: message.into(),
            status: None,
        }
    }

    /// Maps a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: u16, url: &str) -> Self {
        match status {
            404 => AppError::NotFound(url.to_string()),
            400..=499 => AppError::Client {
                status,
                message: format!("request to {} rejected", url),
            },
            _ => AppError::Network {
                message: format!("request to {} failed with status {}", url, status),
                status: Some(status),
            },
        }
    }

    /// Timeouts, connection failures and 5xx responses are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Network { status, .. } => status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::Parse(err.to_string());
        }
        if err.is_builder() {
            return AppError::Client {
                status: 0,
                message: err.to_string(),
            };
        }
        match err.status() {
            Some(status) => AppError::from_status(
                status.as_u16(),
                err.url().map(|u| u.as_str()).unwrap_or_default(),
            ),
            None => AppError::network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}
