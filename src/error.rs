//! Error types for ekodash

use thiserror::Error;

/// Result type alias for ekodash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Upstream provider errors.
///
/// Every variant is scoped to a single item (ticker or series code); none of
/// them aborts a refresh tick.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Rate limit reached for provider {provider}; request skipped")]
    RateLimited { provider: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream server error: {0}")]
    Server(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("No data returned for {0}")]
    NoData(String),

    #[error("Unsupported range: {0}")]
    UnsupportedRange(String),

    #[error("Upstream request for {key} failed after {attempts} attempts: {last}")]
    Exhausted {
        key: String,
        attempts: u32,
        #[source]
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_) | ProviderError::Server(_) | ProviderError::InvalidResponse(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ProviderError::Network("Failed to connect to upstream".to_string())
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Instrument configuration not found at {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not determine a data directory")]
    NoDataDir,

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}
