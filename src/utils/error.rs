use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("HTTP {status} from {endpoint}")]
    HttpStatusError { status: u16, endpoint: String },

    #[error("Request to {endpoint} failed after {attempts} attempts ({reason})")]
    RetryExhaustedError {
        endpoint: String,
        attempts: u32,
        reason: String,
    },

    #[error("Circuit open for {resource}")]
    CircuitOpenError { resource: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Storage {operation} on {bucket} failed: {message}")]
    StorageError {
        operation: String,
        bucket: String,
        message: String,
    },

    #[error("Queue {operation} on {queue} failed: {message}")]
    QueueError {
        operation: String,
        queue: String,
        message: String,
    },

    #[error("Not found: {resource}")]
    NotFoundError { resource: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

impl AdapterError {
    /// Short label used for metrics and log grouping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "api",
            Self::HttpStatusError { .. } => "http_status",
            Self::RetryExhaustedError { .. } => "retry_exhausted",
            Self::CircuitOpenError { .. } => "circuit_open",
            Self::DatabaseError(_) => "database",
            Self::StorageError { .. } => "storage",
            Self::QueueError { .. } => "queue",
            Self::NotFoundError { .. } => "not_found",
            Self::IoError(_) => "io",
            Self::SerializationError(_) => "serialization",
            Self::MetricsError(_) => "metrics",
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "config",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFoundError { .. })
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
