use thiserror::Error;

/// Library error types.
///
/// Store and protocol failures propagate uncaught to the caller; there is no
/// automatic retry at this layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Failed to create Redis pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A tagged object carried a `_type` the codec does not recognise.
    /// Treat the payload as corrupt or incompatible, not retryable.
    #[error("_type {0} unknown")]
    UnknownTag(String),

    /// A recognised `_type` tag whose `value` field is missing or malformed.
    #[error("Malformed {tag} payload: {detail}")]
    Codec { tag: String, detail: String },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Environment variable not set and no default given.
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {key}: {detail}")]
    InvalidVar { key: String, detail: String },

    #[error("Queue error: {0}")]
    Queue(String),
}

pub type Result<T> = std::result::Result<T, Error>;
