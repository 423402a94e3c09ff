use thiserror::Error;

#[derive(Debug, Error)]
pub enum RingbackError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Telephony error: {0}")]
    Telephony(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RingbackError>;
