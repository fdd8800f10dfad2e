use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Scheduler Error: {0}")]
    Scheduler(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;
