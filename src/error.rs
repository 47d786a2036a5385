use thiserror::Error;

#[derive(Error, Debug)]
pub enum VietsubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task {0} has no associated videos")]
    NoVideo(i64),

    #[error("No playable source: {0}")]
    SourceNotFound(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, VietsubError>;
