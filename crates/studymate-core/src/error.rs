use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudyMateError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Attachment error: {0}")]
    Attachment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StudyMateError>;
