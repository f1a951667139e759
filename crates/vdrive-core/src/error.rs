use thiserror::Error;

pub type DriveResult<T> = Result<T, DriveError>;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("verifier error: {0}")]
    Verify(String),

    #[error("upload error: {0}")]
    Upload(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
