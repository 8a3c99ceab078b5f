#[derive(Debug, thiserror::Error)]
pub enum ExtraDataError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtraDataError>;
