use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("record is not attached to a machine")]
    Detached,

    #[error("extra data error: {0}")]
    Store(#[from] extradata::ExtraDataError),
}

pub type Result<T> = std::result::Result<T, PortError>;
