use crate::command::CommandError;

#[derive(Debug, thiserror::Error)]
pub enum VBoxManageError {
    #[error("VBoxManage not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Command(#[from] CommandError),
}

pub type Result<T> = std::result::Result<T, VBoxManageError>;
