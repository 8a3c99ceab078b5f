#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no forwarding rule named {0:?}")]
    RuleNotFound(String),

    #[error(transparent)]
    VBoxManage(#[from] vboxmanage::VBoxManageError),

    #[error(transparent)]
    Port(#[from] portfwd::PortError),

    #[error(transparent)]
    Store(#[from] extradata::ExtraDataError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
