use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("Todo list not found")]
    NotFound,
    #[error("Invalid edit token")]
    InvalidToken,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
