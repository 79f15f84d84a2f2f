use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Malformed record in '{0}'")]
    Malformed(String, #[source] serde_json::Error),
    #[error("Hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Background task failed")]
    Join(#[from] tokio::task::JoinError),
}

impl DomainError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound(_))
    }
}
