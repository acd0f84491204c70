//! Error taxonomy for vault operations.

use crate::core::codec::CodecError;
use crate::core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("service {0} does not exist")]
    ServiceNotFound(String),

    #[error("user {username} does not exist in service {service}")]
    UserNotFound { service: String, username: String },

    #[error("user {username} already exists in service {service}")]
    UserExists { service: String, username: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Backend(#[from] StoreError),

    #[error("worker panicked: {0}")]
    WorkerPanic(String),
}

impl VaultError {
    /// Whether this error means the named service or user is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VaultError::ServiceNotFound(_) | VaultError::UserNotFound { .. }
        )
    }
}
