//! Error types for cosigner operations

use crate::algebra::SignAlgorithm;
use thiserror::Error;

/// Result type alias for cosigner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the key-refresh protocol
#[derive(Debug, Error)]
pub enum Error {
    /// Key does not belong to the requesting tenant
    #[error("key does not belong to the requesting tenant")]
    Unauthorized,

    /// Malformed or inconsistent protocol input
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// No scalar arithmetic is available for the algorithm
    #[error("no algebra available for algorithm {0}")]
    UnknownAlgorithm(SignAlgorithm),

    /// Key backup failed after the refresh was already committed
    #[error("key backup failed, refresh itself succeeded")]
    BackupFailed,

    /// Persistency layer failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Envelope encryption or decryption failure
    #[error("encryption error: {0}")]
    Encryption(String),
}
