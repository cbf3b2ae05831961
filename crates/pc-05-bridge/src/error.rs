//! Error types for the bridge

use pc_04_federation::FederationError;
use shared_crypto::CryptoError;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that abort a bridge call.
///
/// Ignored or rejected registrations are not errors; they are reported as
/// [`crate::RegistrationOutcome`] values. A call that returns an error leaves
/// bridge state untouched.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// External transaction bytes could not be parsed or carry no inputs
    #[error("Malformed external transaction: {0}")]
    MalformedTransaction(String),

    /// Script could not be parsed
    #[error("Malformed script: {0}")]
    MalformedScript(String),

    /// External chain view failed
    #[error("External chain error: {0}")]
    ExternalChain(String),

    /// Ledger account transfer failed
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Persisting or loading bridge state failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cryptographic failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Federation registry failure
    #[error(transparent)]
    Federation(#[from] FederationError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeError {
    /// Retryable by resubmitting the same call later.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::ExternalChain(_) | BridgeError::Ledger(_) | BridgeError::Storage(_)
        )
    }
}

impl From<bincode::Error> for BridgeError {
    fn from(e: bincode::Error) -> Self {
        BridgeError::Storage(e.to_string())
    }
}
