//! Error types for the federation registry

use shared_crypto::CryptoError;
use thiserror::Error;

/// Result type alias for federation operations
pub type Result<T> = std::result::Result<T, FederationError>;

/// Errors raised while building federations or authorizers.
///
/// Vote-driven operations never return these; they answer with the
/// sentinel codes in [`crate::codes`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FederationError {
    /// A federation needs at least one key
    #[error("Federation has no public keys")]
    EmptyFederation,

    /// More keys than a multisig redeem script can carry
    #[error("Federation has {0} keys, at most 15 allowed")]
    TooManyKeys(usize),

    /// A public key could not be parsed
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(#[from] CryptoError),

    /// A voter address could not be parsed
    #[error("Invalid voter address: {0}")]
    InvalidVoterAddress(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
