//! # Error Types
//!
//! Errors raised by the shared ledger entities.

use shared_crypto::CryptoError;
use thiserror::Error;

/// A sealed block was asked to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Block #{number} is sealed and cannot be modified")]
pub struct SealedBlockError {
    /// Number of the sealed block.
    pub number: u64,
}

/// Errors raised while signing a block header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockSigningError {
    /// The block was already sealed.
    #[error(transparent)]
    Sealed(#[from] SealedBlockError),

    /// The signing key failed.
    #[error("Signing failed: {0}")]
    Crypto(#[from] CryptoError),
}

/// Errors raised while deriving the sender of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// Signature did not recover to a public key.
    #[error("Invalid transaction signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    /// RLP payload did not describe a transaction.
    #[error("Malformed transaction encoding: {0}")]
    Malformed(String),
}
