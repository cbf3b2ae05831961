//! # Shared Crypto
//!
//! Cryptographic primitives used by the producer schedule, chain acceptance
//! and the external-chain bridge.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256, double SHA-256 | Ledger hashes, external txids |
//! | `ecdsa` | secp256k1 | Producer header signatures, federator signatures |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization
//! - **Recoverable signatures**: 65-byte `r || s || v` form so a header
//!   signature can be checked against a claimed address without the key

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{
    recover_ledger_address, RecoverableSignature, Secp256k1KeyPair, Secp256k1PublicKey,
    Secp256k1Signature,
};
pub use errors::CryptoError;
pub use hashing::{double_sha256, keccak256, keccak256_many, keccak_merkle_root, short_hash};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
