//! # ECDSA Signatures (secp256k1)
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization
//! - Constant-time operations
//!
//! ## Use Cases
//!
//! - Block producer header signatures (recoverable, checked against coinbase)
//! - Ledger transaction signatures (recoverable, sender derivation)
//! - Federator signatures over external-chain signature hashes

use crate::hashing::{keccak256, short_hash};
use crate::CryptoError;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    RecoveryId, Signature, SigningKey, VerifyingKey,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;
use zeroize::Zeroize;

/// Compressed secp256k1 public key (33 bytes).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Secp256k1PublicKey(#[serde_as(as = "Bytes")] [u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Parse any SEC1 encoding (compressed or uncompressed) and normalize it
    /// to the compressed form.
    pub fn from_sec1_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self::from_verifying_key(&key))
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Self(bytes)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Uncompressed SEC1 encoding (65 bytes, `0x04 || x || y`).
    pub fn to_uncompressed(&self) -> Result<[u8; 65], CryptoError> {
        let key = VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let point = key.to_encoded_point(false);
        let mut bytes = [0u8; 65];
        bytes.copy_from_slice(point.as_bytes());
        Ok(bytes)
    }

    /// Verify a (non-recoverable) signature over `message`.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_slice(&signature.0)
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Ledger address: last 20 bytes of Keccak-256 over the uncompressed
    /// point without its `0x04` prefix.
    pub fn ledger_address(&self) -> [u8; 20] {
        match self.to_uncompressed() {
            Ok(uncompressed) => address_from_uncompressed(&uncompressed),
            // Unreachable for keys built through the validating constructors.
            Err(_) => [0u8; 20],
        }
    }

    /// External-chain address: first 20 bytes of the double SHA-256 of the
    /// compressed key.
    pub fn external_address(&self) -> [u8; 20] {
        short_hash(&self.0)
    }
}

impl fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1PublicKey({})", hex::encode(self.0))
    }
}

fn address_from_uncompressed(uncompressed: &[u8; 65]) -> [u8; 20] {
    let digest = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}

/// ECDSA signature (64 bytes, r||s format).
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Secp256k1Signature(#[serde_as(as = "Bytes")] [u8; 64]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, failing unless it is exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(array))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// Recoverable ECDSA signature (65 bytes, `r || s || v` with `v` in 0..=3).
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecoverableSignature(#[serde_as(as = "Bytes")] [u8; 65]);

impl RecoverableSignature {
    /// Create from bytes (65 bytes).
    pub fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Recover the signer's public key for `message`.
    pub fn recover(&self, message: &[u8]) -> Result<Secp256k1PublicKey, CryptoError> {
        let sig = Signature::from_slice(&self.0[..64])
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        let recovery_id =
            RecoveryId::from_byte(self.0[64]).ok_or(CryptoError::InvalidSignatureFormat)?;
        let key = VerifyingKey::recover_from_msg(message, &sig, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;
        Ok(Secp256k1PublicKey::from_verifying_key(&key))
    }
}

/// Recover the ledger address that produced `signature` over `message`.
pub fn recover_ledger_address(
    message: &[u8],
    signature: &RecoverableSignature,
) -> Result<[u8; 20], CryptoError> {
    let public_key = signature.recover(message)?;
    Ok(public_key.ledger_address())
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Ledger address of this keypair.
    pub fn ledger_address(&self) -> [u8; 20] {
        self.public_key().ledger_address()
    }

    /// Sign a message (deterministic RFC 6979).
    pub fn sign(&self, message: &[u8]) -> Secp256k1Signature {
        let sig: Signature = self.signing_key.sign(message);
        let bytes: [u8; 64] = sig.to_bytes().into();
        Secp256k1Signature(bytes)
    }

    /// Sign a message producing a recoverable signature.
    pub fn sign_recoverable(&self, message: &[u8]) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recovery_id) = self
            .signing_key
            .sign_recoverable(message)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(RecoverableSignature(bytes))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Clone for Secp256k1KeyPair {
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
        }
    }
}

impl fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Secp256k1KeyPair::generate();
        let message = b"Hello, secp256k1!";

        let signature = keypair.sign(message);
        let result = keypair.public_key().verify(message, &signature);

        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = Secp256k1KeyPair::generate();

        let signature = keypair.sign(b"message1");
        let result = keypair.public_key().verify(b"message2", &signature);

        assert!(result.is_err());
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let message = b"deterministic test";

        let sig1 = keypair.sign(message);
        let sig2 = keypair.sign(message);

        assert_eq!(sig1.as_bytes(), sig2.as_bytes());
    }

    #[test]
    fn test_recover_ledger_address() {
        let keypair = Secp256k1KeyPair::from_bytes([0x11u8; 32]).unwrap();
        let signature = keypair.sign_recoverable(b"header").unwrap();

        let recovered = recover_ledger_address(b"header", &signature).unwrap();
        assert_eq!(recovered, keypair.ledger_address());

        let other = recover_ledger_address(b"other header", &signature);
        assert_ne!(other.ok(), Some(keypair.ledger_address()));
    }

    #[test]
    fn test_uncompressed_parse_normalizes() {
        let keypair = Secp256k1KeyPair::generate();
        let public = keypair.public_key();
        let uncompressed = public.to_uncompressed().unwrap();

        let parsed = Secp256k1PublicKey::from_sec1_slice(&uncompressed).unwrap();
        assert_eq!(parsed, public);
    }

    #[test]
    fn test_invalid_public_key_rejected() {
        assert_eq!(
            Secp256k1PublicKey::from_bytes([0x05u8; 33]),
            Err(CryptoError::InvalidPublicKey)
        );
        assert!(Secp256k1PublicKey::from_sec1_slice(&[0x02, 0x01]).is_err());
    }

    #[test]
    fn test_addresses_differ_between_chains() {
        let public = Secp256k1KeyPair::from_bytes([0x22u8; 32]).unwrap().public_key();
        assert_ne!(public.ledger_address(), public.external_address());
    }

    #[test]
    fn test_roundtrip_bytes() {
        let original = Secp256k1KeyPair::generate();
        let bytes = original.to_bytes();
        let restored = Secp256k1KeyPair::from_bytes(bytes).unwrap();

        assert_eq!(original.public_key(), restored.public_key());
    }
}
