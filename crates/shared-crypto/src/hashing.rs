//! # Hashing
//!
//! Keccak-256 for everything on the ledger side (transactions, headers,
//! addresses) and double SHA-256 for the external UTXO chain.

use sha2::{Digest as _, Sha256};
use sha3::Keccak256;

/// 256-bit hash output.
pub type Hash = [u8; 32];

/// Keccak-256 of a single input.
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Keccak-256 over the concatenation of several inputs.
pub fn keccak256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// `sha256(sha256(data))`, the external chain's txid and merkle hash.
pub fn double_sha256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// First 20 bytes of [`double_sha256`]: external-chain key and script hashes.
pub fn short_hash(data: &[u8]) -> [u8; 20] {
    let digest = double_sha256(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[..20]);
    out
}

/// Binary Keccak merkle root over a list of leaves.
///
/// An odd node at any level is paired with itself. The root of an empty
/// list is the Keccak-256 of the empty string.
pub fn keccak_merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return keccak256(&[]);
    }
    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                keccak256_many(&[&pair[0], right])
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_double_sha256_vector() {
        assert_eq!(
            hex::encode(double_sha256(b"hello")),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }

    #[test]
    fn test_keccak_many_matches_concatenation() {
        assert_eq!(keccak256_many(&[b"ab", b"cd"]), keccak256(b"abcd"));
    }

    #[test]
    fn test_merkle_root_single_leaf_is_leaf() {
        let leaf = keccak256(b"tx");
        assert_eq!(keccak_merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn test_merkle_root_order_sensitive() {
        let a = keccak256(b"a");
        let b = keccak256(b"b");
        assert_ne!(keccak_merkle_root(&[a, b]), keccak_merkle_root(&[b, a]));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;
        use proptest::prelude::prop;

        proptest! {
            #[test]
            fn keccak_many_any_split(data in prop::collection::vec(any::<u8>(), 0..256), cut in any::<prop::sample::Index>()) {
                let at = cut.index(data.len() + 1);
                let (a, b) = data.split_at(at);
                prop_assert_eq!(keccak256_many(&[a, b]), keccak256(&data));
            }

            #[test]
            fn short_hash_is_double_sha_prefix(data in prop::collection::vec(any::<u8>(), 0..128)) {
                prop_assert_eq!(&short_hash(&data)[..], &double_sha256(&data)[..20]);
            }
        }
    }
}
