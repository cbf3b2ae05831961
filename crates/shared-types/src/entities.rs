//! # Core Domain Entities
//!
//! Block header, sealed block and receipt types.
//!
//! ## Sealing
//!
//! A block is sealed once its header is signed. Every content mutator returns
//! [`SealedBlockError`] on a sealed block. The `irreversible` flag is not
//! content: it may be raised on a sealed block but never lowered.

use crate::errors::{BlockSigningError, SealedBlockError};
use crate::transaction::{ProducerListTransaction, Transaction};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};
use shared_crypto::hashing::keccak_merkle_root;
use shared_crypto::{
    keccak256, recover_ledger_address, CryptoError, RecoverableSignature, Secp256k1KeyPair,
};

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 20-byte ledger address.
pub type Address = [u8; 20];

/// The all-zero hash (genesis parent).
pub const ZERO_HASH: Hash = [0u8; 32];

/// The all-zero address; transfers to it are burned.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of the parent block.
    pub parent_hash: Hash,
    /// Address of the producer that signed this block.
    pub coinbase: Address,
    /// State root after executing the block.
    pub state_root: Hash,
    /// Merkle root of the transaction hashes.
    pub tx_root: Hash,
    /// Root of the receipts.
    pub receipts_root: Hash,
    /// Block number (height).
    pub number: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas used by all transactions.
    pub gas_used: u64,
    /// Timestamp in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Free-form producer data.
    pub extra_data: Vec<u8>,
    /// Minimum gas price a transaction must pay to be included.
    pub minimum_gas_price: U256,
}

impl BlockHeader {
    /// RLP encoding of every header field (the signature is not part of the header).
    pub fn rlp_bytes(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(11);
        stream.append(&self.parent_hash.to_vec());
        stream.append(&self.coinbase.to_vec());
        stream.append(&self.state_root.to_vec());
        stream.append(&self.tx_root.to_vec());
        stream.append(&self.receipts_root.to_vec());
        stream.append(&self.number);
        stream.append(&self.gas_limit);
        stream.append(&self.gas_used);
        stream.append(&self.timestamp);
        stream.append(&self.extra_data);
        stream.append(&self.minimum_gas_price);
        stream.out().to_vec()
    }

    /// Header hash. This is both the block identity and the signed message.
    pub fn hash(&self) -> Hash {
        keccak256(&self.rlp_bytes())
    }
}

/// Merkle root over the hashes of `transactions`.
pub fn transactions_root(transactions: &[Transaction]) -> Hash {
    let leaves: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
    keccak_merkle_root(&leaves)
}

/// A block: header, ordered transactions, header signature and finality flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    header: BlockHeader,
    transactions: Vec<Transaction>,
    signature: Option<RecoverableSignature>,
    irreversible: bool,
    sealed: bool,
}

impl Block {
    /// Create an unsealed block. The transaction root is derived from `transactions`.
    pub fn new(mut header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        header.tx_root = transactions_root(&transactions);
        Self {
            header,
            transactions,
            signature: None,
            irreversible: false,
            sealed: false,
        }
    }

    /// Genesis block: sealed without a signature.
    pub fn genesis(header: BlockHeader) -> Self {
        let mut block = Self::new(header, Vec::new());
        block.sealed = true;
        block
    }

    /// Header.
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Ordered transactions.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Block hash.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Block number.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Parent hash.
    pub fn parent_hash(&self) -> Hash {
        self.header.parent_hash
    }

    /// Producer address.
    pub fn coinbase(&self) -> Address {
        self.header.coinbase
    }

    /// Timestamp (ms).
    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    /// Whether this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.number == 0
    }

    /// Header signature, present once signed.
    pub fn signature(&self) -> Option<&RecoverableSignature> {
        self.signature.as_ref()
    }

    /// Whether the block is sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Whether the block has been marked irreversible.
    pub fn is_irreversible(&self) -> bool {
        self.irreversible
    }

    /// Mark the block irreversible. There is no way back.
    pub fn mark_irreversible(&mut self) {
        self.irreversible = true;
    }

    fn ensure_unsealed(&self) -> Result<(), SealedBlockError> {
        if self.sealed {
            return Err(SealedBlockError {
                number: self.header.number,
            });
        }
        Ok(())
    }

    /// Replace the transaction list and recompute the transaction root.
    pub fn set_transactions(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<(), SealedBlockError> {
        self.ensure_unsealed()?;
        self.header.tx_root = transactions_root(&transactions);
        self.transactions = transactions;
        Ok(())
    }

    /// Fill the post-execution roots and gas used.
    pub fn set_execution_result(
        &mut self,
        state_root: Hash,
        receipts_root: Hash,
        gas_used: u64,
    ) -> Result<(), SealedBlockError> {
        self.ensure_unsealed()?;
        self.header.state_root = state_root;
        self.header.receipts_root = receipts_root;
        self.header.gas_used = gas_used;
        Ok(())
    }

    /// Set the extra data.
    pub fn set_extra_data(&mut self, extra_data: Vec<u8>) -> Result<(), SealedBlockError> {
        self.ensure_unsealed()?;
        self.header.extra_data = extra_data;
        Ok(())
    }

    /// Sign the header hash and seal the block.
    pub fn sign(&mut self, keypair: &Secp256k1KeyPair) -> Result<(), BlockSigningError> {
        self.ensure_unsealed()?;
        let signature = keypair.sign_recoverable(&self.hash())?;
        self.signature = Some(signature);
        self.sealed = true;
        Ok(())
    }

    /// Attach an externally produced signature and seal the block.
    pub fn seal_with_signature(
        &mut self,
        signature: RecoverableSignature,
    ) -> Result<(), SealedBlockError> {
        self.ensure_unsealed()?;
        self.signature = Some(signature);
        self.sealed = true;
        Ok(())
    }

    /// Seal without a signature. Used only when a block arrives unsealed.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Address that signed the header.
    pub fn signer(&self) -> Result<Address, CryptoError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(CryptoError::InvalidSignatureFormat)?;
        recover_ledger_address(&self.hash(), signature)
    }

    /// The producer-list transaction, required at the second-to-last position.
    pub fn producer_list_transaction(&self) -> Option<&ProducerListTransaction> {
        let len = self.transactions.len();
        if len < 2 {
            return None;
        }
        self.transactions[len - 2].as_producer_list()
    }

    /// Whether the last transaction is the fee-distribution transaction.
    pub fn has_fee_distribution_last(&self) -> bool {
        self.transactions
            .last()
            .map(Transaction::is_fee_distribution)
            .unwrap_or(false)
    }
}

/// Result of executing a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the executed transaction.
    pub tx_hash: Hash,
    /// Gas consumed.
    pub gas_used: u64,
    /// Whether execution succeeded.
    pub success: bool,
}
