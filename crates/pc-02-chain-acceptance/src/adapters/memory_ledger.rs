use crate::domain::rules::INTRINSIC_GAS;
use crate::error::{ChainError, Result};
use crate::ports::{BlockExecutor, ExecutionOutcome, StateReader};
use parking_lot::RwLock;
use shared_crypto::hashing::keccak_merkle_root;
use shared_crypto::keccak256_many;
use shared_types::{Address, Block, Hash, Receipt, Transaction};
use std::collections::HashMap;

/// In-memory stand-in for the execution engine.
///
/// Tracks account nonces per state root. Each regular transaction costs
/// [`INTRINSIC_GAS`] and bumps its sender's nonce; the new state root is the
/// Keccak-256 of the parent root and the transaction root. Execution is
/// deterministic, so producers and validators agree on roots.
#[derive(Default)]
pub struct InMemoryLedger {
    states: RwLock<HashMap<Hash, HashMap<Address, u64>>>,
}

impl InMemoryLedger {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a nonce at `state_root`.
    pub fn set_nonce(&self, state_root: Hash, address: Address, nonce: u64) {
        self.states
            .write()
            .entry(state_root)
            .or_default()
            .insert(address, nonce);
    }

    fn receipt_leaf(receipt: &Receipt) -> Hash {
        keccak256_many(&[
            &receipt.tx_hash,
            &receipt.gas_used.to_be_bytes(),
            &[receipt.success as u8],
        ])
    }
}

impl BlockExecutor for InMemoryLedger {
    fn execute(&self, block: &Block, parent_state_root: &Hash) -> Result<ExecutionOutcome> {
        let mut nonces = self
            .states
            .read()
            .get(parent_state_root)
            .cloned()
            .unwrap_or_default();

        let mut receipts = Vec::with_capacity(block.transactions().len());
        let mut gas_used = 0u64;
        for tx in block.transactions() {
            let cost = match tx {
                Transaction::Regular(_) => {
                    let sender = tx
                        .sender()
                        .map_err(|e| ChainError::Execution(e.to_string()))?;
                    nonces.insert(sender, tx.nonce() + 1);
                    INTRINSIC_GAS
                }
                _ => 0,
            };
            gas_used += cost;
            receipts.push(Receipt {
                tx_hash: tx.hash(),
                gas_used: cost,
                success: true,
            });
        }

        let state_root = keccak256_many(&[parent_state_root, &block.header().tx_root]);
        let leaves: Vec<Hash> = receipts.iter().map(Self::receipt_leaf).collect();
        let receipts_root = keccak_merkle_root(&leaves);

        self.states.write().insert(state_root, nonces);
        Ok(ExecutionOutcome {
            state_root,
            receipts_root,
            gas_used,
            receipts,
        })
    }
}

impl StateReader for InMemoryLedger {
    fn nonce(&self, state_root: &Hash, address: &Address) -> u64 {
        self.states
            .read()
            .get(state_root)
            .and_then(|nonces| nonces.get(address).copied())
            .unwrap_or(0)
    }
}
