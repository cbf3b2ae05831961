//! Test fixtures for the bridge.
//!
//! Also used by the integration tests through the `test-utils` feature.

use crate::adapters::{
    DefaultReleaseBuilder, InMemoryBridgeStorage, InMemoryExternalChain, InMemoryLedgerAccounts,
    DEFAULT_MAX_INPUTS,
};
use crate::config::BridgeConfig;
use crate::domain::{
    merkle_root, p2pkh_unlocking, p2sh, to_ledger_units, ExternalTransaction, MerkleBranch,
    MultisigUnlocking, OutPoint, TxInput, TxOutput, FINAL_SEQUENCE,
};
use crate::ports::LedgerAccounts;
use crate::service::{BridgeDependencies, LedgerContext, PegSupport, RegistrationOutcome};
use pc_04_federation::{ExternalAddress, Federation, FederationConfig};
use primitive_types::U256;
use shared_crypto::{keccak256, Secp256k1KeyPair, Secp256k1PublicKey};
use shared_types::{Address, GlobalOrdering, RecordingAlarmReporter, BRIDGE_ADDRESS};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Ledger units held by the bridge account at start: the whole external
/// supply.
pub const BRIDGE_SUPPLY: u64 = 21_000_000 * 100_000_000;

/// External height of the first fixture block.
pub const FIRST_EXTERNAL_HEIGHT: u64 = 1_000;

/// Federator keys, in seed order.
pub fn federator_keypair(index: usize) -> Secp256k1KeyPair {
    Secp256k1KeyPair::from_bytes([0x31 + index as u8; 32]).expect("valid fixture key")
}

/// User keys.
pub fn user_keypair(index: usize) -> Secp256k1KeyPair {
    Secp256k1KeyPair::from_bytes([0x61 + index as u8; 32]).expect("valid fixture key")
}

/// Public key from a one-byte seed.
pub fn new_key(seed: u8) -> Secp256k1PublicKey {
    Secp256k1KeyPair::from_bytes([seed; 32])
        .expect("valid fixture key")
        .public_key()
}

/// Ledger context at `block_number` with a height-derived tx hash.
pub fn ctx(block_number: u64) -> LedgerContext {
    LedgerContext {
        block_number,
        tx_hash: keccak256(&block_number.to_be_bytes()),
        now_ms: block_number * 1_000,
    }
}

/// A [`PegSupport`] over in-memory collaborators with a three-member
/// genesis federation.
pub struct BridgeHarness {
    /// Bridge under test
    pub bridge: PegSupport,
    /// Genesis federation
    pub genesis: Federation,
    /// External headers
    pub chain: Arc<InMemoryExternalChain>,
    /// Ledger balances
    pub accounts: Arc<InMemoryLedgerAccounts>,
    /// Durable state
    pub storage: Arc<InMemoryBridgeStorage>,
    /// Raised alarms
    pub alarms: Arc<RecordingAlarmReporter>,
    /// Genesis federators
    pub federators: Vec<Secp256k1KeyPair>,
    /// Users
    pub users: Vec<Secp256k1KeyPair>,
    config: BridgeConfig,
    federation_config: FederationConfig,
    external_height: AtomicU64,
    nonce: AtomicU64,
}

impl BridgeHarness {
    /// Harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Harness with `config` for the bridge.
    pub fn with_config(config: BridgeConfig) -> Self {
        let federators: Vec<Secp256k1KeyPair> = (0..3).map(federator_keypair).collect();
        let voters: Vec<String> = federators
            .iter()
            .map(|k| hex::encode(k.ledger_address()))
            .collect();
        let federation_config = FederationConfig {
            federation_change_voters: voters.clone(),
            fee_per_kb_voters: voters,
            lock_whitelist_admins: vec![hex::encode(whitelist_admin_keypair().ledger_address())],
            ..FederationConfig::default()
        };
        let genesis = Federation::new(federators.iter().map(|k| k.public_key()).collect(), 0, 0)
            .expect("fixture federation");

        let chain = Arc::new(InMemoryExternalChain::new());
        let accounts = Arc::new(InMemoryLedgerAccounts::new());
        accounts.set_balance(BRIDGE_ADDRESS, to_ledger_units(BRIDGE_SUPPLY));
        let storage = Arc::new(InMemoryBridgeStorage::new());
        let alarms = Arc::new(RecordingAlarmReporter::new());

        let bridge = open(
            &config,
            &federation_config,
            &genesis,
            &chain,
            &accounts,
            &storage,
            &alarms,
        );
        Self {
            bridge,
            genesis,
            chain,
            accounts,
            storage,
            alarms,
            federators,
            users: (0..3).map(user_keypair).collect(),
            config,
            federation_config,
            external_height: AtomicU64::new(FIRST_EXTERNAL_HEIGHT),
            nonce: AtomicU64::new(0),
        }
    }

    /// A second bridge over the same collaborators, loading from storage.
    pub fn reopen(&self) -> PegSupport {
        open(
            &self.config,
            &self.federation_config,
            &self.genesis,
            &self.chain,
            &self.accounts,
            &self.storage,
            &self.alarms,
        )
    }

    /// Federation configuration in use.
    pub fn federation_config(&self) -> FederationConfig {
        self.federation_config.clone()
    }

    /// Genesis federator `index`'s public key.
    pub fn federator_key(&self, index: usize) -> Secp256k1PublicKey {
        self.federators[index].public_key()
    }

    /// Genesis federator `index`'s ledger address.
    pub fn federator_ledger(&self, index: usize) -> Address {
        self.federators[index].ledger_address()
    }

    /// Key of no federation.
    pub fn outsider_key(&self) -> Secp256k1PublicKey {
        new_key(0x7f)
    }

    /// Lock whitelist administrator.
    pub fn whitelist_admin(&self) -> Address {
        whitelist_admin_keypair().ledger_address()
    }

    /// User `index`'s ledger address.
    pub fn user_ledger(&self, index: usize) -> Address {
        self.users[index].ledger_address()
    }

    /// User `index`'s external address.
    pub fn user_external(&self, index: usize) -> ExternalAddress {
        self.users[index].public_key().external_address()
    }

    /// Ledger balance of `address`.
    pub fn balance(&self, address: &Address) -> U256 {
        self.accounts.balance(address)
    }

    /// Give user `index` `units` external units worth of ledger balance.
    pub fn fund_user(&self, index: usize, units: u64) {
        self.accounts
            .set_balance(self.user_ledger(index), to_ledger_units(units));
    }

    /// Transaction from user `index` paying `value` to `federation`.
    pub fn lock_tx(&self, index: usize, federation: &ExternalAddress, value: u64) -> ExternalTransaction {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let previous = OutPoint {
            tx_hash: keccak256(&nonce.to_be_bytes()),
            index: 0,
        };
        ExternalTransaction::new(
            vec![TxInput {
                previous,
                script_sig: p2pkh_unlocking(&[0x30; 71], &self.users[index].public_key()),
                sequence: FINAL_SEQUENCE,
            }],
            vec![TxOutput {
                value,
                script_pubkey: p2sh(federation),
            }],
        )
    }

    /// Put `tx` in a new external block next to a filler transaction and
    /// bury it exactly deep enough. Returns the height and the proof.
    pub fn include(&self, tx: &ExternalTransaction) -> (u64, MerkleBranch) {
        let height = self.external_height.fetch_add(1, Ordering::SeqCst);
        let leaves = [keccak256(&height.to_be_bytes()), tx.txid()];
        let proof = MerkleBranch::build(&leaves, 1).expect("leaf in range");
        self.chain.add_block(height, merkle_root(&leaves));
        self.chain
            .set_best_height(height + self.config.min_external_confirmations - 1);
        (height, proof)
    }

    /// Register `tx` through federator 0 at ledger height `block`.
    pub fn register(&self, tx: &ExternalTransaction, block: u64) -> RegistrationOutcome {
        let (height, proof) = self.include(tx);
        self.bridge
            .register_external_tx(&ctx(block), &self.federator_ledger(0), tx.serialize(), height, proof)
            .expect("in-memory collaborators do not fail")
    }

    /// Whitelist user `index` and credit a lock of `value` to the active
    /// federation at ledger height `block`.
    pub fn lock_whitelisted(&self, index: usize, value: u64, block: u64) {
        // Already whitelisted on later calls.
        let _ = self
            .bridge
            .add_unlimited_lock_whitelist_address(&self.whitelist_admin(), self.user_external(index));
        let tx = self.lock_tx(index, &self.bridge.federation_address(), value);
        let outcome = self.register(&tx, block);
        assert_eq!(
            outcome,
            RegistrationOutcome::Credited {
                recipient: self.user_ledger(index),
                value
            }
        );
    }

    /// Queue a peg-out of `amount` by user `index` at ledger height `block`.
    pub fn request(&self, index: usize, amount: u64, block: u64) {
        let queued = self
            .bridge
            .request_release(&ctx(block), self.user_ledger(index), [0x77; 20], to_ledger_units(amount))
            .expect("funded user");
        assert!(queued);
    }

    /// Federator `index`'s signature for every input of `tx`.
    pub fn sign_all(&self, index: usize, tx: &ExternalTransaction) -> Vec<Vec<u8>> {
        self.sign_all_with(&self.federators[index], tx)
    }

    /// `key`'s signature for every input of `tx`.
    pub fn sign_all_with(&self, key: &Secp256k1KeyPair, tx: &ExternalTransaction) -> Vec<Vec<u8>> {
        tx.inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let unlocking =
                    MultisigUnlocking::parse(&input.script_sig).expect("federation input");
                let sighash = tx.signature_hash(index, &unlocking.redeem_script);
                key.sign(&sighash).as_bytes().to_vec()
            })
            .collect()
    }

    /// Replace the genesis federation by one made of `seeds`, committed at
    /// ledger height `block` by genesis federators 0 and 1. Returns the
    /// committed hash.
    pub fn elect_new_federation(&self, seeds: &[u8], block: u64) -> [u8; 32] {
        let c = ctx(block);
        for voter in 0..2 {
            self.bridge
                .create_federation(&c, &self.federator_ledger(voter))
                .expect("create vote");
        }
        for seed in seeds {
            for voter in 0..2 {
                self.bridge
                    .add_federator_public_key(&c, &self.federator_ledger(voter), new_key(*seed))
                    .expect("add key vote");
            }
        }
        let hash = self
            .bridge
            .pending_federation_hash()
            .expect("pending federation");
        for voter in 0..2 {
            self.bridge
                .commit_federation(&c, &self.federator_ledger(voter), hash)
                .expect("commit vote");
        }
        hash
    }
}

impl Default for BridgeHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn whitelist_admin_keypair() -> Secp256k1KeyPair {
    Secp256k1KeyPair::from_bytes([0x5a; 32]).expect("valid fixture key")
}

fn open(
    config: &BridgeConfig,
    federation_config: &FederationConfig,
    genesis: &Federation,
    chain: &Arc<InMemoryExternalChain>,
    accounts: &Arc<InMemoryLedgerAccounts>,
    storage: &Arc<InMemoryBridgeStorage>,
    alarms: &Arc<RecordingAlarmReporter>,
) -> PegSupport {
    PegSupport::new(
        config.clone(),
        federation_config.clone(),
        genesis.clone(),
        BridgeDependencies {
            external_chain: chain.clone(),
            builder: Arc::new(DefaultReleaseBuilder::new(DEFAULT_MAX_INPUTS)),
            accounts: accounts.clone(),
            storage: storage.clone(),
            alarms: alarms.clone(),
        },
        GlobalOrdering::new(),
    )
    .expect("fixture bridge")
}
