//! Domain layer for the bridge

pub mod classify;
pub mod external_tx;
pub mod merkle;
pub mod release;
pub mod script;
pub mod state;
pub mod units;
pub mod utxo;

pub use classify::{value_paid_to, LiveWallets, PegTxKind};
pub use external_tx::{ExternalTransaction, OutPoint, TxInput, TxOutput, FINAL_SEQUENCE};
pub use merkle::{merkle_root, MerkleBranch, MAX_MERKLE_DEPTH};
pub use release::{PendingRelease, ReleaseKind, ReleaseRequest};
pub use script::{
    burn, output_kind, p2pkh, p2pkh_spender, p2pkh_unlocking, p2sh, parse_multisig_redeem,
    MultisigUnlocking, OutputKind, SIGHASH_ALL,
};
pub use state::{BridgeSnapshot, BridgeState, RegistrationCall};
pub use units::{to_external_units, to_ledger_units, LEDGER_UNITS_PER_EXTERNAL_UNIT};
pub use utxo::{Utxo, UtxoBucket};
