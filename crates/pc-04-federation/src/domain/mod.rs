//! Domain layer for the federation registry

pub mod authorizer;
pub mod changes;
pub mod codes;
pub mod election;
pub mod fee_per_kb;
pub mod federation;
pub mod whitelist;

pub use authorizer::Authorizer;
pub use changes::{
    ChangeContext, FederationChange, Federations, MigrationPhase, MigrationWindow,
};
pub use election::{AbiCallElection, ElectionResult, ExecutionMode};
pub use fee_per_kb::FeePerKbVote;
pub use federation::{
    majority, multisig_redeem_script, ExternalAddress, Federation, PendingFederation,
    MAX_FEDERATION_SIZE, OP_0, OP_1, OP_CHECKMULTISIG,
};
pub use whitelist::{LockWhitelist, WhitelistEntry};
