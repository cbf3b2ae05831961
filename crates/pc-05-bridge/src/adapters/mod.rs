//! Adapters layer (Hexagonal Architecture)
//!
//! In-memory implementations of the outbound ports and the default
//! external-chain transaction builder.

mod memory_accounts;
mod memory_chain;
mod memory_storage;
mod release_builder;

pub use memory_accounts::InMemoryLedgerAccounts;
pub use memory_chain::InMemoryExternalChain;
pub use memory_storage::InMemoryBridgeStorage;
pub use release_builder::{DefaultReleaseBuilder, DEFAULT_MAX_INPUTS};
