//! Adapters layer (Hexagonal Architecture)
//!
//! In-memory implementations of the outbound ports.

mod memory_ledger;
mod memory_pool;
mod memory_store;

pub use memory_ledger::InMemoryLedger;
pub use memory_pool::InMemoryTransactionPool;
pub use memory_store::InMemoryBlockStore;
