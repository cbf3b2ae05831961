//! Domain layer: pure schedule arithmetic, codec and synthetic transactions

pub mod clock;
pub mod codec;
pub mod identity;
pub mod synthetic;

pub use clock::producer_index;
pub use codec::{decode_producer_keys, encode_producer_keys};
pub use identity::{ProducerIdentity, ProducerList};
pub use synthetic::{block_producer_list, fee_distribution_transaction, producer_list_transaction};
