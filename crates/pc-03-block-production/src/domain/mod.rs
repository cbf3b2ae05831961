//! Domain layer for block production

pub mod records;
pub mod slot;
pub mod state;

pub use records::{active_producer_list, parse_records, ProducerRecord};
pub use slot::next_own_slot;
pub use state::SchedulerState;
