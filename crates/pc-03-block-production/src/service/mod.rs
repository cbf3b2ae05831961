//! Service layer: block assembly and the producer scheduler

mod assembler;
mod scheduler;

pub use assembler::BlockAssembler;
pub use scheduler::{ProducerScheduler, SchedulerHandle};
