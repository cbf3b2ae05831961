//! Ports layer for the bridge

mod outbound;

pub use outbound::*;
