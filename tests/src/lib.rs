//! # Peg-Chain Test Suite
//!
//! Scenarios that cross subsystem boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── chain_flows.rs   # pc-02 + pc-03: producing and accepting blocks
//!     └── peg_flows.rs     # pc-04 + pc-05: peg-in, peg-out and federation rotation
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pc-tests
//!
//! # With logs
//! RUST_LOG=debug cargo test -p pc-tests integration::peg_flows
//! ```

pub mod integration;
