//! # Integration Flows
//!
//! - `chain_flows`: blocks assembled by pc-03 and accepted by pc-02 under
//!   the pc-01 schedule.
//! - `peg_flows`: federated peg scenarios through pc-05 with pc-04
//!   governance.

pub mod chain_flows;
pub mod peg_flows;

/// Route `tracing` output to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    // Only the first test to get here installs the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
