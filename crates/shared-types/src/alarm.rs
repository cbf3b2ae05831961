//! # Alarm Reporting
//!
//! Invariant violations that indicate an attack or a serious bug are raised
//! through an injected [`AlarmReporter`] in addition to being rejected. They
//! never crash the node.

use crate::entities::Hash;
use parking_lot::Mutex;
use tracing::error;

/// An alarm-worthy condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alarm {
    /// A block reached chain acceptance without being sealed.
    UnsealedBlock {
        /// Block number.
        number: u64,
        /// Block hash.
        hash: Hash,
    },
    /// An external block's merkle root did not match a valid-looking proof.
    MerkleRootMismatch {
        /// External transaction hash.
        tx_hash: Hash,
        /// External block height.
        height: u64,
    },
    /// An external transaction was neither a lock, a release nor a migration.
    UnclassifiedPegTransaction {
        /// External transaction hash.
        tx_hash: Hash,
    },
    /// The forced sweep of the retiring federation failed past the migration window.
    ForcedMigrationFailed {
        /// Retiring wallet balance left behind.
        retiring_balance: u64,
    },
}

/// Alarm sink.
pub trait AlarmReporter: Send + Sync {
    /// Raise an alarm.
    fn raise(&self, alarm: Alarm);
}

/// Reports alarms as `error!` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlarmReporter;

impl AlarmReporter for TracingAlarmReporter {
    fn raise(&self, alarm: Alarm) {
        error!(?alarm, "[alarm] invariant violation");
    }
}

/// Records alarms in memory.
#[derive(Debug, Default)]
pub struct RecordingAlarmReporter {
    alarms: Mutex<Vec<Alarm>>,
}

impl RecordingAlarmReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alarms raised so far.
    pub fn alarms(&self) -> Vec<Alarm> {
        self.alarms.lock().clone()
    }
}

impl AlarmReporter for RecordingAlarmReporter {
    fn raise(&self, alarm: Alarm) {
        error!(?alarm, "[alarm] invariant violation");
        self.alarms.lock().push(alarm);
    }
}
