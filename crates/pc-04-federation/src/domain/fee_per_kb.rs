//! Fee-per-kilobyte used when building external-chain transactions, set by
//! a quorum of fee voters.

use crate::domain::authorizer::Authorizer;
use crate::domain::codes::{INCOMPLETE, NOT_FOUND, SUCCESS};
use crate::domain::election::{AbiCallElection, ElectionResult};
use serde::{Deserialize, Serialize};
use shared_types::Address;
use tracing::info;

/// Current fee-per-kb and the votes to change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePerKbVote {
    fee_per_kb: u64,
    election: AbiCallElection<u64>,
}

impl FeePerKbVote {
    /// Start at `initial` (external units per kilobyte).
    pub fn new(initial: u64) -> Self {
        Self {
            fee_per_kb: initial,
            election: AbiCallElection::new(),
        }
    }

    /// Fee in force.
    pub fn fee_per_kb(&self) -> u64 {
        self.fee_per_kb
    }

    /// Vote for `fee`. Codes: 1 ok, -1 not positive, -2 above `max_fee`,
    /// -10 unauthorized.
    pub fn vote(
        &mut self,
        authorizer: &Authorizer,
        voter: &Address,
        fee: u64,
        max_fee: u64,
    ) -> ElectionResult {
        let Self {
            fee_per_kb,
            election,
        } = self;
        election.submit(authorizer, voter, fee, |fee, mode| {
            if *fee == 0 {
                return NOT_FOUND;
            }
            if *fee > max_fee {
                return INCOMPLETE;
            }
            if mode.is_execute() {
                info!("[pc-04] Fee per kb set to {}", fee);
                *fee_per_kb = *fee;
            }
            SUCCESS
        })
    }
}
