//! # Quorum Elections
//!
//! Every privileged bridge call follows one protocol:
//!
//! 1. The caller must belong to the call's [`Authorizer`].
//! 2. The transition runs in [`ExecutionMode::DryRun`]; a negative code is
//!    returned as-is and no vote is recorded.
//! 3. The caller's vote for this exact call is recorded. A voter has one
//!    live vote; voting for a different call moves it.
//! 4. When a call has votes from `required` distinct voters, the transition
//!    runs in [`ExecutionMode::Execute`] and every vote is cleared.

use crate::domain::authorizer::Authorizer;
use crate::domain::codes::{GENERIC_ERROR, SUCCESS};
use serde::{Deserialize, Serialize};
use shared_types::Address;
use std::collections::{BTreeMap, BTreeSet};

/// How a transition is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Validate only; must not mutate anything.
    DryRun,
    /// Apply the call.
    Execute,
}

impl ExecutionMode {
    /// Whether state may be mutated.
    pub fn is_execute(self) -> bool {
        self == ExecutionMode::Execute
    }
}

/// Result of submitting a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionResult {
    /// Rejected before voting (unauthorized caller or failed dry run).
    Rejected(i32),
    /// Vote recorded, quorum not reached.
    Voted,
    /// Quorum reached; carries the code of the real execution.
    Executed(i32),
}

impl ElectionResult {
    /// Sentinel code returned to the caller.
    pub fn code(self) -> i32 {
        match self {
            ElectionResult::Rejected(code) | ElectionResult::Executed(code) => code,
            ElectionResult::Voted => SUCCESS,
        }
    }

    /// Whether the call was applied successfully.
    pub fn executed_successfully(self) -> bool {
        matches!(self, ElectionResult::Executed(code) if code >= 0)
    }
}

/// Votes for calls of type `C`, keyed by the exact call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiCallElection<C: Ord> {
    votes: BTreeMap<C, BTreeSet<Address>>,
}

impl<C: Ord> Default for AbiCallElection<C> {
    fn default() -> Self {
        Self {
            votes: BTreeMap::new(),
        }
    }
}

impl<C: Ord + Clone> AbiCallElection<C> {
    /// Empty election.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `voter`'s vote for `call`, withdrawing any vote it had for
    /// another call. Returns false if the vote was already recorded.
    pub fn vote(&mut self, call: C, voter: Address) -> bool {
        for (other, voters) in self.votes.iter_mut() {
            if *other != call {
                voters.remove(&voter);
            }
        }
        self.votes.retain(|_, voters| !voters.is_empty());
        self.votes.entry(call).or_default().insert(voter)
    }

    /// Distinct voters currently backing `call`.
    pub fn votes_for(&self, call: &C) -> usize {
        self.votes.get(call).map_or(0, BTreeSet::len)
    }

    /// A call backed by at least `required` distinct voters.
    pub fn winner(&self, required: usize) -> Option<C> {
        self.votes
            .iter()
            .find(|(_, voters)| voters.len() >= required)
            .map(|(call, _)| call.clone())
    }

    /// Drop every vote.
    pub fn clear(&mut self) {
        self.votes.clear();
    }

    /// Whether no votes are recorded.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Run the dry-run, vote, execute-on-quorum protocol for `call`.
    ///
    /// `transition` is invoked once in dry-run mode for `call`, and once
    /// more in execute mode for the winning call if quorum is reached.
    pub fn submit<F>(
        &mut self,
        authorizer: &Authorizer,
        voter: &Address,
        call: C,
        mut transition: F,
    ) -> ElectionResult
    where
        F: FnMut(&C, ExecutionMode) -> i32,
    {
        if !authorizer.is_authorized(voter) {
            return ElectionResult::Rejected(GENERIC_ERROR);
        }
        let provisional = transition(&call, ExecutionMode::DryRun);
        if provisional < 0 {
            return ElectionResult::Rejected(provisional);
        }

        self.vote(call, *voter);
        let Some(winner) = self.winner(authorizer.required()) else {
            return ElectionResult::Voted;
        };
        let code = transition(&winner, ExecutionMode::Execute);
        self.clear();
        ElectionResult::Executed(code)
    }
}
