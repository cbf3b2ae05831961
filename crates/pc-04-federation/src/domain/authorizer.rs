//! Fixed voter sets gating privileged bridge calls.

use crate::domain::federation::majority;
use crate::error::{FederationError, Result};
use shared_types::Address;
use std::collections::BTreeSet;

/// A fixed set of ledger addresses and the number of them that must agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorizer {
    members: BTreeSet<Address>,
    required: usize,
}

impl Authorizer {
    /// Majority of `members` must agree.
    pub fn majority<I: IntoIterator<Item = Address>>(members: I) -> Self {
        let members: BTreeSet<Address> = members.into_iter().collect();
        let required = majority(members.len());
        Self { members, required }
    }

    /// Any single member may act alone.
    pub fn single<I: IntoIterator<Item = Address>>(members: I) -> Self {
        Self {
            members: members.into_iter().collect(),
            required: 1,
        }
    }

    /// Parse `0x`-prefixed or bare hex addresses into a majority authorizer.
    pub fn majority_from_hex(members: &[String]) -> Result<Self> {
        Ok(Self::majority(parse_addresses(members)?))
    }

    /// Parse hex addresses into a single-signer authorizer.
    pub fn single_from_hex(members: &[String]) -> Result<Self> {
        Ok(Self::single(parse_addresses(members)?))
    }

    /// Whether `voter` belongs to the set.
    pub fn is_authorized(&self, voter: &Address) -> bool {
        self.members.contains(voter)
    }

    /// Distinct members needed for a decision.
    pub fn required(&self) -> usize {
        self.required
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

fn parse_addresses(members: &[String]) -> Result<Vec<Address>> {
    members
        .iter()
        .map(|raw| {
            let trimmed = raw.strip_prefix("0x").unwrap_or(raw);
            let bytes =
                hex::decode(trimmed).map_err(|_| FederationError::InvalidVoterAddress(raw.clone()))?;
            Address::try_from(bytes.as_slice())
                .map_err(|_| FederationError::InvalidVoterAddress(raw.clone()))
        })
        .collect()
}
