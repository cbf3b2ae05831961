use crate::error::{BridgeError, Result};
use crate::ports::LedgerAccounts;
use parking_lot::RwLock;
use primitive_types::U256;
use shared_types::Address;
use std::collections::HashMap;

/// In-memory ledger balances.
#[derive(Default)]
pub struct InMemoryLedgerAccounts {
    balances: RwLock<HashMap<Address, U256>>,
}

impl InMemoryLedgerAccounts {
    /// Create an instance with no balances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the balance of `address`.
    pub fn set_balance(&self, address: Address, amount: U256) {
        self.balances.write().insert(address, amount);
    }
}

impl LedgerAccounts for InMemoryLedgerAccounts {
    fn balance(&self, address: &Address) -> U256 {
        self.balances
            .read()
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    fn transfer(&self, from: &Address, to: &Address, amount: U256) -> Result<()> {
        let mut balances = self.balances.write();
        let available = balances.get(from).copied().unwrap_or_default();
        let remaining = available.checked_sub(amount).ok_or_else(|| {
            BridgeError::Ledger(format!(
                "{} holds {}, cannot transfer {}",
                hex::encode(from),
                available,
                amount
            ))
        })?;
        balances.insert(*from, remaining);
        let credited = balances.entry(*to).or_default();
        *credited = credited.saturating_add(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_checks_balance() {
        let accounts = InMemoryLedgerAccounts::new();
        accounts.set_balance([1; 20], U256::from(10));
        accounts.transfer(&[1; 20], &[2; 20], U256::from(4)).unwrap();
        assert_eq!(accounts.balance(&[1; 20]), U256::from(6));
        assert_eq!(accounts.balance(&[2; 20]), U256::from(4));
        assert!(accounts.transfer(&[1; 20], &[2; 20], U256::from(7)).is_err());
        assert_eq!(accounts.balance(&[1; 20]), U256::from(6));
    }
}
