//! Conversion between external-chain units and ledger units.

use primitive_types::U256;

/// Ledger units per external unit.
pub const LEDGER_UNITS_PER_EXTERNAL_UNIT: u64 = 10_000_000_000;

/// `value` external units expressed in ledger units.
pub fn to_ledger_units(value: u64) -> U256 {
    U256::from(value) * U256::from(LEDGER_UNITS_PER_EXTERNAL_UNIT)
}

/// Whole external units in `value` ledger units, or `None` if they do not
/// fit in a `u64`.
pub fn to_external_units(value: U256) -> Option<u64> {
    let whole = value / U256::from(LEDGER_UNITS_PER_EXTERNAL_UNIT);
    (whole <= U256::from(u64::MAX)).then(|| whole.low_u64())
}
