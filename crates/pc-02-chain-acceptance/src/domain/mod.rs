//! Domain layer for chain acceptance
//!
//! Pure validation and consensus arithmetic; no storage access.

pub mod gas;
pub mod import_result;
pub mod irreversibility;
pub mod rules;

pub use gas::{
    gas_limit_within_bounds, minimum_gas_price_within_bounds, next_gas_limit,
    next_minimum_gas_price,
};
pub use import_result::ImportResult;
pub use irreversibility::{implied_irreversible_height, window_len, WINDOW_ROUNDS};
pub use rules::{BlockValidationRule, RuleChain, ValidationContext, INTRINSIC_GAS};
