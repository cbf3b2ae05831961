//! Minimum gas price and gas limit calculators
//!
//! Both move toward a producer-chosen target by a bounded step per block. The
//! producer uses the `next_*` functions; validators only check the bound.

use primitive_types::U256;
use std::cmp::{max, min};

/// Divisor bounding the per-block gas limit change.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;

/// Divisor bounding the per-block minimum gas price change (1%).
pub const MIN_GAS_PRICE_BOUND_DIVISOR: u64 = 100;

fn gas_price_step(previous: U256) -> U256 {
    max(previous / U256::from(MIN_GAS_PRICE_BOUND_DIVISOR), U256::one())
}

/// Next minimum gas price: `previous` moved toward `target` by at most 1% (at least 1).
pub fn next_minimum_gas_price(previous: U256, target: U256) -> U256 {
    let step = gas_price_step(previous);
    if target >= previous {
        min(target, previous.saturating_add(step))
    } else {
        max(target, previous.saturating_sub(step))
    }
}

/// Whether `candidate` is reachable from `previous` in one step.
pub fn minimum_gas_price_within_bounds(previous: U256, candidate: U256) -> bool {
    let step = gas_price_step(previous);
    candidate >= previous.saturating_sub(step) && candidate <= previous.saturating_add(step)
}

/// Next gas limit: `parent` moved toward `target` by at most `parent / 1024`,
/// never below `min_gas_limit`.
pub fn next_gas_limit(parent: u64, target: u64, min_gas_limit: u64) -> u64 {
    let step = parent / GAS_LIMIT_BOUND_DIVISOR;
    let next = if target >= parent {
        min(target, parent.saturating_add(step))
    } else {
        max(target, parent.saturating_sub(step))
    };
    max(next, min_gas_limit)
}

/// Whether `candidate` is a valid successor of `parent`.
pub fn gas_limit_within_bounds(parent: u64, candidate: u64, min_gas_limit: u64) -> bool {
    candidate >= min_gas_limit && parent.abs_diff(candidate) <= parent / GAS_LIMIT_BOUND_DIVISOR
}
