//! Irreversibility threshold
//!
//! For each distinct producer of the new block's list, find the height of the
//! most recent block it authored inside the look-back window (0 if none).
//! Sorted ascending, the value at index `floor((N - 1) / 3)` is the highest
//! height that at least `N - floor((N - 1) / 3)` producers have built on.

use shared_types::Address;

/// Number of ancestors (new block included) inspected per list size.
pub const WINDOW_ROUNDS: usize = 2;

/// Window length for a list of `list_size` producers.
pub fn window_len(list_size: usize) -> usize {
    list_size.saturating_mul(WINDOW_ROUNDS)
}

/// Height implied irreversible by `window` (newest first, `(number, coinbase)`).
pub fn implied_irreversible_height(producers: &[Address], window: &[(u64, Address)]) -> u64 {
    if producers.is_empty() {
        return 0;
    }

    let mut heights: Vec<u64> = producers
        .iter()
        .map(|producer| {
            window
                .iter()
                .find(|(_, coinbase)| coinbase == producer)
                .map(|(number, _)| *number)
                .unwrap_or(0)
        })
        .collect();
    heights.sort_unstable();

    heights[(heights.len() - 1) / 3]
}
