//! Schedule clock
//!
//! Maps an instant to the index of the producer owning that slot:
//!
//! ```text
//! divisions = (now - epoch) / interval
//! index     = (divisions mod (list_size * repetitions)) / repetitions
//! ```
//!
//! Producers use it to find their slot and validators use it to check a
//! block's producer, so the arithmetic is a consensus rule.

use crate::error::{Result, ScheduleError};

/// Index of the producer owning the slot at `now_ms`.
pub fn producer_index(
    now_ms: u64,
    epoch_ms: u64,
    interval_ms: u64,
    repetitions: u64,
    list_size: usize,
) -> Result<usize> {
    if list_size == 0 || repetitions == 0 || interval_ms == 0 {
        return Err(ScheduleError::InvalidScheduleParameters {
            list_size,
            repetitions,
            interval_ms,
        });
    }
    let elapsed = now_ms
        .checked_sub(epoch_ms)
        .ok_or(ScheduleError::BeforeEpoch { now_ms, epoch_ms })?;

    let divisions = elapsed / interval_ms;
    let round_slots = (list_size as u64).saturating_mul(repetitions);
    let index = (divisions % round_slots) / repetitions;
    Ok(index as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rotation_with_repetitions() {
        // interval 10ms, 2 slots each, 3 producers: 0 0 1 1 2 2 0 0 ...
        let owners: Vec<usize> = (0..8)
            .map(|slot| producer_index(slot * 10, 0, 10, 2, 3).unwrap())
            .collect();
        assert_eq!(owners, vec![0, 0, 1, 1, 2, 2, 0, 0]);
    }

    #[test]
    fn test_truncates_within_slot() {
        assert_eq!(producer_index(1_000 + 9, 1_000, 10, 1, 2).unwrap(), 0);
        assert_eq!(producer_index(1_000 + 10, 1_000, 10, 1, 2).unwrap(), 1);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            producer_index(0, 0, 10, 1, 0),
            Err(ScheduleError::InvalidScheduleParameters { .. })
        ));
        assert!(matches!(
            producer_index(0, 0, 10, 0, 3),
            Err(ScheduleError::InvalidScheduleParameters { .. })
        ));
        assert!(matches!(
            producer_index(0, 0, 0, 1, 3),
            Err(ScheduleError::InvalidScheduleParameters { .. })
        ));
    }

    #[test]
    fn test_before_epoch_rejected() {
        assert_eq!(
            producer_index(5, 10, 1, 1, 1),
            Err(ScheduleError::BeforeEpoch {
                now_ms: 5,
                epoch_ms: 10
            })
        );
    }

    proptest! {
        #[test]
        fn prop_index_is_deterministic_and_in_range(
            epoch in 0u64..1_000_000,
            offset in 0u64..u64::MAX / 4,
            interval in 1u64..100_000,
            reps in 1u64..16,
            list_size in 1usize..64,
        ) {
            let now = epoch + offset;
            let first = producer_index(now, epoch, interval, reps, list_size).unwrap();
            let second = producer_index(now, epoch, interval, reps, list_size).unwrap();
            prop_assert_eq!(first, second);
            prop_assert!(first < list_size);
        }
    }
}
