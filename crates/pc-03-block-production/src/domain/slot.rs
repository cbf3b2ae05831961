//! Next-slot search
//!
//! A producer owning `repetitions` consecutive slots produces once, at the
//! first slot of its run. Producing again inside the run would follow its
//! own block within one round, which validators reject.

use crate::error::{BlockProductionError, Result};
use pc_01_producer_schedule::ScheduleConfig;

/// Start of the first own run strictly after `now_ms`.
///
/// Inspects slot boundaries one by one, at most `max_steps` of them and
/// never more than two rounds.
pub fn next_own_slot(
    schedule: &ScheduleConfig,
    now_ms: u64,
    producer_index: usize,
    list_size: usize,
    max_steps: u64,
) -> Result<u64> {
    let epoch = schedule.block_epoch_ms;
    // Rejects zero list size, repetitions or interval before any division.
    schedule.producer_index(now_ms.max(epoch), list_size)?;

    let interval = schedule.block_interval_ms;
    let repetitions = schedule.repetitions;
    let round_slots = (list_size as u64).saturating_mul(repetitions);
    let first_division = if now_ms < epoch {
        0
    } else {
        (now_ms - epoch) / interval + 1
    };
    let ceiling = max_steps.min(round_slots.saturating_mul(2));

    for step in 0..ceiling {
        let division = first_division + step;
        if division % repetitions != 0 {
            continue;
        }
        let at = epoch.saturating_add(division.saturating_mul(interval));
        if schedule.producer_index(at, list_size)? == producer_index {
            return Ok(at);
        }
    }

    Err(BlockProductionError::NoSlotFound {
        from_ms: now_ms,
        steps: ceiling,
    })
}
