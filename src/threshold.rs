//! Threshold-crossing state machine
//!
//! Every balance change at a height maps to at most one structural change
//! at the tail of the address's range list: extend the last range, append
//! a new one, or append a zero-tier break marker. Disconnecting a block
//! undoes exactly one such change, which is what keeps reorgs cheap.

use tracing::debug;

use crate::range::BlockHeightRange;
use crate::types::{BlockHeight, RewardMultiplier};

/// Record the tier transition `prev_mult -> new_mult` happening at `height`.
///
/// Rules, first match wins:
///   - new tier 0, old tier 0: nothing to record.
///   - new tier 0, old tier > 0: append a break marker `(h, h, 0, old)`.
///     The marker is excluded from rewards; it pins the tier that was held
///     up to the drop so disconnects and window extraction stay exact.
///   - new tier > 0 and the last range already carries it: extend its end.
///   - otherwise: open a fresh range `(h, h, new, last.mult or 0)`.
///
/// Returns whether the list was mutated, so callers can skip rewriting an
/// untouched history.
pub fn record_balance_change(
    ranges: &mut Vec<BlockHeightRange>,
    height: BlockHeight,
    prev_mult: RewardMultiplier,
    new_mult: RewardMultiplier,
) -> bool {
    if new_mult == 0 {
        if prev_mult > 0 {
            debug!(height, prev_mult, "stake dropped below threshold");
            ranges.push(BlockHeightRange::new(height, height, 0, prev_mult));
            return true;
        }
        return false;
    }

    match ranges.last_mut() {
        Some(last) if last.multiplier() == new_mult && last.end() <= height => {
            last.extend_to(height);
        }
        Some(last) => {
            let chained = last.multiplier();
            ranges.push(BlockHeightRange::new(height, height, new_mult, chained));
        }
        None => {
            ranges.push(BlockHeightRange::new(height, height, new_mult, 0));
        }
    }
    true
}

/// Undo whatever `record_balance_change` did at `height`.
///
/// A zero-width range at `height` was appended by the connect being undone,
/// so it is popped. A wider range ending at `height` had its end advanced,
/// so the end retreats to `height - 1` (the address verifiably held the
/// tier up to the previous block). Any other tail shape means the connect
/// at `height` made no structural change, and neither does the disconnect.
///
/// Returns whether the list was mutated.
pub fn unwind_balance_change(ranges: &mut Vec<BlockHeightRange>, height: BlockHeight) -> bool {
    let Some(last) = ranges.last_mut() else {
        return false;
    };
    if last.end() != height {
        return false;
    }
    if last.start() == height {
        ranges.pop();
    } else {
        // start < height, so height - 1 cannot underflow past start
        last.retreat_to(height - 1);
    }
    true
}
