//! Epoch window extraction
//!
//! Answers, for one address's range history, which reward tiers were active
//! across the trailing epoch window `(H - S, H]`. The address's payable
//! multiplier is the minimum of the extracted values; an empty extraction
//! means the address is not eligible at `H`.

use crate::error::{TrackerError, TrackerResult};
use crate::range::BlockHeightRange;
use crate::types::{BlockHeight, RewardMultiplier};

/// Walk `ranges` newest to oldest and collect the tier each one contributed
/// to the window `(current_height - epoch_span, current_height]`.
///
/// Per visited range, with `X = current_height - epoch_span`:
///   - `start > X`: the range lies inside the window, so the window also
///     covers the gap before it; the contribution is
///     `min(multiplier, prev_multiplier)` and the walk continues left.
///   - `start <= X`: the range covers (or predates) the window's left edge
///     and the walk stops. Its `multiplier` is contributed, except that a
///     range ending strictly before `X` only contributes when it is the
///     first one visited; otherwise the later range's `prev_multiplier`
///     already accounted for the tier running into the window.
///
/// A zero contribution anywhere means the address spent part of the window
/// below the threshold: the extraction is empty and the address ineligible.
pub fn extract_window_multipliers(
    current_height: BlockHeight,
    ranges: &[BlockHeightRange],
    epoch_span: BlockHeight,
) -> TrackerResult<Vec<RewardMultiplier>> {
    if current_height < epoch_span || current_height % epoch_span != 0 {
        return Err(TrackerError::NotAnEpochBoundary {
            height: current_height,
            span: epoch_span,
        });
    }
    // Closing heights never decrease along the list, so the newest range
    // alone tells whether history has outrun the queried boundary.
    if let Some(last) = ranges.last() {
        if last.end() > current_height {
            return Err(TrackerError::StaleEligibilityHeight {
                height: current_height,
                latest: last.end(),
            });
        }
    }
    let window_start = current_height - epoch_span;

    let mut contributions = Vec::new();
    for r in ranges.iter().rev() {
        if r.start() > window_start {
            let held = r.multiplier().min(r.prev_multiplier());
            if held == 0 {
                return Ok(Vec::new());
            }
            contributions.push(held);
            continue;
        }

        // r.start() <= window_start: this range settles the left boundary
        let boundary_covered = r.end() >= window_start || contributions.is_empty();
        if boundary_covered {
            if r.multiplier() == 0 {
                return Ok(Vec::new());
            }
            contributions.push(r.multiplier());
        }
        break;
    }
    Ok(contributions)
}

/// Minimum multiplier across the window, or `None` when ineligible.
pub fn window_multiplier(
    current_height: BlockHeight,
    ranges: &[BlockHeightRange],
    epoch_span: BlockHeight,
) -> TrackerResult<Option<RewardMultiplier>> {
    let contributions = extract_window_multipliers(current_height, ranges, epoch_span)?;
    Ok(contributions.into_iter().min().filter(|m| *m > 0))
}
