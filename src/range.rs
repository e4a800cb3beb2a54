//! Block-height ranges of continuously-held stake
//!
//! A `BlockHeightRange` records one maximal contiguous interval of heights
//! during which an address held a particular reward tier. The list kept per
//! address is append-mostly: connects extend or append at the tail, and
//! disconnects undo exactly one tail mutation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{BlockHeight, RewardMultiplier};

/// One `[start, end]` interval held at a reward tier.
///
/// `prev_multiplier` is the tier of the immediately preceding range for the
/// same address (0 if there was none). Carrying it forward lets the epoch
/// window extractor account for the tier that ran into a range's gap, and
/// lets a reorg reconstruct the prior tier without rereading the tail.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeightRange {
    start: BlockHeight,
    end: BlockHeight,
    multiplier: RewardMultiplier,
    prev_multiplier: RewardMultiplier,
}

impl BlockHeightRange {
    /// Build a range. `start <= end` is a structural invariant; the state
    /// machine only ever constructs ranges that satisfy it.
    pub fn new(
        start: BlockHeight,
        end: BlockHeight,
        multiplier: RewardMultiplier,
        prev_multiplier: RewardMultiplier,
    ) -> Self {
        debug_assert!(start <= end, "range start must not exceed end");
        Self {
            start,
            end,
            multiplier,
            prev_multiplier,
        }
    }

    pub fn start(&self) -> BlockHeight {
        self.start
    }

    pub fn end(&self) -> BlockHeight {
        self.end
    }

    pub fn multiplier(&self) -> RewardMultiplier {
        self.multiplier
    }

    pub fn prev_multiplier(&self) -> RewardMultiplier {
        self.prev_multiplier
    }

    /// Advance the closing height. Used when a connect keeps the address at
    /// the same tier.
    pub(crate) fn extend_to(&mut self, height: BlockHeight) {
        debug_assert!(height >= self.start);
        self.end = height;
    }

    /// Retreat the closing height. Used when a disconnect unwinds an
    /// extension.
    pub(crate) fn retreat_to(&mut self, height: BlockHeight) {
        debug_assert!(height >= self.start);
        self.end = height;
    }

    /// A zero-width range opened and closed at the same height.
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    /// A drop-below-threshold marker. Not a reward interval; it only exists
    /// so the preceding tier survives for reorgs and window extraction.
    pub fn is_break(&self) -> bool {
        self.multiplier == 0
    }
}

impl fmt::Debug for BlockHeightRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x{} (prev x{})",
            self.start, self.end, self.multiplier, self.prev_multiplier
        )
    }
}
