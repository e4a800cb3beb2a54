//! Checkpoint oracle
//!
//! Checkpoints are consensus-committed `(height, hash)` pairs below which
//! history is immutable. The tracker uses them two ways: to refuse writes
//! into checkpointed territory, and to discard per-address history that can
//! never be reorganized away.

use std::collections::BTreeMap;

use crate::types::{BlockHash, BlockHeight};

/// Greatest checkpoint height at or below `height`, or `None` when every
/// checkpoint is above it (or the map is empty).
///
/// Sub-linear over the map: a single ordered-map seek, no scan.
pub fn last_checkpoint_at_or_below(
    checkpoints: &BTreeMap<BlockHeight, BlockHash>,
    height: BlockHeight,
) -> Option<BlockHeight> {
    checkpoints.range(..=height).next_back().map(|(h, _)| *h)
}
