//! Tracker configuration
//!
//! The canonical mainnet numbers live in [`crate::constants::reward`]; the
//! config exists so testnets and integration tests can shrink the epoch or
//! the threshold without recompiling.

use serde::{Deserialize, Serialize};

use crate::constants::reward;
use crate::types::{Amount, BlockHeight, RewardMultiplier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Blocks per reward epoch. Eligibility queries are only valid at
    /// positive multiples of this span.
    #[serde(default = "default_epoch_span")]
    pub epoch_span: BlockHeight,

    /// Base tier threshold in the smallest on-chain unit.
    #[serde(default = "default_stake_threshold")]
    pub stake_threshold: Amount,

    /// Highest tier a balance can reach, however large it is.
    #[serde(default = "default_multiplier_ceiling")]
    pub multiplier_ceiling: RewardMultiplier,
}

fn default_epoch_span() -> BlockHeight {
    reward::EPOCH_SPAN
}

fn default_stake_threshold() -> Amount {
    reward::STAKE_THRESHOLD
}

fn default_multiplier_ceiling() -> RewardMultiplier {
    reward::MULTIPLIER_CEILING
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            epoch_span: default_epoch_span(),
            stake_threshold: default_stake_threshold(),
            multiplier_ceiling: default_multiplier_ceiling(),
        }
    }
}

impl TrackerConfig {
    /// Reward tier for a balance: the largest `t` with
    /// `balance >= t * stake_threshold`, clamped to the ceiling.
    /// 0 means below threshold.
    pub fn multiplier_for(&self, balance: Amount) -> RewardMultiplier {
        if balance < self.stake_threshold {
            return 0;
        }
        // clamp before narrowing so huge balances cannot wrap the cast
        let tier = (balance / self.stake_threshold).min(self.multiplier_ceiling as Amount);
        tier as RewardMultiplier
    }

    /// True when `height` is a positive multiple of the epoch span.
    pub fn is_epoch_boundary(&self, height: BlockHeight) -> bool {
        height >= self.epoch_span && height % self.epoch_span == 0
    }
}
