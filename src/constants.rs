//! Global constants for the cold-staking reward program
//!
//! Centralizes the protocol numbers so the tracker, the stores and the
//! tests all agree on one source of truth.

/// Reward-program protocol constants
pub mod reward {
    use crate::types::{Amount, BlockHeight, RewardMultiplier};

    /// Number of blocks in one reward epoch.
    /// Eligibility is only ever evaluated at integer multiples of this span.
    pub const EPOCH_SPAN: BlockHeight = 21_600;

    /// Minimum balance, in the smallest on-chain unit, that must be held
    /// continuously across a full epoch to qualify for the base reward.
    pub const STAKE_THRESHOLD: Amount = 20_000;

    /// Upper bound on the reward multiplier. Balances at or above
    /// `MULTIPLIER_CEILING * STAKE_THRESHOLD` all earn the ceiling tier.
    pub const MULTIPLIER_CEILING: RewardMultiplier = 5;
}

/// Key layout for the sled-backed store
pub mod storage {
    /// Prefix for per-address balance entries.
    pub const BALANCE_PREFIX: &[u8] = b"balance:";

    /// Prefix for per-address range-list entries.
    pub const RANGES_PREFIX: &[u8] = b"ranges:";

    /// Key of the single persisted checkpoint scalar.
    pub const CHECKPOINT_KEY: &[u8] = b"checkpoint";
}
