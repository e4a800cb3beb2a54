//! Scalar types shared across the tracker

/// Monetary amount in the smallest on-chain unit.
///
/// Balances are always non-negative; deltas applied by block connect and
/// disconnect may be signed.
pub type Amount = i64;

/// Height of a block in the chain.
pub type BlockHeight = u64;

/// Reward tier index. 0 means "below the stake threshold".
///
/// For a balance held continuously, the multiplier is the largest `t` with
/// `balance >= t * STAKE_THRESHOLD`, clamped to the configured ceiling.
pub type RewardMultiplier = u32;

/// Hash of a checkpointed block. Opaque to the tracker.
pub type BlockHash = [u8; 32];
