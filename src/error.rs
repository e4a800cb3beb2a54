//! Tracker-specific error types
//!
//! Strongly-typed errors for every way a connect, disconnect or eligibility
//! query can be refused, so callers can distinguish bad input from a broken
//! store without string matching.

use thiserror::Error;

use crate::address::Address;
use crate::store::StoreError;
use crate::types::{Amount, BlockHeight};

/// Errors surfaced by the tracker operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Applying the delta would leave the address with a negative balance
    #[error("balance of {address} would become negative ({result})")]
    NegativeBalance { address: Address, result: Amount },

    /// The height is at or below the last persisted checkpoint
    #[error("height {height} is at or below the persisted checkpoint {checkpoint}")]
    HeightCheckpointed {
        height: BlockHeight,
        checkpoint: BlockHeight,
    },

    /// The height predates every checkpoint in a non-empty checkpoint map
    #[error("height {height} predates the earliest known checkpoint {earliest}")]
    HeightBeforeCheckpoints {
        height: BlockHeight,
        earliest: BlockHeight,
    },

    /// Eligibility was queried at a height that is not a positive multiple
    /// of the epoch span
    #[error("height {height} is not a positive multiple of the epoch span {span}")]
    NotAnEpochBoundary {
        height: BlockHeight,
        span: BlockHeight,
    },

    /// Eligibility was queried at a boundary the recorded history has
    /// already moved past; eligibility is only answerable at the tip
    #[error("eligibility at height {height} is stale: recorded history reaches {latest}")]
    StaleEligibilityHeight {
        height: BlockHeight,
        latest: BlockHeight,
    },

    /// `begin_transaction` while a persisted transaction is already open,
    /// or a query that requires the tracker to be outside a transaction
    #[error("a persisted transaction is already open")]
    TransactionAlreadyOpen,

    /// A mutating operation was called outside `begin_transaction … end_transaction`
    #[error("no persisted transaction is open")]
    TransactionNotOpen,

    /// The range list read from the store violates its structural
    /// invariants. Fatal: the tracker does not attempt repair.
    #[error("range history of {address} is corrupt: {reason}")]
    StateCorruption { address: Address, reason: String },

    /// Error propagated verbatim from the persistence seam
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    /// True for refusals caused by the caller's arguments. These leave the
    /// persisted state untouched and the in-flight transaction abandonable.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            TrackerError::NegativeBalance { .. }
                | TrackerError::HeightCheckpointed { .. }
                | TrackerError::HeightBeforeCheckpoints { .. }
                | TrackerError::NotAnEpochBoundary { .. }
                | TrackerError::StaleEligibilityHeight { .. }
                | TrackerError::TransactionAlreadyOpen
                | TrackerError::TransactionNotOpen
        )
    }

    /// True when the error came out of the persistence seam.
    pub fn is_store_error(&self) -> bool {
        matches!(self, TrackerError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let err = TrackerError::NegativeBalance {
            address: Address::from(&b"abc"[..]),
            result: -5,
        };
        assert!(err.is_invalid_argument());
        assert!(!err.is_store_error());

        let err = TrackerError::Store(StoreError::CheckpointRegression {
            current: 10,
            requested: 3,
        });
        assert!(err.is_store_error());
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn corruption_is_not_invalid_argument() {
        let err = TrackerError::StateCorruption {
            address: Address::from(&b"abc"[..]),
            reason: "unordered ranges".into(),
        };
        assert!(!err.is_invalid_argument());
    }
}
