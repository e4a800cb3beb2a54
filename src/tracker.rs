//! Cold-reward tracker core
//!
//! The validator drives this from its block-processing thread: one
//! `begin_transaction … end_transaction` pair per block, with one
//! `add_address_transaction` per address delta inside it (and the symmetric
//! `remove_address_transaction` calls, in reverse order, when a block is
//! disconnected). Reward payout code asks `eligible_addresses` at each
//! epoch boundary.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::address::Address;
use crate::checkpoint::last_checkpoint_at_or_below;
use crate::config::TrackerConfig;
use crate::epoch;
use crate::error::{TrackerError, TrackerResult};
use crate::range::BlockHeightRange;
use crate::store::RewardStore;
use crate::threshold;
use crate::types::{Amount, BlockHash, BlockHeight, RewardMultiplier};

/// Incremental eligibility tracker for the cold-staking reward program
pub struct ColdRewardTracker<S> {
    store: S,
    config: TrackerConfig,
    tx_open: bool,
}

impl<S: RewardStore> ColdRewardTracker<S> {
    /// Tracker with the canonical mainnet parameters.
    pub fn new(store: S) -> Self {
        Self::with_config(store, TrackerConfig::default())
    }

    pub fn with_config(store: S, config: TrackerConfig) -> Self {
        Self {
            store,
            config,
            tx_open: false,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Open the persisted transaction bracketing one block application.
    /// Nesting is a caller bug and is refused.
    pub fn begin_transaction(&mut self) -> TrackerResult<()> {
        if self.tx_open {
            return Err(TrackerError::TransactionAlreadyOpen);
        }
        self.store.begin_transaction()?;
        self.tx_open = true;
        Ok(())
    }

    /// Commit the persisted transaction. The open flag clears even when the
    /// store fails to commit; the caller is expected to discard the tracker
    /// state for that block either way.
    pub fn end_transaction(&mut self) -> TrackerResult<()> {
        if !self.tx_open {
            return Err(TrackerError::TransactionNotOpen);
        }
        let result = self.store.end_transaction();
        self.tx_open = false;
        result?;
        Ok(())
    }

    /// Apply one signed balance delta for `address` at `height` (block
    /// connect).
    ///
    /// Updates the balance, records the tier transition in the range
    /// history, and, when `height` newly reaches a checkpoint from
    /// `checkpoints`, advances the persisted checkpoint scalar and drops
    /// this address's ranges that ended before it.
    ///
    /// Refused when no transaction is open, when the resulting balance
    /// would be negative, or when `height` is inside checkpointed
    /// territory; refusals leave the store untouched.
    pub fn add_address_transaction(
        &mut self,
        height: BlockHeight,
        address: &Address,
        delta: Amount,
        checkpoints: &BTreeMap<BlockHeight, BlockHash>,
    ) -> TrackerResult<()> {
        self.require_open()?;

        let persisted = self.store.checkpoint_height()?;
        if height <= persisted {
            return Err(TrackerError::HeightCheckpointed {
                height,
                checkpoint: persisted,
            });
        }
        let reached = last_checkpoint_at_or_below(checkpoints, height);
        if reached.is_none() {
            if let Some((&earliest, _)) = checkpoints.iter().next() {
                return Err(TrackerError::HeightBeforeCheckpoints { height, earliest });
            }
        }

        let balance = self.store.balance(address)?;
        let new_balance = balance
            .checked_add(delta)
            .filter(|b| *b >= 0)
            .ok_or_else(|| TrackerError::NegativeBalance {
                address: address.clone(),
                result: balance.saturating_add(delta),
            })?;

        let mut ranges = self.checked_ranges(address)?;
        let prev_mult = self.config.multiplier_for(balance);
        let new_mult = self.config.multiplier_for(new_balance);
        let mut mutated = threshold::record_balance_change(&mut ranges, height, prev_mult, new_mult);

        // Prune after the update: a range extended at this height survives
        // a checkpoint its old end would not have.
        if let Some(reached) = reached {
            if reached > persisted {
                info!(checkpoint = reached, "persisted checkpoint advanced");
                self.store.set_checkpoint_height(reached)?;
                let before = ranges.len();
                ranges.retain(|r| r.end() >= reached);
                mutated |= ranges.len() != before;
            }
        }

        self.store.set_balance(address, new_balance)?;
        if mutated {
            self.store.set_ranges(address, ranges)?;
        }
        debug!(height, %address, delta, balance = new_balance, "address delta connected");
        Ok(())
    }

    /// Undo a prior `add_address_transaction(height, address, delta)`
    /// (block disconnect).
    ///
    /// The balance is debited by `delta` and the single structural change
    /// the connect made at `height` is unwound. Disconnecting a height that
    /// recorded no structural change still debits the balance. Refused at
    /// or below the persisted checkpoint: checkpointed history cannot be
    /// reorganized away.
    pub fn remove_address_transaction(
        &mut self,
        height: BlockHeight,
        address: &Address,
        delta: Amount,
    ) -> TrackerResult<()> {
        self.require_open()?;

        let persisted = self.store.checkpoint_height()?;
        if height <= persisted {
            return Err(TrackerError::HeightCheckpointed {
                height,
                checkpoint: persisted,
            });
        }

        let balance = self.store.balance(address)?;
        let restored = balance
            .checked_sub(delta)
            .filter(|b| *b >= 0)
            .ok_or_else(|| TrackerError::NegativeBalance {
                address: address.clone(),
                result: balance.saturating_sub(delta),
            })?;

        let mut ranges = self.checked_ranges(address)?;
        let mutated = threshold::unwind_balance_change(&mut ranges, height);

        self.store.set_balance(address, restored)?;
        if mutated {
            self.store.set_ranges(address, ranges)?;
        }
        debug!(height, %address, delta, balance = restored, "address delta disconnected");
        Ok(())
    }

    /// All addresses eligible for a reward at epoch boundary `height`, with
    /// the multiplier each one earned: the minimum tier held across the
    /// trailing window `(height - epoch_span, height]`. Addresses come back
    /// in byte order.
    ///
    /// `height` must be a positive multiple of the epoch span, and no
    /// transaction may be open (the scan must not observe half a block).
    pub fn eligible_addresses(
        &self,
        height: BlockHeight,
    ) -> TrackerResult<Vec<(Address, RewardMultiplier)>> {
        if self.tx_open {
            return Err(TrackerError::TransactionAlreadyOpen);
        }
        if !self.config.is_epoch_boundary(height) {
            return Err(TrackerError::NotAnEpochBoundary {
                height,
                span: self.config.epoch_span,
            });
        }

        let mut eligible = Vec::new();
        for (address, ranges) in self.store.all_ranges()? {
            validate_ranges(&address, &ranges)?;
            if let Some(mult) = epoch::window_multiplier(height, &ranges, self.config.epoch_span)? {
                eligible.push((address, mult));
            }
        }
        debug!(height, count = eligible.len(), "eligibility scan complete");
        Ok(eligible)
    }

    fn require_open(&self) -> TrackerResult<()> {
        if self.tx_open {
            Ok(())
        } else {
            Err(TrackerError::TransactionNotOpen)
        }
    }

    fn checked_ranges(&self, address: &Address) -> TrackerResult<Vec<BlockHeightRange>> {
        let ranges = self.store.ranges(address)?;
        validate_ranges(address, &ranges)?;
        Ok(ranges)
    }
}

/// Structural invariants of a persisted range list: starts never decrease,
/// every range is well-formed, and each range's `prev_multiplier` equals
/// its predecessor's tier. A violation means the store handed back history
/// the state machine could not have written.
fn validate_ranges(address: &Address, ranges: &[BlockHeightRange]) -> TrackerResult<()> {
    for r in ranges {
        if r.start() > r.end() {
            return Err(corruption(address, format!("inverted range {r:?}")));
        }
    }
    for pair in ranges.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if b.start() < a.start() {
            return Err(corruption(
                address,
                format!("range {b:?} starts before its predecessor {a:?}"),
            ));
        }
        if b.prev_multiplier() != a.multiplier() {
            return Err(corruption(
                address,
                format!("tier chain broken between {a:?} and {b:?}"),
            ));
        }
    }
    Ok(())
}

fn corruption(address: &Address, reason: String) -> TrackerError {
    TrackerError::StateCorruption {
        address: address.clone(),
        reason,
    }
}
