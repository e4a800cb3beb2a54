//! Persistence seam for tracker state
//!
//! The tracker reads and writes balances, range lists and the checkpoint
//! scalar exclusively through [`RewardStore`]; it never touches a database
//! directly. Two implementations ship here: an in-memory store for tests
//! and embedders that manage their own durability, and a sled-backed store
//! for standalone operation.
//!
//! The seam is deliberately synchronous: the tracker runs on the
//! validator's block-processing thread and one `begin … end` pair brackets
//! all reads and writes of a single logical block application.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use crate::address::Address;
use crate::constants::storage::{BALANCE_PREFIX, CHECKPOINT_KEY, RANGES_PREFIX};
use crate::range::BlockHeightRange;
use crate::types::{Amount, BlockHeight};

/// Errors surfaced by a store implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// The persisted checkpoint scalar only ever moves forward
    #[error("checkpoint cannot move back from {current} to {requested}")]
    CheckpointRegression {
        current: BlockHeight,
        requested: BlockHeight,
    },

    /// Storage/database error
    #[error("storage error: {0}")]
    Backend(#[from] sled::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Capability set the tracker persists through
pub trait RewardStore {
    /// Balance of `address`; 0 when the address has never been seen.
    fn balance(&self, address: &Address) -> Result<Amount, StoreError>;

    fn set_balance(&self, address: &Address, amount: Amount) -> Result<(), StoreError>;

    /// Range history of `address`; empty when the address has none.
    fn ranges(&self, address: &Address) -> Result<Vec<BlockHeightRange>, StoreError>;

    /// Replace the range history of `address`. Writing an empty list keeps
    /// the address enumerable.
    fn set_ranges(&self, address: &Address, ranges: Vec<BlockHeightRange>)
        -> Result<(), StoreError>;

    /// Highest checkpoint height durably observed; 0 before the first.
    fn checkpoint_height(&self) -> Result<BlockHeight, StoreError>;

    /// Advance the persisted checkpoint. Must reject decreases.
    fn set_checkpoint_height(&self, height: BlockHeight) -> Result<(), StoreError>;

    /// Range histories of every known address, keyed in byte order.
    fn all_ranges(&self) -> Result<BTreeMap<Address, Vec<BlockHeightRange>>, StoreError>;

    fn begin_transaction(&self) -> Result<(), StoreError>;

    fn end_transaction(&self) -> Result<(), StoreError>;
}

/// In-memory store backed by plain maps
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryState>,
}

#[derive(Default, Clone)]
struct MemoryState {
    balances: HashMap<Address, Amount>,
    ranges: BTreeMap<Address, Vec<BlockHeightRange>>,
    checkpoint: BlockHeight,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addresses with a materialized range history. Test hook.
    pub fn tracked_addresses(&self) -> usize {
        self.inner.read().ranges.len()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            inner: RwLock::new(self.inner.read().clone()),
        }
    }
}

impl RewardStore for MemoryStore {
    fn balance(&self, address: &Address) -> Result<Amount, StoreError> {
        Ok(self.inner.read().balances.get(address).copied().unwrap_or(0))
    }

    fn set_balance(&self, address: &Address, amount: Amount) -> Result<(), StoreError> {
        self.inner.write().balances.insert(address.clone(), amount);
        Ok(())
    }

    fn ranges(&self, address: &Address) -> Result<Vec<BlockHeightRange>, StoreError> {
        Ok(self
            .inner
            .read()
            .ranges
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    fn set_ranges(
        &self,
        address: &Address,
        ranges: Vec<BlockHeightRange>,
    ) -> Result<(), StoreError> {
        self.inner.write().ranges.insert(address.clone(), ranges);
        Ok(())
    }

    fn checkpoint_height(&self) -> Result<BlockHeight, StoreError> {
        Ok(self.inner.read().checkpoint)
    }

    fn set_checkpoint_height(&self, height: BlockHeight) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if height < inner.checkpoint {
            return Err(StoreError::CheckpointRegression {
                current: inner.checkpoint,
                requested: height,
            });
        }
        inner.checkpoint = height;
        Ok(())
    }

    fn all_ranges(&self) -> Result<BTreeMap<Address, Vec<BlockHeightRange>>, StoreError> {
        Ok(self.inner.read().ranges.clone())
    }

    fn begin_transaction(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn end_transaction(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Sled-backed store
///
/// Key layout inside one tree: `balance:<addr>` and `ranges:<addr>` with
/// bincode values, plus a single `checkpoint` scalar. Prefix scans drive
/// enumeration.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Wrap an already-open database (for embedders sharing one sled file).
    pub fn with_db(db: sled::Db) -> Self {
        Self { db }
    }

    fn prefixed(prefix: &[u8], address: &Address) -> Vec<u8> {
        let mut key = Vec::with_capacity(prefix.len() + address.as_bytes().len());
        key.extend_from_slice(prefix);
        key.extend_from_slice(address.as_bytes());
        key
    }
}

impl RewardStore for SledStore {
    fn balance(&self, address: &Address) -> Result<Amount, StoreError> {
        match self.db.get(Self::prefixed(BALANCE_PREFIX, address))? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(0),
        }
    }

    fn set_balance(&self, address: &Address, amount: Amount) -> Result<(), StoreError> {
        let bytes = bincode::serialize(&amount)?;
        self.db
            .insert(Self::prefixed(BALANCE_PREFIX, address), bytes)?;
        Ok(())
    }

    fn ranges(&self, address: &Address) -> Result<Vec<BlockHeightRange>, StoreError> {
        match self.db.get(Self::prefixed(RANGES_PREFIX, address))? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn set_ranges(
        &self,
        address: &Address,
        ranges: Vec<BlockHeightRange>,
    ) -> Result<(), StoreError> {
        let bytes = bincode::serialize(&ranges)?;
        self.db
            .insert(Self::prefixed(RANGES_PREFIX, address), bytes)?;
        Ok(())
    }

    fn checkpoint_height(&self) -> Result<BlockHeight, StoreError> {
        match self.db.get(CHECKPOINT_KEY)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(0),
        }
    }

    fn set_checkpoint_height(&self, height: BlockHeight) -> Result<(), StoreError> {
        let current = self.checkpoint_height()?;
        if height < current {
            return Err(StoreError::CheckpointRegression {
                current,
                requested: height,
            });
        }
        self.db.insert(CHECKPOINT_KEY, bincode::serialize(&height)?)?;
        Ok(())
    }

    fn all_ranges(&self) -> Result<BTreeMap<Address, Vec<BlockHeightRange>>, StoreError> {
        let mut out = BTreeMap::new();
        for item in self.db.scan_prefix(RANGES_PREFIX) {
            let (key, value) = item?;
            let address = Address::from(&key[RANGES_PREFIX.len()..]);
            let ranges: Vec<BlockHeightRange> = bincode::deserialize(&value)?;
            out.insert(address, ranges);
        }
        Ok(out)
    }

    fn begin_transaction(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn end_transaction(&self) -> Result<(), StoreError> {
        // sled batches internally; a flush at commit makes the block durable
        self.db.flush()?;
        Ok(())
    }
}
