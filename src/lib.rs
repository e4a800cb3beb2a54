//! Incremental eligibility tracker for cold-staking rewards
//!
//! Maintains, per on-chain address, a running balance and a compact history
//! of the block-height intervals during which the address continuously held
//! at least the stake threshold. From that history it answers one question
//! per reward epoch: which addresses held through the entire trailing
//! window, and at what reward tier.
//!
//! The tracker is driven synchronously by the chain validator, one
//! persisted transaction per block connect or disconnect, and stays exact
//! under reorganizations: every connect maps to at most one structural
//! change in an address's history, and every disconnect unwinds exactly
//! that change. Consensus checkpoints bound how deep a reorganization may
//! reach and let history behind them be discarded.
//!
//! Storage is pluggable through [`store::RewardStore`]; [`store::MemoryStore`]
//! serves tests and embedders with their own durability, [`store::SledStore`]
//! persists standalone.

pub mod address;
pub mod checkpoint;
pub mod config;
pub mod constants;
pub mod epoch;
pub mod error;
pub mod range;
pub mod store;
pub mod threshold;
pub mod tracker;
pub mod types;

pub use address::Address;
pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use range::BlockHeightRange;
pub use store::{MemoryStore, RewardStore, SledStore, StoreError};
pub use tracker::ColdRewardTracker;
pub use types::{Amount, BlockHash, BlockHeight, RewardMultiplier};
