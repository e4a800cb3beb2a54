//! Connect / disconnect / eligibility scenarios
//!
//! Drives the tracker the way the validator does, one persisted
//! transaction per block, and checks balances, range histories and epoch
//! eligibility after every step, including reorg unwinds.

use std::collections::BTreeMap;

use coldreward::{
    Address, BlockHash, BlockHeight, BlockHeightRange, ColdRewardTracker, MemoryStore,
    RewardMultiplier, RewardStore, TrackerError,
};

const EPOCH: BlockHeight = 21_600;

struct Harness {
    tracker: ColdRewardTracker<MemoryStore>,
    checkpoints: BTreeMap<BlockHeight, BlockHash>,
}

impl Harness {
    fn new() -> Self {
        Self {
            tracker: ColdRewardTracker::new(MemoryStore::new()),
            checkpoints: BTreeMap::new(),
        }
    }

    fn connect(&mut self, height: BlockHeight, address: &Address, delta: i64) {
        self.try_connect(height, address, delta)
            .unwrap_or_else(|e| panic!("connect {delta} at {height} failed: {e}"));
    }

    fn try_connect(
        &mut self,
        height: BlockHeight,
        address: &Address,
        delta: i64,
    ) -> Result<(), TrackerError> {
        self.tracker.begin_transaction().unwrap();
        let result = self
            .tracker
            .add_address_transaction(height, address, delta, &self.checkpoints);
        self.tracker.end_transaction().unwrap();
        result
    }

    fn disconnect(&mut self, height: BlockHeight, address: &Address, delta: i64) {
        self.try_disconnect(height, address, delta)
            .unwrap_or_else(|e| panic!("disconnect {delta} at {height} failed: {e}"));
    }

    fn try_disconnect(
        &mut self,
        height: BlockHeight,
        address: &Address,
        delta: i64,
    ) -> Result<(), TrackerError> {
        self.tracker.begin_transaction().unwrap();
        let result = self
            .tracker
            .remove_address_transaction(height, address, delta);
        self.tracker.end_transaction().unwrap();
        result
    }

    fn balance(&self, address: &Address) -> i64 {
        self.tracker.store().balance(address).unwrap()
    }

    fn ranges(&self, address: &Address) -> Vec<BlockHeightRange> {
        self.tracker.store().ranges(address).unwrap()
    }

    /// Addresses with a materialized range history (even an empty one).
    fn tracked(&self) -> usize {
        self.tracker.store().tracked_addresses()
    }

    fn eligible(&self, height: BlockHeight) -> Vec<(Address, RewardMultiplier)> {
        self.tracker.eligible_addresses(height).unwrap()
    }
}

fn addr(s: &str) -> Address {
    Address::from(s.as_bytes())
}

fn range(start: u64, end: u64, mult: u32, prev: u32) -> BlockHeightRange {
    BlockHeightRange::new(start, end, mult, prev)
}

#[test]
fn balance_tracking_and_reorg_unwind() {
    let mut h = Harness::new();
    let abc = addr("abc");

    // 10 units at block 50: balance moves, nothing crosses the threshold
    h.connect(50, &abc, 10);
    assert_eq!(h.balance(&abc), 10);
    assert_eq!(h.tracked(), 0);

    // 20k more at block 51 opens a range
    h.connect(51, &abc, 20_000);
    assert_eq!(h.balance(&abc), 20_010);
    assert_eq!(h.ranges(&abc), vec![range(51, 51, 1, 0)]);

    // small spends keep it above threshold: the range extends
    h.connect(52, &abc, -5);
    assert_eq!(h.balance(&abc), 20_005);
    assert_eq!(h.ranges(&abc), vec![range(51, 52, 1, 0)]);

    // not yet held across a full window at the first boundary, but the
    // hold carries into the second epoch
    assert!(h.eligible(EPOCH).is_empty());
    assert_eq!(h.eligible(2 * EPOCH), vec![(abc.clone(), 1)]);

    h.connect(100, &abc, -5);
    assert_eq!(h.balance(&abc), 20_000);
    assert_eq!(h.ranges(&abc), vec![range(51, 100, 1, 0)]);

    // dropping below 20k at block 110 appends the break marker
    h.connect(110, &abc, -5);
    assert_eq!(h.balance(&abc), 19_995);
    assert_eq!(
        h.ranges(&abc),
        vec![range(51, 100, 1, 0), range(110, 110, 0, 1)]
    );

    // broken hold: no reward at either of the first two boundaries
    assert!(h.eligible(EPOCH).is_empty());
    assert!(h.eligible(2 * EPOCH).is_empty());

    // reorg block 110 away: back above 20k, eligible from the second epoch
    h.disconnect(110, &abc, -5);
    assert!(h.eligible(EPOCH).is_empty());
    assert_eq!(h.eligible(2 * EPOCH), vec![(abc.clone(), 1)]);
    assert_eq!(h.balance(&abc), 20_000);
    assert_eq!(h.ranges(&abc), vec![range(51, 100, 1, 0)]);

    // spend below threshold at 101 instead
    h.connect(101, &abc, -5);
    assert_eq!(h.balance(&abc), 19_995);
    assert_eq!(
        h.ranges(&abc),
        vec![range(51, 100, 1, 0), range(101, 101, 0, 1)]
    );
    assert!(h.eligible(EPOCH).is_empty());
    assert!(h.eligible(2 * EPOCH).is_empty());

    // and reorg that away too
    h.disconnect(101, &abc, -5);
    assert!(h.eligible(EPOCH).is_empty());
    assert_eq!(h.eligible(2 * EPOCH), vec![(abc.clone(), 1)]);
    assert_eq!(h.balance(&abc), 20_000);
    assert_eq!(h.ranges(&abc), vec![range(51, 100, 1, 0)]);

    // disconnecting a block whose delta was 0 still unwinds the range end:
    // the address verifiably held 20k+ from 51 through 99
    h.disconnect(100, &abc, 0);
    assert!(h.eligible(EPOCH).is_empty());
    assert_eq!(h.eligible(2 * EPOCH), vec![(abc.clone(), 1)]);
    assert_eq!(h.balance(&abc), 20_000);
    assert_eq!(h.ranges(&abc), vec![range(51, 99, 1, 0)]);

    // breaking the hold again after the unwind
    h.connect(101, &abc, -5);
    assert_eq!(h.balance(&abc), 19_995);
    assert_eq!(
        h.ranges(&abc),
        vec![range(51, 99, 1, 0), range(101, 101, 0, 1)]
    );
    assert!(h.eligible(EPOCH).is_empty());
    assert!(h.eligible(2 * EPOCH).is_empty());
}

#[test]
fn epoch_boundary_corners() {
    let mut h = Harness::new();
    let abc = addr("abc");

    h.connect(10, &abc, 20_000);
    assert_eq!(h.ranges(&abc), vec![range(10, 10, 1, 0)]);
    assert!(h.eligible(EPOCH).is_empty());

    // extend to one block before the first boundary
    h.connect(EPOCH - 1, &abc, 5);
    assert_eq!(h.balance(&abc), 20_005);
    assert_eq!(h.ranges(&abc), vec![range(10, EPOCH - 1, 1, 0)]);
    assert!(h.eligible(EPOCH).is_empty());
    assert_eq!(h.eligible(2 * EPOCH).len(), 1);

    // exactly at the boundary
    h.connect(EPOCH, &abc, 5);
    assert_eq!(h.balance(&abc), 20_010);
    assert_eq!(h.ranges(&abc), vec![range(10, EPOCH, 1, 0)]);
    assert!(h.eligible(EPOCH).is_empty());
    assert_eq!(h.eligible(2 * EPOCH).len(), 1);

    // one block past it
    h.connect(EPOCH + 1, &abc, 5);
    assert_eq!(h.balance(&abc), 20_015);
    assert_eq!(h.ranges(&abc), vec![range(10, EPOCH + 1, 1, 0)]);
    assert_eq!(h.eligible(2 * EPOCH).len(), 1);

    // reorg the tip block away
    h.disconnect(EPOCH + 1, &abc, 5);
    assert_eq!(h.balance(&abc), 20_010);
    assert_eq!(h.ranges(&abc), vec![range(10, EPOCH, 1, 0)]);

    // a bigger spend at the same height breaks the hold
    h.connect(EPOCH + 1, &abc, -15);
    assert_eq!(h.balance(&abc), 19_995);
    assert_eq!(
        h.ranges(&abc),
        vec![range(10, EPOCH, 1, 0), range(EPOCH + 1, EPOCH + 1, 0, 1)]
    );
    assert!(h.eligible(2 * EPOCH).is_empty());

    // disconnecting a height with no recorded change only debits balance
    h.disconnect(EPOCH + 1_000, &abc, 15);
    assert_eq!(h.balance(&abc), 19_980);
    assert_eq!(
        h.ranges(&abc),
        vec![range(10, EPOCH, 1, 0), range(EPOCH + 1, EPOCH + 1, 0, 1)]
    );
    assert!(h.eligible(2 * EPOCH).is_empty());
}

#[test]
fn tier_upgrades_are_reported_at_the_lowest_held() {
    let mut h = Harness::new();
    let abc = addr("abc");

    h.connect(10, &abc, 20_000);
    assert_eq!(h.ranges(&abc), vec![range(10, 10, 1, 0)]);
    assert!(h.eligible(EPOCH).is_empty());

    // doubling the stake late in the epoch opens a tier-2 range
    h.connect(EPOCH - 1, &abc, 20_005);
    assert_eq!(h.balance(&abc), 40_005);
    assert_eq!(
        h.ranges(&abc),
        vec![range(10, 10, 1, 0), range(EPOCH - 1, EPOCH - 1, 2, 1)]
    );

    assert!(h.eligible(EPOCH).is_empty());
    // the whole second window was spent at tier 2
    assert_eq!(h.eligible(2 * EPOCH), vec![(abc.clone(), 2)]);
}

#[test]
fn eligibility_height_validation() {
    let mut h = Harness::new();

    for bad in [1, EPOCH - 1, EPOCH + 1, EPOCH + 5_000] {
        assert!(matches!(
            h.tracker.eligible_addresses(bad),
            Err(TrackerError::NotAnEpochBoundary { .. })
        ));
    }

    for ok in [EPOCH, 2 * EPOCH, 3 * EPOCH, 50 * EPOCH] {
        assert!(h.eligible(ok).is_empty());
    }

    let abc = addr("abc");
    h.connect(1, &abc, 20_001);

    // nobody is eligible in the first epoch they start staking in
    assert!(h.eligible(EPOCH).is_empty());
    // and always eligible in later ones while the hold lasts
    assert_eq!(h.eligible(2 * EPOCH), vec![(abc.clone(), 1)]);
    assert_eq!(h.eligible(3 * EPOCH), vec![(abc.clone(), 1)]);

    // breaking the hold just past epoch 3 …
    h.connect(3 * EPOCH + 1, &abc, -2);

    // … makes the epoch-3 query stale (history has moved past it) …
    assert!(matches!(
        h.tracker.eligible_addresses(3 * EPOCH),
        Err(TrackerError::StaleEligibilityHeight { .. })
    ));

    // … and epoch 4 finds the hold broken
    assert!(h.eligible(4 * EPOCH).is_empty());
}

#[test]
fn negative_balances_are_refused() {
    let mut h = Harness::new();
    let abc = addr("abc");

    let err = h.try_connect(1, &abc, -1).unwrap_err();
    assert!(matches!(err, TrackerError::NegativeBalance { .. }));
    assert!(err.is_invalid_argument());

    let err = h.try_disconnect(1, &abc, 1).unwrap_err();
    assert!(matches!(err, TrackerError::NegativeBalance { .. }));

    // nothing was materialized by the refused operations
    assert_eq!(h.balance(&abc), 0);
    assert_eq!(h.tracked(), 0);
}

#[test]
fn same_height_interruptions_keep_every_crossing() {
    let mut h = Harness::new();
    let abc = addr("abc");

    h.connect(1, &abc, 20_001);
    assert_eq!(h.ranges(&abc), vec![range(1, 1, 1, 0)]);

    // oscillating across the threshold within one block leaves a
    // zero-width range per crossing; nothing is coalesced
    h.connect(1, &abc, -2);
    assert_eq!(h.balance(&abc), 19_999);
    assert_eq!(h.ranges(&abc), vec![range(1, 1, 1, 0), range(1, 1, 0, 1)]);

    h.connect(1, &abc, 2);
    assert_eq!(h.balance(&abc), 20_001);
    assert_eq!(
        h.ranges(&abc),
        vec![range(1, 1, 1, 0), range(1, 1, 0, 1), range(1, 1, 1, 0)]
    );

    h.connect(2, &abc, -2);
    h.connect(2, &abc, 2);
    assert_eq!(
        h.ranges(&abc),
        vec![
            range(1, 1, 1, 0),
            range(1, 1, 0, 1),
            range(1, 1, 1, 0),
            range(2, 2, 0, 1),
            range(2, 2, 1, 0),
        ]
    );
}

#[test]
fn disconnects_restore_state_exactly() {
    let mut h = Harness::new();
    let abc = addr("abc");

    // contiguous blocks so every extension is by exactly one height
    let deltas: [i64; 8] = [19_999, 1, 5, -5, 20_000, -20_001, 2, 19_999];
    let mut snapshots = Vec::new();

    for (i, delta) in deltas.iter().enumerate() {
        snapshots.push((h.balance(&abc), h.ranges(&abc)));
        h.connect(10 + i as u64, &abc, *delta);
    }

    for (i, delta) in deltas.iter().enumerate().rev() {
        h.disconnect(10 + i as u64, &abc, *delta);
        let (balance, ranges) = &snapshots[i];
        assert_eq!(h.balance(&abc), *balance, "balance after unwinding {i}");
        assert_eq!(h.ranges(&abc), *ranges, "ranges after unwinding {i}");
    }

    assert_eq!(h.balance(&abc), 0);
    assert!(h.ranges(&abc).is_empty());
}

#[test]
fn multiple_addresses_are_tracked_independently() {
    let mut h = Harness::new();
    let alice = addr("alice");
    let bob = addr("bob");
    let carol = addr("carol");

    h.connect(1, &alice, 20_000);
    h.connect(1, &bob, 60_000);
    h.connect(1, &carol, 19_999);

    h.connect(100, &alice, -1);

    assert!(h.eligible(EPOCH).is_empty());
    // alice broke her hold; carol never reached the threshold
    assert_eq!(h.eligible(2 * EPOCH), vec![(bob.clone(), 3)]);

    h.disconnect(100, &alice, -1);
    // results come back in address byte order
    assert_eq!(
        h.eligible(2 * EPOCH),
        vec![(alice.clone(), 1), (bob.clone(), 3)]
    );
}
