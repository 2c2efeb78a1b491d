//! Bounded FIFO history of gestalt snapshots

use std::collections::VecDeque;

use parking_lot::RwLock;

use rondo_core::Timestamp;

use crate::GestaltSnapshot;

/// Bounded snapshot history. The oldest snapshot is evicted once the
/// configured capacity is exceeded; relative order is preserved.
pub struct StateHistory {
    snapshots: RwLock<VecDeque<GestaltSnapshot>>,
    max_size: usize,
}

impl StateHistory {
    pub fn new(max_size: usize) -> Self {
        StateHistory {
            snapshots: RwLock::new(VecDeque::with_capacity(max_size)),
            max_size,
        }
    }

    /// Append a snapshot, trimming the oldest entry past capacity.
    pub fn push(&self, snapshot: GestaltSnapshot) {
        let mut snapshots = self.snapshots.write();
        snapshots.push_back(snapshot);
        while snapshots.len() > self.max_size {
            snapshots.pop_front();
        }
    }

    /// The most recent snapshot, if any.
    pub fn latest(&self) -> Option<GestaltSnapshot> {
        self.snapshots.read().back().cloned()
    }

    /// All retained snapshots, oldest first.
    pub fn all(&self) -> Vec<GestaltSnapshot> {
        self.snapshots.read().iter().cloned().collect()
    }

    /// Snapshots whose timestamp falls strictly between `start` and `end`.
    pub fn range(&self, start: Timestamp, end: Timestamp) -> Vec<GestaltSnapshot> {
        self.snapshots
            .read()
            .iter()
            .filter(|s| s.timestamp > start && s.timestamp < end)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use rondo_core::Timestamp;

    use super::*;
    use crate::ProcessGraph;

    fn snapshot_at(millis: i64) -> GestaltSnapshot {
        GestaltSnapshot {
            timestamp: Timestamp::from_millis(millis),
            state: HashMap::new(),
            graph: ProcessGraph::new(),
        }
    }

    #[test]
    fn test_history_trims_oldest_first() {
        let history = StateHistory::new(3);
        for millis in 1..=5 {
            history.push(snapshot_at(millis));
        }

        let retained: Vec<i64> = history.all().iter().map(|s| s.timestamp.as_millis()).collect();
        assert_eq!(retained, vec![3, 4, 5]);
        assert_eq!(history.latest().unwrap().timestamp.as_millis(), 5);
    }

    #[test]
    fn test_range_bounds_are_exclusive() {
        let history = StateHistory::new(10);
        for millis in 1..=5 {
            history.push(snapshot_at(millis));
        }

        let inside: Vec<i64> = history
            .range(Timestamp::from_millis(1), Timestamp::from_millis(5))
            .iter()
            .map(|s| s.timestamp.as_millis())
            .collect();
        assert_eq!(inside, vec![2, 3, 4]);
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_capacity(max in 1usize..20, extra in 0usize..40) {
            let history = StateHistory::new(max);
            let total = max + extra;
            for i in 0..total {
                history.push(snapshot_at(i as i64));
            }

            prop_assert_eq!(history.len(), max);
            // Oldest `extra` entries evicted, remainder in original order
            let retained: Vec<i64> =
                history.all().iter().map(|s| s.timestamp.as_millis()).collect();
            let expected: Vec<i64> = (extra..total).map(|i| i as i64).collect();
            prop_assert_eq!(retained, expected);
        }
    }
}
