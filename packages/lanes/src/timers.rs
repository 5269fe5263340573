use std::cmp::Ordering;

use crate::Work;

/// A delayed work item keyed by its deadline, with a submission sequence
/// number breaking ties so that simultaneous deadlines preserve submission
/// order.
///
/// Ordered by `(deadline, seq)` only; the work itself does not participate in
/// comparisons. Intended to sit inside `Reverse` in a `BinaryHeap` so the
/// earliest deadline surfaces first.
pub(crate) struct TimerEntry<K> {
    pub(crate) deadline: K,
    pub(crate) seq: u64,
    pub(crate) work: Work,
}

impl<K: Ord> PartialEq for TimerEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<K: Ord> Eq for TimerEntry<K> {}

impl<K: Ord> PartialOrd for TimerEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for TimerEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}
