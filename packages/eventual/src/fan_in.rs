use std::cell::RefCell;
use std::mem;
use std::sync::Arc;

use lanes::LaneHandle;

use crate::callback_list::CallbackList;
use crate::core::Core;
use crate::eventual::Eventual;

/// On-lane bookkeeping for [`Eventual::and`]: whichever side's value arrives
/// first parks here until the other side shows up.
struct PairSlot<A, B> {
    state: RefCell<PairState<A, B>>,
}

enum PairState<A, B> {
    Neither,
    Left(A),
    Right(B),
    Done,
}

// SAFETY: Both continuations that touch the slot run on the same lane (the
// right-hand side is hopped there before registration), so access is strictly
// serialized; `Send` carries the values to that lane.
unsafe impl<A: Send, B: Send> Send for PairSlot<A, B> {}
// SAFETY: As above - lane confinement serializes all access.
unsafe impl<A: Send, B: Send> Sync for PairSlot<A, B> {}

impl<A, B> PairSlot<A, B> {
    fn new() -> Self {
        Self {
            state: RefCell::new(PairState::Neither),
        }
    }

    fn offer_left(&self, value: A) -> Option<(A, B)> {
        let mut state = self.state.borrow_mut();
        match mem::replace(&mut *state, PairState::Done) {
            PairState::Neither => {
                *state = PairState::Left(value);
                None
            }
            PairState::Right(other) => Some((value, other)),
            PairState::Left(_) | PairState::Done => {
                unreachable!("pair side completed twice")
            }
        }
    }

    fn offer_right(&self, value: B) -> Option<(A, B)> {
        let mut state = self.state.borrow_mut();
        match mem::replace(&mut *state, PairState::Done) {
            PairState::Neither => {
                *state = PairState::Right(value);
                None
            }
            PairState::Left(other) => Some((other, value)),
            PairState::Right(_) | PairState::Done => {
                unreachable!("pair side completed twice")
            }
        }
    }
}

/// On-lane bookkeeping for [`Eventual::gather_on`]: a fixed, index-addressed
/// slot per input, so the output preserves input order no matter the
/// completion order.
struct GatherSlots<T> {
    state: RefCell<GatherState<T>>,
}

struct GatherState<T> {
    filled: Vec<Option<T>>,
    remaining: usize,
}

// SAFETY: Every continuation that touches the slots runs on the gather's
// target lane (all inputs are hopped there first), so access is strictly
// serialized; `Send` carries the values to that lane.
unsafe impl<T: Send> Send for GatherSlots<T> {}
// SAFETY: As above - lane confinement serializes all access.
unsafe impl<T: Send> Sync for GatherSlots<T> {}

impl<T> GatherSlots<T> {
    fn new(count: usize) -> Self {
        let mut filled = Vec::with_capacity(count);
        filled.resize_with(count, || None);

        Self {
            state: RefCell::new(GatherState {
                filled,
                remaining: count,
            }),
        }
    }

    /// Stores one input's value; returns the completed, input-ordered vector
    /// once every slot is filled.
    fn fill(&self, index: usize, value: T) -> Option<Vec<T>> {
        let mut state = self.state.borrow_mut();

        let slot = state
            .filled
            .get_mut(index)
            .expect("slot index within input count");
        debug_assert!(slot.is_none(), "input completed twice");
        *slot = Some(value);

        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining > 0 {
            return None;
        }

        Some(
            state
                .filled
                .iter_mut()
                .map(|slot| slot.take().expect("every slot filled at this point"))
                .collect(),
        )
    }
}

impl<T: Clone + Send + 'static> Eventual<T> {
    /// Combines this eventual with another into an eventual of the pair.
    ///
    /// The first failure observed on either side completes the result
    /// immediately; whatever the other side eventually produces is discarded
    /// without any diagnostic. Success requires both sides, and the pair is
    /// `(self, other)` regardless of which side completed first.
    ///
    /// The result is bound to this eventual's lane; the other side is hopped
    /// over before any bookkeeping happens, so the two sides may live on
    /// different lanes.
    #[must_use]
    pub fn and<U: Clone + Send + 'static>(&self, other: &Eventual<U>) -> Eventual<(T, U)> {
        let next = Core::new(LaneHandle::clone(self.core.lane()));
        let other_here = other.hop_to(self.core.lane());
        let slot = Arc::new(PairSlot::new());

        let source = Arc::clone(&self.core);
        let pair = Arc::clone(&slot);
        let target = Arc::clone(&next);
        self.core.observe(Box::new(move || match source.outcome_now() {
            Err(error) => target.fulfill(Err(error)),
            Ok(left) => match pair.offer_left(left) {
                Some(both) => target.fulfill(Ok(both)),
                None => CallbackList::new(),
            },
        }));

        let source = Arc::clone(&other_here.core);
        let target = Arc::clone(&next);
        other_here
            .core
            .observe(Box::new(move || match source.outcome_now() {
                Err(error) => target.fulfill(Err(error)),
                Ok(right) => match slot.offer_right(right) {
                    Some(both) => target.fulfill(Ok(both)),
                    None => CallbackList::new(),
                },
            }));

        Eventual { core: next }
    }

    /// Combines any number of eventuals of one value type into an eventual
    /// of all their values, bound to `lane` and preserving input order.
    ///
    /// Every input is hopped onto `lane` before any bookkeeping happens. The
    /// first failure observed completes the result with that failure, and all
    /// later input completions - successes and failures alike - are
    /// discarded. Success requires every input; the output vector is in
    /// input order no matter the completion order. No inputs at all succeed
    /// immediately with an empty vector.
    #[must_use]
    pub fn gather_on(
        lane: &LaneHandle,
        inputs: impl IntoIterator<Item = Self>,
    ) -> Eventual<Vec<T>> {
        let inputs: Vec<Self> = inputs.into_iter().collect();
        let next = Core::new(LaneHandle::clone(lane));

        if inputs.is_empty() {
            next.resolve(Ok(Vec::new()));
            return Eventual { core: next };
        }

        let slots = Arc::new(GatherSlots::new(inputs.len()));

        for (index, input) in inputs.into_iter().enumerate() {
            let here = input.hop_to(lane);
            let source = Arc::clone(&here.core);
            let slots = Arc::clone(&slots);
            let target = Arc::clone(&next);
            here.core.observe(Box::new(move || match source.outcome_now() {
                Err(error) => target.fulfill(Err(error)),
                Ok(value) => match slots.fill(index, value) {
                    Some(values) => target.fulfill(Ok(values)),
                    None => CallbackList::new(),
                },
            }));
        }

        Eventual { core: next }
    }

    /// Like [`gather_on()`][Self::gather_on], bound to the first input's
    /// lane.
    ///
    /// # Panics
    ///
    /// Panics when `inputs` is empty - no lane can be inferred from zero
    /// inputs; use [`gather_on()`][Self::gather_on] for the empty case.
    #[must_use]
    pub fn gather(inputs: impl IntoIterator<Item = Self>) -> Eventual<Vec<T>> {
        let inputs: Vec<Self> = inputs.into_iter().collect();
        let lane = LaneHandle::clone(
            inputs
                .first()
                .expect("cannot infer a lane from zero inputs; use gather_on")
                .lane(),
        );

        Self::gather_on(&lane, inputs)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Mutex;

    use lanes::ManualLane;

    use super::*;
    use crate::outcome::{NoElements, NoValue, failure};
    use crate::{Outcome, Promise};

    fn manual(label: &str) -> (Arc<ManualLane>, LaneHandle) {
        let lane = ManualLane::new(label);
        let handle = Arc::clone(&lane) as LaneHandle;
        (lane, handle)
    }

    fn watch<T: Clone + Send + 'static>(
        eventual: &Eventual<T>,
    ) -> Arc<Mutex<Option<Outcome<T>>>> {
        let seen = Arc::new(Mutex::new(None));
        let observer = Arc::clone(&seen);
        eventual.when_complete(move |outcome| *observer.lock().unwrap() = Some(outcome));
        seen
    }

    #[test]
    fn and_pairs_two_successes() {
        let (lane, handle) = manual("test");

        let paired = Eventual::succeeded(1_u32, &handle).and(&Eventual::succeeded("a", &handle));
        let seen = watch(&paired);
        lane.run_until_idle();

        assert_eq!(seen.lock().unwrap().take().unwrap().unwrap(), (1, "a"));
    }

    #[test]
    fn and_pairs_regardless_of_arrival_order() {
        let (lane, handle) = manual("test");
        let (left_promise, left) = Promise::pair(&handle);
        let (right_promise, right) = Promise::pair(&handle);

        let paired = left.and(&right);
        let seen = watch(&paired);

        // The right side lands first; the pair must still be (left, right).
        right_promise.succeed("b");
        lane.run_until_idle();
        assert!(seen.lock().unwrap().is_none());

        left_promise.succeed(2_u32);
        lane.run_until_idle();
        assert_eq!(seen.lock().unwrap().take().unwrap().unwrap(), (2, "b"));
    }

    #[test]
    fn and_fails_immediately_while_the_other_side_stays_pending() {
        let (lane, handle) = manual("test");
        let (left_promise, left) = Promise::<u32>::pair(&handle);
        let (_right_promise, right) = Promise::<&str>::pair(&handle);

        let paired = left.and(&right);
        let seen = watch(&paired);

        left_promise.fail(NoValue);
        lane.run_until_idle();

        // The right side never completed, yet the pair already failed.
        let outcome = seen.lock().unwrap().take().unwrap();
        assert!(outcome.unwrap_err().downcast_ref::<NoValue>().is_some());
    }

    #[test]
    fn and_discards_the_losing_sides_outcome() {
        let (lane, handle) = manual("test");
        let (left_promise, left) = Promise::<u32>::pair(&handle);
        let (right_promise, right) = Promise::<u32>::pair(&handle);

        let paired = left.and(&right);
        let seen = watch(&paired);

        left_promise.fail(NoValue);
        lane.run_until_idle();
        // The losing side completes later - with a different failure - and
        // that outcome vanishes without a trace. Deliberate lossy contract.
        right_promise.fail(NoElements);
        lane.run_until_idle();

        let outcome = seen.lock().unwrap().take().unwrap();
        assert!(outcome.unwrap_err().downcast_ref::<NoValue>().is_some());
    }

    #[test]
    fn and_spans_lanes() {
        let (left_lane, left_handle) = manual("left");
        let (right_lane, right_handle) = manual("right");

        let paired =
            Eventual::succeeded(1_u32, &left_handle).and(&Eventual::succeeded(2_u32, &right_handle));
        let seen = watch(&paired);

        for _ in 0..8 {
            left_lane.run_until_idle();
            right_lane.run_until_idle();
        }

        assert_eq!(seen.lock().unwrap().take().unwrap().unwrap(), (1, 2));
    }

    #[test]
    fn gather_preserves_input_order_under_any_completion_order() {
        let (lane, handle) = manual("test");
        let (promise_a, a) = Promise::pair(&handle);
        let (promise_b, b) = Promise::pair(&handle);
        let (promise_c, c) = Promise::pair(&handle);

        let gathered = Eventual::gather([a, b, c]);
        let seen = watch(&gathered);

        // Complete in reverse order.
        promise_c.succeed("z");
        promise_b.succeed("y");
        lane.run_until_idle();
        assert!(seen.lock().unwrap().is_none());

        promise_a.succeed("x");
        lane.run_until_idle();

        assert_eq!(
            seen.lock().unwrap().take().unwrap().unwrap(),
            vec!["x", "y", "z"]
        );
    }

    #[test]
    fn gather_fails_with_the_first_observed_failure() {
        let (lane, handle) = manual("test");
        let (promise_a, a) = Promise::<u32>::pair(&handle);
        let (promise_b, b) = Promise::<u32>::pair(&handle);

        let gathered = Eventual::gather([a, b]);
        let seen = watch(&gathered);

        promise_b.fail(NoValue);
        lane.run_until_idle();

        let outcome = seen.lock().unwrap().take().unwrap();
        assert!(outcome.unwrap_err().downcast_ref::<NoValue>().is_some());

        // The straggler's success is silently discarded.
        promise_a.succeed(1);
        lane.run_until_idle();
    }

    #[test]
    fn gather_on_with_no_inputs_succeeds_immediately_with_empty() {
        let (lane, handle) = manual("test");

        let gathered = Eventual::<u32>::gather_on(&handle, []);
        let seen = watch(&gathered);
        lane.run_until_idle();

        assert_eq!(seen.lock().unwrap().take().unwrap().unwrap(), Vec::<u32>::new());
    }

    #[test]
    #[should_panic(expected = "cannot infer a lane from zero inputs")]
    fn gather_with_no_inputs_panics() {
        drop(Eventual::<u32>::gather([]));
    }

    #[test]
    fn gather_hops_inputs_from_other_lanes() {
        let (target_lane, target_handle) = manual("target");
        let (other_lane, other_handle) = manual("other");

        let gathered = Eventual::gather_on(
            &target_handle,
            [
                Eventual::succeeded(1_u32, &target_handle),
                Eventual::succeeded(2_u32, &other_handle),
            ],
        );
        let seen = watch(&gathered);

        for _ in 0..8 {
            target_lane.run_until_idle();
            other_lane.run_until_idle();
        }

        assert_eq!(seen.lock().unwrap().take().unwrap().unwrap(), vec![1, 2]);
    }
}
