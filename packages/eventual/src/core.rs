use std::cell::RefCell;
use std::mem;
use std::sync::Arc;

use lanes::{Lane, LaneHandle};
use tracing::trace;

use crate::callback_list::{Callback, CallbackList};
use crate::Outcome;

/// The shared completion cell behind an [`Eventual`][crate::Eventual] /
/// [`Promise`][crate::Promise] pair.
///
/// The cell is bound to one lane for its whole life and its mutable state is
/// only ever touched while executing on that lane. The lane's strict
/// serialization is the mutual exclusion; no lock is involved. Anything that
/// wants to touch the state from elsewhere submits a closure to the lane
/// instead ([`resolve()`][Self::resolve], [`observe()`][Self::observe]).
pub(crate) struct Core<T> {
    lane: LaneHandle,
    state: RefCell<State<T>>,
}

struct State<T> {
    /// Set at most once, then never changes. Kept forever so that observers
    /// registered after completion still see the outcome.
    outcome: Option<Outcome<T>>,

    /// Continuations waiting for completion, in registration order. Detached
    /// wholesale when the outcome arrives.
    callbacks: CallbackList,
}

// SAFETY: The `RefCell` is only ever borrowed while executing on `lane`
// (asserted in every accessor), and a lane runs at most one work item at a
// time, so two threads never touch the cell concurrently. The contained
// values move across threads when the completing or observing side lives
// elsewhere, hence the `T: Send` bound.
unsafe impl<T: Send> Send for Core<T> {}
// SAFETY: As above - lane confinement serializes all access through the
// shared reference.
unsafe impl<T: Send> Sync for Core<T> {}

impl<T> Core<T> {
    pub(crate) fn lane(&self) -> &LaneHandle {
        &self.lane
    }
}

impl<T: Send + 'static> Core<T> {
    pub(crate) fn new(lane: LaneHandle) -> Arc<Self> {
        Arc::new(Self {
            lane,
            state: RefCell::new(State {
                outcome: None,
                callbacks: CallbackList::new(),
            }),
        })
    }

    /// A cell that is born completed, for `succeeded()`/`failed()`.
    pub(crate) fn completed(lane: LaneHandle, outcome: Outcome<T>) -> Arc<Self> {
        Arc::new(Self {
            lane,
            state: RefCell::new(State {
                outcome: Some(outcome),
                callbacks: CallbackList::new(),
            }),
        })
    }

    /// Stores the outcome and detaches the pending continuations for the
    /// caller to run. On-lane only.
    ///
    /// The first completion wins; any later attempt returns an empty list and
    /// changes nothing.
    pub(crate) fn fulfill(&self, outcome: Outcome<T>) -> CallbackList {
        self.assert_confined();

        let mut state = self.state.borrow_mut();
        if state.outcome.is_some() {
            drop(state);
            trace!(
                lane = %self.lane.label(),
                "completion of an already-completed eventual ignored"
            );
            return CallbackList::new();
        }

        state.outcome = Some(outcome);
        mem::take(&mut state.callbacks)
    }

    /// Completes the cell from wherever the caller happens to be running:
    /// directly when already on the lane, else by submitting to it.
    pub(crate) fn resolve(self: &Arc<Self>, outcome: Outcome<T>) {
        if self.lane.is_current() {
            self.fulfill(outcome).run();
        } else {
            let core = Arc::clone(self);
            self.lane
                .submit(Box::new(move || core.fulfill(outcome).run()));
        }
    }

    /// The registration primitive. On-lane only.
    ///
    /// Pending: the continuation is parked and an empty list comes back.
    /// Completed: the continuation runs immediately and its follow-ups come
    /// back, so a caller inside the trampoline keeps trampolining instead of
    /// recursing.
    pub(crate) fn push_callback(&self, callback: Callback) -> CallbackList {
        self.assert_confined();

        let mut state = self.state.borrow_mut();
        if state.outcome.is_some() {
            // Run outside the borrow: the continuation may well come back
            // into this cell (e.g. to read the outcome).
            drop(state);
            return callback();
        }

        state.callbacks.append(callback);
        CallbackList::new()
    }

    /// Registers a continuation from wherever the caller happens to be
    /// running, driving whatever becomes runnable through the trampoline.
    pub(crate) fn observe(self: &Arc<Self>, callback: Callback) {
        if self.lane.is_current() {
            self.push_callback(callback).run();
        } else {
            let core = Arc::clone(self);
            self.lane
                .submit(Box::new(move || core.push_callback(callback).run()));
        }
    }

    fn assert_confined(&self) {
        debug_assert!(
            self.lane.is_current(),
            "eventual state touched off its lane"
        );
    }
}

impl<T: Clone + Send + 'static> Core<T> {
    /// Clones the stored outcome, if any. On-lane only.
    pub(crate) fn peek(&self) -> Option<Outcome<T>> {
        self.assert_confined();
        self.state.borrow().outcome.clone()
    }

    /// The outcome of a cell that is known to be completed - continuations
    /// only run after completion, so they read through this.
    pub(crate) fn outcome_now(&self) -> Outcome<T> {
        self.peek().expect("continuation ran before completion")
    }
}
