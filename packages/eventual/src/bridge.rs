use std::sync::Arc;

use lanes::{Lane, LaneHandle, same_lane};

use crate::callback_list::{Callback, CallbackList};
use crate::core::Core;
use crate::eventual::Eventual;
use crate::promise::Promise;

/// Builds the continuation that forwards `source`'s outcome into `target`.
///
/// When the two cells share a lane the forwarding splices: `target` is
/// fulfilled directly and its detached continuations are returned into the
/// running trampoline. Across lanes, the outcome is dispatched onto the
/// target's lane instead.
pub(crate) fn forwarding_continuation<T: Clone + Send + 'static>(
    source: Arc<Core<T>>,
    target: Arc<Core<T>>,
) -> Callback {
    Box::new(move || {
        let outcome = source.outcome_now();
        if same_lane(source.lane(), target.lane()) {
            target.fulfill(outcome)
        } else {
            target.resolve(outcome);
            CallbackList::new()
        }
    })
}

/// Wires an eventual produced inside a running continuation into a derived
/// cell. Must be called on the derived cell's lane.
///
/// The split matters for stack depth: when the inner eventual lives on the
/// lane we are already running on, its continuation is pushed directly so
/// follow-ups return into the current trampoline. Anything else would start a
/// nested callback run per chain link and grow the stack with the chain.
pub(crate) fn splice_inner<T: Clone + Send + 'static>(
    inner: &Eventual<T>,
    target: Arc<Core<T>>,
) -> CallbackList {
    let continuation = forwarding_continuation(Arc::clone(&inner.core), target);

    if inner.core.lane().is_current() {
        inner.core.push_callback(continuation)
    } else {
        inner.core.observe(continuation);
        CallbackList::new()
    }
}

impl<T: Clone + Send + 'static> Eventual<T> {
    /// An eventual with the same outcome, bound to `lane`.
    ///
    /// When this eventual is already bound to `lane` the very same handle
    /// comes back; no bridging cell is created. Otherwise the outcome is
    /// forwarded onto `lane` once it exists.
    ///
    /// Hopping is how lane-confined consumers observe work that completes
    /// elsewhere: hop first, then register observers that expect to run on
    /// their own lane.
    #[must_use]
    pub fn hop_to(&self, lane: &LaneHandle) -> Self {
        if same_lane(self.core.lane(), lane) {
            return self.clone();
        }

        let target = Core::new(LaneHandle::clone(lane));
        self.core.observe(forwarding_continuation(
            Arc::clone(&self.core),
            Arc::clone(&target),
        ));

        Self { core: target }
    }

    /// Forwards this eventual's outcome, once it exists, into `promise`.
    ///
    /// The promise is consumed: completion authority transfers to this
    /// eventual, and the promise's abandonment check is disarmed. If the
    /// promise's eventual lives on another lane, the outcome is dispatched
    /// onto that lane.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eventual::{Eventual, Promise};
    /// use futures::executor::block_on;
    /// use lanes::ThreadLane;
    ///
    /// let source_lane: lanes::LaneHandle = ThreadLane::new("source");
    /// let sink_lane: lanes::LaneHandle = ThreadLane::new("sink");
    ///
    /// let (sink, observed) = Promise::pair(&sink_lane);
    /// Eventual::succeeded(11, &source_lane).cascade_into(sink);
    ///
    /// assert_eq!(block_on(observed.into_future()).unwrap(), 11);
    /// ```
    pub fn cascade_into(&self, promise: Promise<T>) {
        let target = promise.defuse();
        self.core
            .observe(forwarding_continuation(Arc::clone(&self.core), target));
    }
}
