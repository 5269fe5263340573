use std::sync::Arc;
use std::time::Duration;

use lanes::{Lane, LaneHandle};

use crate::bridge::forwarding_continuation;
use crate::core::Core;
use crate::eventual::Eventual;
use crate::outcome::{DeadlineElapsed, failure};

impl<T: Clone + Send + 'static> Eventual<T> {
    /// Races this eventual against a deadline.
    ///
    /// If this eventual completes within `after`, its outcome passes through
    /// unchanged. Otherwise the returned eventual fails with
    /// [`DeadlineElapsed`] - and since the first completion wins, whatever
    /// this eventual later produces is silently discarded.
    ///
    /// This is not cancellation: the work feeding this eventual keeps
    /// running. The deadline only introduces a second, competing outcome.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    ///
    /// use eventual::{DeadlineElapsed, Promise};
    /// use futures::executor::block_on;
    /// use lanes::ThreadLane;
    ///
    /// let lane: lanes::LaneHandle = ThreadLane::new("docs");
    ///
    /// // A promise nobody ever completes.
    /// let (_promise, silence) = Promise::<u32>::pair(&lane);
    ///
    /// let bounded = silence.timeout(Duration::from_millis(5));
    /// let error = block_on(bounded.into_future()).unwrap_err();
    ///
    /// assert!(error.downcast_ref::<DeadlineElapsed>().is_some());
    /// ```
    #[must_use]
    pub fn timeout(&self, after: Duration) -> Self {
        let next = Core::new(LaneHandle::clone(self.core.lane()));

        let deadline_target = Arc::clone(&next);
        self.core.lane().submit_after(
            after,
            Box::new(move || deadline_target.resolve(Err(failure(DeadlineElapsed)))),
        );

        self.core.observe(forwarding_continuation(
            Arc::clone(&self.core),
            Arc::clone(&next),
        ));

        Self { core: next }
    }
}
