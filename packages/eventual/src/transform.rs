use std::sync::Arc;

use lanes::LaneHandle;

use crate::bridge::splice_inner;
use crate::callback_list::CallbackList;
use crate::core::Core;
use crate::eventual::Eventual;
use crate::{Failure, Outcome};

impl<T: Clone + Send + 'static> Eventual<T> {
    /// The shared shape of every transform: a derived cell on the same lane,
    /// completed by a continuation on the source. The continuation returns
    /// the derived cell's detached callbacks into the running trampoline,
    /// which is what keeps long chains at constant stack depth.
    fn derive<U: Send + 'static>(
        &self,
        apply: impl FnOnce(Outcome<T>, Arc<Core<U>>) -> CallbackList + Send + 'static,
    ) -> Eventual<U> {
        let next = Core::new(LaneHandle::clone(self.core.lane()));

        let source = Arc::clone(&self.core);
        let target = Arc::clone(&next);
        self.core
            .observe(Box::new(move || apply(source.outcome_now(), target)));

        Eventual { core: next }
    }

    /// Transforms the success value; a failure passes through untouched and
    /// the transform never runs for it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eventual::Eventual;
    /// use futures::executor::block_on;
    /// use lanes::ThreadLane;
    ///
    /// let lane: lanes::LaneHandle = ThreadLane::new("docs");
    ///
    /// let sum = Eventual::succeeded(5, &lane).map(|v| v + 3);
    ///
    /// assert_eq!(block_on(sum.into_future()).unwrap(), 8);
    /// ```
    #[must_use]
    pub fn map<U: Send + 'static>(
        &self,
        transform: impl FnOnce(T) -> U + Send + 'static,
    ) -> Eventual<U> {
        self.derive(move |outcome, next| next.fulfill(outcome.map(transform)))
    }

    /// Like [`map()`][Self::map], but the transform may fail; its `Err`
    /// becomes the derived eventual's failure.
    #[must_use]
    pub fn try_map<U: Send + 'static>(
        &self,
        transform: impl FnOnce(T) -> Outcome<U> + Send + 'static,
    ) -> Eventual<U> {
        self.derive(move |outcome, next| next.fulfill(outcome.and_then(transform)))
    }

    /// Transforms the full outcome, success or failure, into a new outcome.
    #[must_use]
    pub fn map_outcome<U: Send + 'static>(
        &self,
        transform: impl FnOnce(Outcome<T>) -> Outcome<U> + Send + 'static,
    ) -> Eventual<U> {
        self.derive(move |outcome, next| next.fulfill(transform(outcome)))
    }

    /// Gives a failure the chance to recover into a value or re-fail; a
    /// success passes through untouched.
    ///
    /// This is the only way (besides [`recover_with()`][Self::recover_with])
    /// to leave the failure track once an error has entered the chain.
    #[must_use]
    pub fn recover(
        &self,
        transform: impl FnOnce(Failure) -> Outcome<T> + Send + 'static,
    ) -> Self {
        self.derive(move |outcome, next| match outcome {
            Ok(value) => next.fulfill(Ok(value)),
            Err(error) => next.fulfill(transform(error)),
        })
    }

    /// Chains an asynchronous continuation onto the success value.
    ///
    /// The eventual returned by the transform completes the derived eventual.
    /// When it lives on the same lane its completion is spliced directly into
    /// the derived cell; otherwise it is bridged across lanes.
    #[must_use]
    pub fn flat_map<U: Clone + Send + 'static>(
        &self,
        transform: impl FnOnce(T) -> Eventual<U> + Send + 'static,
    ) -> Eventual<U> {
        self.derive(move |outcome, next| match outcome {
            Ok(value) => splice_inner(&transform(value), next),
            Err(error) => next.fulfill(Err(error)),
        })
    }

    /// Like [`flat_map()`][Self::flat_map], but the transform sees the full
    /// outcome, success or failure.
    #[must_use]
    pub fn flat_map_outcome<U: Clone + Send + 'static>(
        &self,
        transform: impl FnOnce(Outcome<T>) -> Eventual<U> + Send + 'static,
    ) -> Eventual<U> {
        self.derive(move |outcome, next| splice_inner(&transform(outcome), next))
    }

    /// Gives a failure the chance to recover asynchronously; a success
    /// passes through untouched.
    #[must_use]
    pub fn recover_with(
        &self,
        transform: impl FnOnce(Failure) -> Self + Send + 'static,
    ) -> Self {
        self.derive(move |outcome, next| match outcome {
            Ok(value) => next.fulfill(Ok(value)),
            Err(error) => splice_inner(&transform(error), next),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use lanes::ManualLane;

    use super::*;
    use crate::Promise;
    use crate::outcome::{NoValue, failure};

    fn manual(label: &str) -> (Arc<ManualLane>, LaneHandle) {
        let lane = ManualLane::new(label);
        let handle = Arc::clone(&lane) as LaneHandle;
        (lane, handle)
    }

    fn observed<T: Clone + Send + 'static>(
        lane: &Arc<ManualLane>,
        eventual: &Eventual<T>,
    ) -> Outcome<T> {
        let seen = Arc::new(Mutex::new(None));
        let observer = Arc::clone(&seen);
        eventual.when_complete(move |outcome| *observer.lock().unwrap() = Some(outcome));
        lane.run_until_idle();
        let outcome = seen.lock().unwrap().take();
        outcome.expect("eventual did not complete")
    }

    #[test]
    fn map_transforms_the_success_value() {
        let (lane, handle) = manual("test");

        let sum = Eventual::succeeded(5_u32, &handle).map(|v| v + 3);

        assert_eq!(observed(&lane, &sum).unwrap(), 8);
    }

    #[test]
    fn map_passes_a_failure_through_without_running_the_transform() {
        let (lane, handle) = manual("test");
        let ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&ran);
        let mapped = Eventual::<u32>::failed(failure(NoValue), &handle).map(move |v| {
            flag.store(true, Ordering::Relaxed);
            v + 3
        });

        let error = observed(&lane, &mapped).unwrap_err();
        assert!(error.downcast_ref::<NoValue>().is_some());
        assert!(!ran.load(Ordering::Relaxed));
    }

    #[test]
    fn try_map_failure_becomes_the_new_outcome() {
        let (lane, handle) = manual("test");

        let rejected =
            Eventual::succeeded(5_u32, &handle).try_map(|_| Err::<u32, _>(failure(NoValue)));

        assert!(
            observed(&lane, &rejected)
                .unwrap_err()
                .downcast_ref::<NoValue>()
                .is_some()
        );
    }

    #[test]
    fn map_outcome_sees_both_tracks() {
        let (lane, handle) = manual("test");

        let tagged = Eventual::<u32>::failed(failure(NoValue), &handle)
            .map_outcome(|outcome| Ok(u32::from(outcome.is_err())));

        assert_eq!(observed(&lane, &tagged).unwrap(), 1);
    }

    #[test]
    fn recover_turns_a_failure_into_a_value() {
        let (lane, handle) = manual("test");

        let healed = Eventual::<u32>::failed(failure(NoValue), &handle).recover(|_| Ok(42));

        assert_eq!(observed(&lane, &healed).unwrap(), 42);
    }

    #[test]
    fn recover_passes_success_through_without_running() {
        let (lane, handle) = manual("test");
        let ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&ran);
        let untouched = Eventual::succeeded(7_u32, &handle).recover(move |error| {
            flag.store(true, Ordering::Relaxed);
            Err(error)
        });

        assert_eq!(observed(&lane, &untouched).unwrap(), 7);
        assert!(!ran.load(Ordering::Relaxed));
    }

    #[test]
    fn flat_map_chains_same_lane_eventuals() {
        let (lane, handle) = manual("test");

        let chained_handle = LaneHandle::clone(&handle);
        let chained = Eventual::succeeded(2_u32, &handle)
            .flat_map(move |v| Eventual::succeeded(v * 10, &chained_handle));

        assert_eq!(observed(&lane, &chained).unwrap(), 20);
    }

    #[test]
    fn flat_map_waits_for_a_pending_inner_eventual() {
        let (lane, handle) = manual("test");
        let (inner_promise, inner) = Promise::pair(&handle);

        let chained = Eventual::succeeded(1_u32, &handle).flat_map(move |_| inner);

        let seen = Arc::new(Mutex::new(None));
        let observer = Arc::clone(&seen);
        chained.when_complete(move |outcome| *observer.lock().unwrap() = Some(outcome));
        lane.run_until_idle();
        assert!(seen.lock().unwrap().is_none(), "inner still pending");

        inner_promise.succeed(30_u32);
        lane.run_until_idle();
        assert_eq!(seen.lock().unwrap().take().unwrap().unwrap(), 30);
    }

    #[test]
    fn flat_map_bridges_across_lanes() {
        let (outer_lane, outer_handle) = manual("outer");
        let (inner_lane, inner_handle) = manual("inner");

        let chained = Eventual::succeeded(3_u32, &outer_handle)
            .flat_map(move |v| Eventual::succeeded(v + 100, &inner_handle));

        let seen = Arc::new(Mutex::new(None));
        let observer = Arc::clone(&seen);
        chained.when_complete(move |outcome| *observer.lock().unwrap() = Some(outcome));

        for _ in 0..8 {
            outer_lane.run_until_idle();
            inner_lane.run_until_idle();
        }

        assert_eq!(seen.lock().unwrap().take().unwrap().unwrap(), 103);
    }

    #[test]
    fn recover_with_switches_to_the_fallback_eventual() {
        let (lane, handle) = manual("test");

        let fallback_handle = LaneHandle::clone(&handle);
        let healed = Eventual::<u32>::failed(failure(NoValue), &handle)
            .recover_with(move |_| Eventual::succeeded(9, &fallback_handle));

        assert_eq!(observed(&lane, &healed).unwrap(), 9);
    }

    #[test]
    fn failure_skips_a_whole_transform_chain() {
        let (lane, handle) = manual("test");
        let ran = Arc::new(AtomicBool::new(false));

        let flag_a = Arc::clone(&ran);
        let flag_b = Arc::clone(&ran);
        let chain_handle = LaneHandle::clone(&handle);
        let chained = Eventual::<u32>::failed(failure(NoValue), &handle)
            .map(move |v| {
                flag_a.store(true, Ordering::Relaxed);
                v
            })
            .flat_map(move |v| {
                flag_b.store(true, Ordering::Relaxed);
                Eventual::succeeded(v, &chain_handle)
            });

        assert!(observed(&lane, &chained).is_err());
        assert!(!ran.load(Ordering::Relaxed));
    }
}
