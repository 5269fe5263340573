use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::eventual::Eventual;
use crate::Outcome;

/// Bridge slot between an eventual's completion (which happens on its lane)
/// and a std async executor polling from anywhere. A mutex is fine here: this
/// is the boundary to the outside world, not part of the lane-confined
/// completion protocol.
struct BridgeSlot<T> {
    outcome: Option<Outcome<T>>,
    waker: Option<Waker>,
}

/// A std [`Future`] resolving to an eventual's outcome.
///
/// Created by awaiting an [`Eventual`] (it implements [`IntoFuture`]) or by
/// driving it with an executor such as `futures::executor::block_on`.
pub struct OutcomeFuture<T> {
    slot: Arc<Mutex<BridgeSlot<T>>>,
}

impl<T> fmt::Debug for OutcomeFuture<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for Debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeFuture").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> IntoFuture for Eventual<T> {
    type Output = Outcome<T>;
    type IntoFuture = OutcomeFuture<T>;

    /// Bridges this eventual into std async.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eventual::Promise;
    /// use futures::executor::block_on;
    /// use lanes::ThreadLane;
    ///
    /// let lane: lanes::LaneHandle = ThreadLane::new("docs");
    /// let (promise, eventual) = Promise::pair(&lane);
    ///
    /// promise.succeed(6);
    ///
    /// assert_eq!(block_on(eventual.into_future()).unwrap(), 6);
    /// ```
    fn into_future(self) -> OutcomeFuture<T> {
        let slot = Arc::new(Mutex::new(BridgeSlot {
            outcome: None,
            waker: None,
        }));

        let filler = Arc::clone(&slot);
        self.when_complete(move |outcome| {
            let mut slot = filler.lock().expect("bridge slot lock poisoned");
            slot.outcome = Some(outcome);
            let waker = slot.waker.take();
            drop(slot);

            // Wake outside the lock; the woken task polls immediately on
            // single-threaded executors.
            if let Some(waker) = waker {
                waker.wake();
            }
        });

        OutcomeFuture { slot }
    }
}

impl<T> Future for OutcomeFuture<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock().expect("bridge slot lock poisoned");

        match slot.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
