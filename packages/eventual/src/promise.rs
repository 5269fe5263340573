use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lanes::{Lane, LaneHandle};
use tracing::trace;

use crate::core::Core;
use crate::eventual::Eventual;
use crate::outcome::{Abandoned, failure};
use crate::Outcome;

/// The single-writer handle that completes an [`Eventual`] exactly once.
///
/// [`complete()`][Self::complete] may be called from any thread, any number
/// of times: the first completion wins and every later attempt is silently
/// ignored. That makes racing completions - a real result against a
/// timeout's synthetic failure, say - safe by construction.
///
/// # Abandonment
///
/// Dropping a promise that never completed fails its eventual with
/// [`Abandoned`][crate::Abandoned], so observers are never left waiting for
/// a value that cannot arrive anymore.
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
/// promise.succeed("hello");
///
/// assert_eq!(block_on(eventual.into_future()).unwrap(), "hello");
/// ```
pub struct Promise<T: Send + 'static> {
    core: Arc<Core<T>>,

    /// Advisory only - the authoritative first-completion-wins check lives in
    /// the cell. This just tells `Drop` whether abandonment applies.
    completed: AtomicBool,
}

impl<T: Send + 'static> Promise<T> {
    /// Creates a promise whose eventual is bound to `lane`.
    #[must_use]
    pub fn new(lane: &LaneHandle) -> Self {
        Self {
            core: Core::new(LaneHandle::clone(lane)),
            completed: AtomicBool::new(false),
        }
    }

    /// Creates a promise and its eventual in one step.
    #[must_use]
    pub fn pair(lane: &LaneHandle) -> (Self, Eventual<T>) {
        let promise = Self::new(lane);
        let eventual = promise.eventual();
        (promise, eventual)
    }

    /// The read handle for this promise. May be called repeatedly; every
    /// handle observes the same completion.
    #[must_use]
    pub fn eventual(&self) -> Eventual<T> {
        Eventual {
            core: Arc::clone(&self.core),
        }
    }

    /// Completes the eventual with `outcome`.
    ///
    /// Callable from any thread. If the eventual is already completed this
    /// does nothing.
    pub fn complete(&self, outcome: Outcome<T>) {
        self.completed.store(true, Ordering::Relaxed);
        self.core.resolve(outcome);
    }

    /// Completes the eventual with a success value.
    pub fn succeed(&self, value: T) {
        self.complete(Ok(value));
    }

    /// Completes the eventual with a failure.
    pub fn fail(&self, error: impl Error + Send + Sync + 'static) {
        self.complete(Err(failure(error)));
    }

    /// Hands the completion authority to internal forwarding machinery,
    /// disarming the abandonment check: whoever holds the cell is now
    /// responsible for completing it.
    pub(crate) fn defuse(self) -> Arc<Core<T>> {
        self.completed.store(true, Ordering::Relaxed);
        Arc::clone(&self.core)
    }
}

impl<T: Send + 'static> fmt::Debug for Promise<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for Debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("lane", &self.core.lane().label())
            .field("completed", &self.completed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.completed.load(Ordering::Relaxed) {
            trace!(
                lane = %self.core.lane().label(),
                "promise dropped before completion; failing with Abandoned"
            );
            self.core.resolve(Err(failure(Abandoned)));
        }
    }
}
