use std::fmt;
use std::sync::Arc;

use lanes::{Lane, LaneHandle};

use crate::callback_list::CallbackList;
use crate::core::Core;
use crate::{Failure, Outcome};

/// The read handle to an asynchronous result: absent until completed exactly
/// once, then permanently set.
///
/// An `Eventual` is bound to one [lane][lanes::Lane] for its whole life. All
/// of its state changes happen on that lane, which is what makes the
/// completion protocol safe without locks. Any number of handles may observe
/// one eventual; observers registered before completion are parked and run at
/// completion time, observers registered after completion run right away, and
/// either way they run in registration order.
///
/// Values reach observers by clone - completion stores the value once, and
/// every observer and transform takes its own copy. Wrap expensive payloads
/// in [`Arc`] if that matters.
///
/// The writing side is [`Promise`][crate::Promise].
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
/// let doubled = Eventual::succeeded(21, &lane).map(|v| v * 2);
///
/// assert_eq!(block_on(doubled.into_future()).unwrap(), 42);
/// ```
pub struct Eventual<T> {
    pub(crate) core: Arc<Core<T>>,
}

impl<T> Clone for Eventual<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for Eventual<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for Debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eventual")
            .field("lane", &self.core.lane().label())
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Eventual<T> {
    /// An eventual that is born succeeded with `value`, bound to `lane`.
    #[must_use]
    pub fn succeeded(value: T, lane: &LaneHandle) -> Self {
        Self {
            core: Core::completed(LaneHandle::clone(lane), Ok(value)),
        }
    }

    /// An eventual that is born failed with `error`, bound to `lane`.
    #[must_use]
    pub fn failed(error: Failure, lane: &LaneHandle) -> Self {
        Self {
            core: Core::completed(LaneHandle::clone(lane), Err(error)),
        }
    }

    /// The lane this eventual is bound to.
    #[must_use]
    pub fn lane(&self) -> &LaneHandle {
        self.core.lane()
    }
}

impl<T: Clone + Send + 'static> Eventual<T> {
    /// Runs `observer` with the outcome once it exists.
    ///
    /// May be called from any thread. Observers run on this eventual's lane,
    /// in registration order, exactly once each - immediately when the
    /// outcome is already present, otherwise at completion time.
    pub fn when_complete(&self, observer: impl FnOnce(Outcome<T>) + Send + 'static) {
        let source = Arc::clone(&self.core);
        self.core.observe(Box::new(move || {
            observer(source.outcome_now());
            CallbackList::new()
        }));
    }

    /// Runs `observer` with the value if this eventual succeeds; a failure
    /// is ignored.
    pub fn when_success(&self, observer: impl FnOnce(T) + Send + 'static) {
        self.when_complete(move |outcome| {
            if let Ok(value) = outcome {
                observer(value);
            }
        });
    }

    /// Runs `observer` with the failure if this eventual fails; a success is
    /// ignored.
    pub fn when_failure(&self, observer: impl FnOnce(Failure) + Send + 'static) {
        self.when_complete(move |outcome| {
            if let Err(error) = outcome {
                observer(error);
            }
        });
    }

    /// The outcome, if completion has happened yet.
    ///
    /// # Panics
    ///
    /// Panics when called off this eventual's lane. The state is
    /// lane-confined; read it from submitted work, or use
    /// [`when_complete()`][Self::when_complete] to be told when it arrives.
    #[must_use]
    pub fn result(&self) -> Option<Outcome<T>> {
        assert!(
            self.core.lane().is_current(),
            "result() read off the eventual's lane; submit the read to the lane instead"
        );
        self.core.peek()
    }

    /// The success value, if completion has happened and succeeded.
    ///
    /// # Panics
    ///
    /// Panics when called off this eventual's lane, like
    /// [`result()`][Self::result].
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.result().and_then(Result::ok)
    }

    /// The failure, if completion has happened and failed.
    ///
    /// # Panics
    ///
    /// Panics when called off this eventual's lane, like
    /// [`result()`][Self::result].
    #[must_use]
    pub fn error(&self) -> Option<Failure> {
        self.result().and_then(|outcome| outcome.err())
    }
}
