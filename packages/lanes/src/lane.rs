use std::fmt::Debug;
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

/// A unit of work submitted to a lane.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// A serial execution lane.
///
/// Work items submitted to a lane execute one at a time, in submission order,
/// and never overlap with each other. A piece of mutable state that is only
/// ever touched from work items of one lane is therefore strictly serialized
/// without any locking.
///
/// The confinement rule for such state: read or write it only while
/// [`is_current()`][Self::is_current] is true; from anywhere else, wrap the
/// access in a closure and [`submit()`][Self::submit] it.
pub trait Lane: Debug + Send + Sync + 'static {
    /// Whether the calling code is currently executing on this lane.
    fn is_current(&self) -> bool;

    /// Enqueues work to run on this lane after all previously submitted work.
    fn submit(&self, work: Work);

    /// Enqueues work to run on this lane once `delay` has elapsed.
    ///
    /// Delayed work never preempts anything: when the delay elapses the work
    /// still waits for the item currently executing on the lane to finish.
    /// Two items whose delays elapse at the same instant run in submission
    /// order.
    fn submit_after(&self, delay: Duration, work: Work);

    /// A short human-readable name for this lane, for diagnostics.
    fn label(&self) -> &str {
        "lane"
    }
}

/// A shared handle to a lane.
///
/// Handles are compared by identity, never by value: two handles refer to the
/// same lane exactly when [`same_lane()`] says so.
pub type LaneHandle = Arc<dyn Lane>;

/// Whether two handles refer to the same lane.
///
/// Lanes have identity, not value: a lane is "the same" only when both
/// handles point at one underlying lane object.
///
/// # Example
///
/// ```rust
/// use lanes::{LaneHandle, ThreadLane, same_lane};
///
/// let a: LaneHandle = ThreadLane::new("a");
/// let b: LaneHandle = ThreadLane::new("b");
/// let a_again = LaneHandle::clone(&a);
///
/// assert!(same_lane(&a, &a_again));
/// assert!(!same_lane(&a, &b));
/// ```
#[must_use]
#[inline]
pub fn same_lane(a: &LaneHandle, b: &LaneHandle) -> bool {
    ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
