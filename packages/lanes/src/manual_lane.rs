use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;

use ring_buffer::RingBuffer;

use crate::timers::TimerEntry;
use crate::{Lane, Work};

/// A deterministic lane for tests: executes nothing until explicitly pumped,
/// and runs delayed work against a virtual clock instead of real time.
///
/// Submissions from any thread queue up; [`run_until_idle()`][Self::run_until_idle]
/// and [`advance()`][Self::advance] drain them on the calling thread.
/// [`Lane::is_current()`] is true only while a pump call is executing work,
/// which makes the queue-confinement discipline of lane-confined code fully
/// observable in tests: code that checks `is_current()` off-lane sees `false`
/// and must round-trip through [`Lane::submit()`].
///
/// Only one thread may pump a given lane at a time.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use lanes::{Lane, ManualLane};
///
/// let lane = ManualLane::new("test");
/// let fired = Arc::new(AtomicBool::new(false));
///
/// let flag = Arc::clone(&fired);
/// lane.submit_after(
///     Duration::from_secs(5),
///     Box::new(move || flag.store(true, Ordering::Relaxed)),
/// );
///
/// lane.advance(Duration::from_secs(4));
/// assert!(!fired.load(Ordering::Relaxed));
///
/// lane.advance(Duration::from_secs(1));
/// assert!(fired.load(Ordering::Relaxed));
/// ```
pub struct ManualLane {
    label: String,
    state: Mutex<State>,
}

struct State {
    ready: RingBuffer<Work>,
    timers: BinaryHeap<Reverse<TimerEntry<Duration>>>,
    timer_seq: u64,

    /// Virtual time since lane creation. Moves only via `advance()`.
    clock: Duration,

    /// The thread currently pumping, with its reentrancy depth.
    pumping: Option<(ThreadId, u32)>,
}

impl ManualLane {
    /// Creates a new manual lane with a virtual clock at zero.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            state: Mutex::new(State {
                ready: RingBuffer::new(),
                timers: BinaryHeap::new(),
                timer_seq: 0,
                clock: Duration::ZERO,
                pumping: None,
            }),
        })
    }

    /// Runs queued work on the calling thread until the queue is empty.
    ///
    /// Work submitted by work items during the pump runs too. Delayed work is
    /// untouched; only [`advance()`][Self::advance] moves the clock.
    ///
    /// # Panics
    ///
    /// Panics if another thread is pumping this lane at the same time.
    pub fn run_until_idle(&self) {
        let _guard = PumpGuard::enter(self);
        self.drain_ready();
    }

    /// Moves the virtual clock forward by `delta`, running all work that
    /// comes due along the way.
    ///
    /// Queued work runs first. Then each delayed item whose deadline falls
    /// within the advanced window runs at its deadline (the clock stops at
    /// each deadline in order, so delayed work submitted by delayed work is
    /// honored when it lands inside the window). Finally the clock lands on
    /// the target time.
    ///
    /// # Panics
    ///
    /// Panics if another thread is pumping this lane at the same time.
    pub fn advance(&self, delta: Duration) {
        let _guard = PumpGuard::enter(self);
        self.drain_ready();

        let target = {
            let state = self.state();
            state
                .clock
                .checked_add(delta)
                .expect("virtual clock overflow")
        };

        loop {
            let next = {
                let mut state = self.state();
                let due = state
                    .timers
                    .peek()
                    .is_some_and(|Reverse(entry)| entry.deadline <= target);
                if due {
                    state.timers.pop()
                } else {
                    None
                }
            };

            let Some(Reverse(entry)) = next else {
                break;
            };

            {
                let mut state = self.state();
                state.clock = entry.deadline;
                state.ready.push_back(entry.work);
            }
            self.drain_ready();
        }

        self.state().clock = target;
    }

    /// The current virtual time, measured from lane creation.
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.state().clock
    }

    fn drain_ready(&self) {
        loop {
            let work = self.state().ready.pop_front();
            let Some(work) = work else {
                return;
            };
            work();
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("manual lane state poisoned")
    }
}

impl Lane for ManualLane {
    fn is_current(&self) -> bool {
        self.state()
            .pumping
            .is_some_and(|(id, _)| id == thread::current().id())
    }

    fn submit(&self, work: Work) {
        self.state().ready.push_back(work);
    }

    fn submit_after(&self, delay: Duration, work: Work) {
        let mut state = self.state();
        let deadline = state
            .clock
            .checked_add(delay)
            .expect("virtual deadline overflow");
        let seq = state.timer_seq;
        state.timer_seq = state.timer_seq.wrapping_add(1);
        state.timers.push(Reverse(TimerEntry {
            deadline,
            seq,
            work,
        }));
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for ManualLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualLane")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Marks the calling thread as the lane's pumping thread for the duration of
/// a pump call, allowing reentrant pumping from within work items.
struct PumpGuard<'a> {
    lane: &'a ManualLane,
}

impl<'a> PumpGuard<'a> {
    fn enter(lane: &'a ManualLane) -> Self {
        let current = thread::current().id();
        let mut state = lane.state();

        state.pumping = match state.pumping {
            None => Some((current, 1)),
            Some((id, depth)) if id == current => Some((id, depth.wrapping_add(1))),
            Some(_) => panic!("ManualLane pumped from two threads concurrently"),
        };

        drop(state);
        Self { lane }
    }
}

impl Drop for PumpGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lane.state();
        state.pumping = match state.pumping {
            Some((_, 1)) | None => None,
            Some((id, depth)) => Some((id, depth.wrapping_sub(1))),
        };
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::LaneHandle;

    assert_impl_all!(ManualLane: Send, Sync);

    #[test]
    fn nothing_runs_until_pumped() {
        let lane = ManualLane::new("test");
        let counter = Arc::new(AtomicUsize::new(0));

        let tally = Arc::clone(&counter);
        lane.submit(Box::new(move || {
            tally.fetch_add(1, Ordering::Relaxed);
        }));

        assert_eq!(counter.load(Ordering::Relaxed), 0);

        lane.run_until_idle();
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn work_submitted_by_work_runs_in_the_same_pump() {
        let lane = ManualLane::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let outer_seen = Arc::clone(&seen);
        let inner_lane = Arc::clone(&lane);
        lane.submit(Box::new(move || {
            outer_seen.lock().unwrap().push("outer");
            let inner_seen = Arc::clone(&outer_seen);
            inner_lane.submit(Box::new(move || {
                inner_seen.lock().unwrap().push("inner");
            }));
        }));

        lane.run_until_idle();
        assert_eq!(*seen.lock().unwrap(), vec!["outer", "inner"]);
    }

    #[test]
    fn is_current_only_while_pumping() {
        let lane = ManualLane::new("test");
        let observed = Arc::new(Mutex::new(None));

        assert!(!lane.is_current());

        let slot = Arc::clone(&observed);
        let probe: LaneHandle = Arc::clone(&lane) as LaneHandle;
        lane.submit(Box::new(move || {
            *slot.lock().unwrap() = Some(probe.is_current());
        }));
        lane.run_until_idle();

        assert_eq!(*observed.lock().unwrap(), Some(true));
        assert!(!lane.is_current());
    }

    #[test]
    fn advance_runs_timers_in_deadline_order() {
        let lane = ManualLane::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for (label, delay_ms) in [("c", 30), ("a", 10), ("b", 20)] {
            let seen = Arc::clone(&seen);
            lane.submit_after(
                Duration::from_millis(delay_ms),
                Box::new(move || seen.lock().unwrap().push(label)),
            );
        }

        lane.advance(Duration::from_millis(25));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);

        lane.advance(Duration::from_millis(5));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn simultaneous_deadlines_run_in_submission_order() {
        let lane = ManualLane::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            lane.submit_after(
                Duration::from_millis(10),
                Box::new(move || seen.lock().unwrap().push(label)),
            );
        }

        lane.advance(Duration::from_millis(10));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn delayed_work_scheduled_during_advance_is_honored_within_the_window() {
        let lane = ManualLane::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let chain_seen = Arc::clone(&seen);
        let chain_lane = Arc::clone(&lane);
        lane.submit_after(
            Duration::from_millis(10),
            Box::new(move || {
                chain_seen.lock().unwrap().push("first");
                let tail_seen = Arc::clone(&chain_seen);
                chain_lane.submit_after(
                    Duration::from_millis(10),
                    Box::new(move || tail_seen.lock().unwrap().push("chained")),
                );
            }),
        );

        lane.advance(Duration::from_millis(30));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "chained"]);
        assert_eq!(lane.clock(), Duration::from_millis(30));
    }

    #[test]
    fn clock_reports_virtual_time() {
        let lane = ManualLane::new("test");

        assert_eq!(lane.clock(), Duration::ZERO);
        lane.advance(Duration::from_secs(3));
        assert_eq!(lane.clock(), Duration::from_secs(3));
    }
}
