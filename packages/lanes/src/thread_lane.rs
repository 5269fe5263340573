use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use tracing::trace;

use crate::timers::TimerEntry;
use crate::{Lane, Work};

/// What the lane hands to its worker thread.
enum Command {
    /// Run this as soon as all previously submitted work has finished.
    Run(Work),

    /// Hold this until the deadline passes, then run it.
    RunAfter { deadline: Instant, work: Work },

    /// Stop the worker. Work already in the queue ahead of this command still
    /// runs; held timers are discarded.
    Shutdown,
}

/// A lane backed by a dedicated worker thread.
///
/// The worker drains submitted work in submission order. Delayed work is held
/// in a deadline-ordered heap on the worker thread; when a deadline passes,
/// the work runs after whatever the lane is currently executing, with
/// simultaneous deadlines running in submission order.
///
/// # Shutdown
///
/// Dropping the last handle signals the worker to stop and joins it. Work
/// already queued at that point still runs; timers that have not come due are
/// discarded. If the last handle is dropped from the lane's own worker thread
/// (work items may hold lane handles), the join is skipped and the worker
/// winds down on its own.
///
/// # Example
///
/// ```rust
/// use std::sync::mpsc;
/// use std::time::Duration;
///
/// use lanes::{Lane, LaneHandle, ThreadLane};
///
/// let lane: LaneHandle = ThreadLane::new("example");
/// let (tx, rx) = mpsc::channel();
///
/// let delayed_tx = tx.clone();
/// lane.submit_after(
///     Duration::from_millis(10),
///     Box::new(move || delayed_tx.send("later").unwrap()),
/// );
/// lane.submit(Box::new(move || tx.send("first").unwrap()));
///
/// assert_eq!(rx.recv().unwrap(), "first");
/// assert_eq!(rx.recv().unwrap(), "later");
/// ```
#[derive(Debug)]
pub struct ThreadLane {
    label: String,
    sender: Sender<Command>,
    worker_thread: ThreadId,
    worker: Option<JoinHandle<()>>,
}

impl ThreadLane {
    /// Starts a new lane with a dedicated worker thread.
    ///
    /// The label names the worker thread and shows up in diagnostics.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to start the worker thread.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        let label = label.into();
        let (sender, receiver) = crossbeam::channel::unbounded();

        let worker_label = label.clone();
        let worker = thread::Builder::new()
            .name(label.clone())
            .spawn(move || worker_loop(&worker_label, &receiver))
            .expect("failed to spawn lane worker thread");

        let worker_thread = worker.thread().id();

        trace!(lane = %label, "lane started");

        Arc::new(Self {
            label,
            sender,
            worker_thread,
            worker: Some(worker),
        })
    }
}

impl Lane for ThreadLane {
    fn is_current(&self) -> bool {
        thread::current().id() == self.worker_thread
    }

    fn submit(&self, work: Work) {
        if self.sender.send(Command::Run(work)).is_err() {
            trace!(lane = %self.label, "submit to stopped lane; work dropped");
        }
    }

    fn submit_after(&self, delay: Duration, work: Work) {
        let deadline = Instant::now()
            .checked_add(delay)
            .expect("deadline does not fit the monotonic clock");

        if self
            .sender
            .send(Command::RunAfter { deadline, work })
            .is_err()
        {
            trace!(lane = %self.label, "delayed submit to stopped lane; work dropped");
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for ThreadLane {
    fn drop(&mut self) {
        // The queue is FIFO, so everything submitted before this still runs.
        drop(self.sender.send(Command::Shutdown));

        if let Some(worker) = self.worker.take() {
            if thread::current().id() == self.worker_thread {
                // A work item held the last handle. The worker cannot join
                // itself; it winds down once the current item returns.
                return;
            }

            drop(worker.join());
            trace!(lane = %self.label, "lane shut down");
        }
    }
}

fn worker_loop(label: &str, receiver: &Receiver<Command>) {
    let mut timers: BinaryHeap<Reverse<TimerEntry<Instant>>> = BinaryHeap::new();
    let mut timer_seq: u64 = 0;

    loop {
        run_due_timers(&mut timers);

        // Sleep on the queue until the next timer comes due, or forever when
        // no timer is held.
        let next_deadline = timers.peek().map(|Reverse(entry)| entry.deadline);
        let command = match next_deadline {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match receiver.recv_timeout(wait) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match receiver.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            Command::Run(work) => work(),
            Command::RunAfter { deadline, work } => {
                timers.push(Reverse(TimerEntry {
                    deadline,
                    seq: timer_seq,
                    work,
                }));
                timer_seq = timer_seq.wrapping_add(1);
            }
            Command::Shutdown => break,
        }
    }

    trace!(lane = %label, "worker exiting");
}

fn run_due_timers(timers: &mut BinaryHeap<Reverse<TimerEntry<Instant>>>) {
    loop {
        let due = timers
            .peek()
            .is_some_and(|Reverse(entry)| entry.deadline <= Instant::now());
        if !due {
            return;
        }

        if let Some(Reverse(entry)) = timers.pop() {
            (entry.work)();
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Mutex;
    use std::sync::mpsc;

    use static_assertions::assert_impl_all;
    use testing::with_watchdog;

    use super::*;
    use crate::LaneHandle;

    assert_impl_all!(ThreadLane: Send, Sync);

    #[test]
    fn work_runs_on_the_worker_thread() {
        with_watchdog(|| {
            let lane: LaneHandle = ThreadLane::new("unit");
            let (tx, rx) = mpsc::channel();

            assert!(!lane.is_current());

            let probe = LaneHandle::clone(&lane);
            lane.submit(Box::new(move || {
                tx.send(probe.is_current()).unwrap();
            }));

            assert!(rx.recv().unwrap());
        });
    }

    #[test]
    fn work_runs_in_submission_order() {
        with_watchdog(|| {
            let lane: LaneHandle = ThreadLane::new("unit");
            let seen = Arc::new(Mutex::new(Vec::new()));
            let (tx, rx) = mpsc::channel();

            for value in 0..100 {
                let seen = Arc::clone(&seen);
                let tx = tx.clone();
                lane.submit(Box::new(move || {
                    seen.lock().unwrap().push(value);
                    if value == 99 {
                        tx.send(()).unwrap();
                    }
                }));
            }

            rx.recv().unwrap();
            assert_eq!(*seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
        });
    }

    #[test]
    fn delayed_work_runs_in_deadline_order() {
        with_watchdog(|| {
            let lane: LaneHandle = ThreadLane::new("unit");
            let (tx, rx) = mpsc::channel();

            let late_tx = tx.clone();
            lane.submit_after(
                Duration::from_millis(40),
                Box::new(move || late_tx.send("late").unwrap()),
            );
            lane.submit_after(
                Duration::from_millis(5),
                Box::new(move || tx.send("early").unwrap()),
            );

            assert_eq!(rx.recv().unwrap(), "early");
            assert_eq!(rx.recv().unwrap(), "late");
        });
    }

    #[test]
    fn drop_runs_already_queued_work() {
        with_watchdog(|| {
            let lane: LaneHandle = ThreadLane::new("unit");
            let (tx, rx) = mpsc::channel();

            lane.submit(Box::new(move || {
                tx.send(()).unwrap();
            }));
            drop(lane);

            // Queued ahead of the shutdown command, so it must have run.
            rx.recv().unwrap();
        });
    }

    #[test]
    fn dropping_last_handle_from_own_worker_does_not_deadlock() {
        with_watchdog(|| {
            let lane: LaneHandle = ThreadLane::new("unit");
            let (tx, rx) = mpsc::channel();

            let inner = LaneHandle::clone(&lane);
            drop(lane);
            // `inner` is now the last handle and dies inside a work item.
            let probe = tx.clone();
            inner.submit(Box::new(move || {
                probe.send(()).unwrap();
            }));
            let own_goal = LaneHandle::clone(&inner);
            inner.submit(Box::new(move || {
                drop(own_goal);
                tx.send(()).unwrap();
            }));
            drop(inner);

            rx.recv().unwrap();
            rx.recv().unwrap();
        });
    }
}
