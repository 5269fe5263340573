#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Serial execution lanes: strictly ordered, single-threaded work queues.
//!
//! A [`Lane`] executes submitted work items one at a time, in submission
//! order, never overlapping with itself. Code that confines a piece of
//! mutable state to one lane therefore needs no locks: the lane itself is the
//! mutual exclusion. The [`eventual`](https://docs.rs/eventual) package builds
//! its whole completion protocol on this discipline.
//!
//! Three things live here:
//!
//! * The [`Lane`] trait and [`LaneHandle`] alias - the contract consumed by
//!   lane-confined code: [`Lane::is_current()`], [`Lane::submit()`] and
//!   [`Lane::submit_after()`].
//! * [`ThreadLane`] - a lane backed by a dedicated worker thread, with
//!   deadline-ordered timers for delayed submission.
//! * Process-wide default lanes, [`foreground()`] and [`background()`] -
//!   lazily started singletons referenced by identity.
//!
//! With the `fakes` feature enabled there is also `ManualLane`, a
//! deterministic lane that executes nothing until explicitly pumped and keeps
//! a virtual clock, for tests that must not depend on real time.
//!
//! # Example
//!
//! ```rust
//! use std::sync::mpsc;
//!
//! use lanes::{Lane, LaneHandle, ThreadLane};
//!
//! let lane: LaneHandle = ThreadLane::new("worker");
//! let (done_tx, done_rx) = mpsc::channel();
//!
//! lane.submit(Box::new(move || {
//!     done_tx.send("ran on the lane").unwrap();
//! }));
//!
//! assert_eq!(done_rx.recv().unwrap(), "ran on the lane");
//! ```

mod defaults;
mod lane;
#[cfg(feature = "fakes")]
mod manual_lane;
mod thread_lane;
mod timers;

pub use defaults::*;
pub use lane::*;
#[cfg(feature = "fakes")]
pub use manual_lane::*;
pub use thread_lane::*;
