#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Lane-confined future/promise primitives.
//!
//! An [`Eventual<T>`] is the read handle to an asynchronous result; the
//! matching [`Promise<T>`] completes it exactly once. Both sides are bound to
//! a serial execution [lane][lanes::Lane], and every state change happens on
//! that lane - which is the whole concurrency model: no locks, no atomics in
//! the completion protocol, just strictly serialized work items. Anything
//! running elsewhere reaches the state by submitting to the lane.
//!
//! # The shape of the thing
//!
//! * Completion is monotonic. An eventual goes from pending to completed at
//!   most once; the first completion wins and every later attempt is silently
//!   ignored, from any thread. Racing a real result against a synthetic one
//!   (see [`timeout()`][Eventual::timeout]) is therefore safe by design.
//! * Observation is multi-party. Any number of observers may register; they
//!   run on the eventual's lane, in registration order, whether they arrived
//!   before or after completion. Values reach them by clone.
//! * Continuation dispatch is trampolined. Completing one eventual often
//!   completes a chain of derived eventuals; the dispatcher drains that chain
//!   through an explicit FIFO instead of recursing, so a chain of a hundred
//!   thousand [`map()`][Eventual::map] links completes on a constant stack.
//! * Combinators cover transform ([`map()`][Eventual::map],
//!   [`try_map()`][Eventual::try_map], [`flat_map()`][Eventual::flat_map],
//!   [`recover()`][Eventual::recover], ...), fan-in
//!   ([`and()`][Eventual::and], [`gather()`][Eventual::gather]), lane
//!   bridging ([`hop_to()`][Eventual::hop_to],
//!   [`cascade_into()`][Eventual::cascade_into]) and deadlines
//!   ([`timeout()`][Eventual::timeout]).
//! * There is no cancellation. A timeout only races a second outcome; the
//!   original work keeps running and its late result is discarded.
//!
//! Failures travel a single unified channel: [`Outcome<T>`] is a `Result`
//! whose error side, [`Failure`], is a cheaply-cloneable `Arc`-wrapped error.
//! Fan-in combinators propagate only the first failure they observe; the
//! outcomes of the other branches are discarded without a diagnostic.
//!
//! # Example
//!
//! ```rust
//! use eventual::{Eventual, Promise};
//! use futures::executor::block_on;
//! use lanes::ThreadLane;
//!
//! let lane: lanes::LaneHandle = ThreadLane::new("worker");
//!
//! let (promise, loaded) = Promise::pair(&lane);
//!
//! let greeting = loaded
//!     .map(|name: String| format!("hello, {name}"))
//!     .and(&Eventual::succeeded(42, &lane));
//!
//! promise.succeed("world".to_string());
//!
//! let (text, number) = block_on(greeting.into_future()).unwrap();
//! assert_eq!(text, "hello, world");
//! assert_eq!(number, 42);
//! ```

mod bridge;
mod callback_list;
mod convenience;
mod core;
mod deadline;
mod eventual;
mod fan_in;
mod outcome;
mod promise;
mod std_future;
mod transform;

pub use eventual::*;
pub use outcome::*;
pub use promise::*;
pub use std_future::*;
