//! A small two-lane pipeline: a simulated fetch on an IO lane, processing on
//! a compute lane, a fan-in, and a deadline.

use std::time::Duration;

use eventual::{Eventual, Promise};
use futures::executor::block_on;
use lanes::{Lane, LaneHandle, ThreadLane};

fn main() {
    let io: LaneHandle = ThreadLane::new("io");
    let compute: LaneHandle = ThreadLane::new("compute");

    // A fetch that delivers on the IO lane after a little while.
    let (fetch_promise, fetched) = Promise::pair(&io);
    io.submit_after(
        Duration::from_millis(30),
        Box::new(move || fetch_promise.succeed("the quick brown fox".to_string())),
    );

    // Process on the compute lane, then pair with a second source.
    let compute_handle = LaneHandle::clone(&compute);
    let word_count = fetched
        .hop_to(&compute)
        .map(|text| text.split_whitespace().count())
        .flat_map(move |count| Eventual::succeeded(count * 10, &compute_handle));

    let score = word_count.and(&Eventual::succeeded("score", &compute));

    let (value, label) = block_on(score.into_future()).expect("pipeline failed");
    println!("{label}: {value}");

    // A deadline on a source that never delivers.
    let (_abandoned_promise, silence) = Promise::<u32>::pair(&io);
    let bounded = silence.timeout(Duration::from_millis(50));

    match block_on(bounded.into_future()) {
        Ok(value) => println!("unexpected value: {value}"),
        Err(error) => println!("timed out as expected: {error}"),
    }
}
