#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests in Quayside packages.

use std::panic;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// How long a watchdogged test may run before it is declared hung.
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a test with a timeout so a wedged cross-thread test cannot hang the
/// whole suite.
///
/// The test body runs on its own thread. If it neither finishes nor panics
/// within the timeout, the watchdog panics on the test's behalf; a panic in
/// the body is re-thrown on the calling thread so the test fails normally.
///
/// # Panics
///
/// Panics when the test exceeds the timeout, and re-raises any panic from
/// the test body.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let result = with_watchdog(|| 2 + 2);
/// assert_eq!(result, 4);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (done_tx, done_rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        let result = test_fn();
        // A send failure means the watchdog already gave up on us.
        drop(done_tx.send(()));
        result
    });

    match done_rx.recv_timeout(WATCHDOG_TIMEOUT) {
        Ok(()) => match worker.join() {
            Ok(result) => result,
            Err(panic) => panic::resume_unwind(panic),
        },
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            // The body panicked before signaling; surface that panic.
            match worker.join() {
                Ok(result) => result,
                Err(panic) => panic::resume_unwind(panic),
            }
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded the {WATCHDOG_TIMEOUT:?} watchdog timeout");
        }
    }
}
