use std::sync::{Arc, OnceLock};

use crate::{LaneHandle, ThreadLane};

static FOREGROUND: OnceLock<Arc<ThreadLane>> = OnceLock::new();
static BACKGROUND: OnceLock<Arc<ThreadLane>> = OnceLock::new();

/// The process-wide foreground lane, for latency-sensitive work.
///
/// Started on first use and never shut down. Every call returns a handle to
/// the same lane, so handles from different call sites compare equal under
/// [`same_lane()`][crate::same_lane].
///
/// # Example
///
/// ```rust
/// use lanes::{foreground, same_lane};
///
/// let a = foreground();
/// let b = foreground();
///
/// assert!(same_lane(&a, &b));
/// ```
#[must_use]
pub fn foreground() -> LaneHandle {
    singleton(&FOREGROUND, "foreground")
}

/// The process-wide background lane, for work that can wait.
///
/// Started on first use and never shut down. Distinct from [`foreground()`];
/// the two singletons are the only lanes this package starts on its own.
#[must_use]
pub fn background() -> LaneHandle {
    singleton(&BACKGROUND, "background")
}

fn singleton(slot: &OnceLock<Arc<ThreadLane>>, label: &str) -> LaneHandle {
    let lane = slot.get_or_init(|| ThreadLane::new(label));
    Arc::clone(lane) as LaneHandle
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::same_lane;

    #[test]
    fn singletons_are_stable_and_distinct() {
        assert!(same_lane(&foreground(), &foreground()));
        assert!(same_lane(&background(), &background()));
        assert!(!same_lane(&foreground(), &background()));
    }
}
