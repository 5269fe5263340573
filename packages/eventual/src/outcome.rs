use std::error::Error;
use std::sync::Arc;

use thiserror::Error;

/// The error half of an [`Outcome`].
///
/// Every eventual carries one unified failure channel: timeouts, unwrap
/// failures and producer-supplied errors all flow through it as ordinary
/// errors. The `Arc` makes failures cheap to clone, which matters because a
/// failure fans out to every registered observer.
pub type Failure = Arc<dyn Error + Send + Sync + 'static>;

/// The resolved state of an eventual: a value or a [`Failure`].
pub type Outcome<T> = Result<T, Failure>;

/// Wraps a concrete error into the unified [`Failure`] channel.
///
/// # Example
///
/// ```rust
/// use std::io;
///
/// use eventual::failure;
///
/// let failure = failure(io::Error::new(io::ErrorKind::NotFound, "missing"));
/// assert!(failure.downcast_ref::<io::Error>().is_some());
/// ```
#[must_use]
#[inline]
pub fn failure<E: Error + Send + Sync + 'static>(error: E) -> Failure {
    Arc::new(error)
}

/// The deadline of a [`timeout()`][crate::Eventual::timeout] elapsed before
/// the source eventual completed.
#[derive(Debug, Error)]
#[error("deadline elapsed before completion")]
#[non_exhaustive]
pub struct DeadlineElapsed;

/// The [`Promise`][crate::Promise] for this eventual was dropped without ever
/// being completed, so no value can arrive anymore.
#[derive(Debug, Error)]
#[error("promise was dropped without being completed")]
#[non_exhaustive]
pub struct Abandoned;

/// An eventual `Option` resolved to `None` where a value was required.
#[derive(Debug, Error)]
#[error("expected a value but found none")]
#[non_exhaustive]
pub struct NoValue;

/// An eventual collection resolved to an empty collection where at least one
/// element was required.
#[derive(Debug, Error)]
#[error("collection contained no elements")]
#[non_exhaustive]
pub struct NoElements;
