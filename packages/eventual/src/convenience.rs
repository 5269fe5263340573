use std::error::Error;

use crate::eventual::Eventual;
use crate::outcome::{NoElements, NoValue, failure};

impl<T: Clone + Send + 'static> Eventual<T> {
    /// Falls back to another eventual when this one fails.
    ///
    /// The fallback's own outcome - including its failure, if it has one -
    /// becomes the result. When this eventual succeeds, the fallback is
    /// never consulted.
    #[must_use]
    pub fn or(&self, fallback: Self) -> Self {
        self.recover_with(move |_| fallback)
    }
}

impl<T: Clone + Send + 'static> Eventual<Option<T>> {
    /// Falls back to another eventual when this one succeeds with `None`.
    ///
    /// A failure on this eventual is a failure, not an empty value; it
    /// passes through without consulting the fallback.
    #[must_use]
    pub fn or_some(&self, fallback: Self) -> Self {
        let lane = lanes::LaneHandle::clone(self.lane());
        self.flat_map(move |value| match value {
            Some(_) => Eventual::succeeded(value, &lane),
            None => fallback,
        })
    }

    /// Unwraps the eventual `Option`, failing with `error` on `None`.
    #[must_use]
    pub fn some_or_fail(&self, error: impl Error + Send + Sync + 'static) -> Eventual<T> {
        self.try_map(move |value| value.ok_or_else(|| failure(error)))
    }

    /// Unwraps the eventual `Option`, failing with [`NoValue`] on `None`.
    #[must_use]
    pub fn some_or_missing(&self) -> Eventual<T> {
        self.some_or_fail(NoValue)
    }
}

impl<T: Clone + Send + 'static> Eventual<Vec<T>> {
    /// Reduces the eventual collection to its first element, failing with
    /// [`NoElements`] when the collection is empty.
    #[must_use]
    pub fn first_or_fail(&self) -> Eventual<T> {
        self.try_map(|values| {
            values
                .into_iter()
                .next()
                .ok_or_else(|| failure(NoElements))
        })
    }
}
