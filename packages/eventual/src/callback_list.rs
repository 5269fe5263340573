use ring_buffer::RingBuffer;

/// A continuation parked on a pending eventual. Running it may produce
/// follow-up continuations, e.g. when it completes a derived eventual that
/// has parked continuations of its own.
pub(crate) type Callback = Box<dyn FnOnce() -> CallbackList + Send + 'static>;

/// Holds zero, one or many continuations without allocating for the zero and
/// one cases, which are by far the most common: most eventuals have at most
/// one registrant.
///
/// The list is ephemeral: it accumulates while the owning eventual is
/// pending, is swapped out for an empty list at completion time, and is then
/// consumed by [`run()`][Self::run].
#[derive(Default)]
pub(crate) struct CallbackList {
    first: Option<Callback>,
    more: Option<RingBuffer<Callback>>,
}

/// The three shapes [`CallbackList::run`] distinguishes.
enum Shape {
    Empty,
    Single(Callback),
    Several(Option<Callback>, RingBuffer<Callback>),
}

impl CallbackList {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, callback: Callback) {
        if self.first.is_none() {
            self.first = Some(callback);
            return;
        }

        self.more
            .get_or_insert_with(|| RingBuffer::with_capacity(4))
            .push_back(callback);
    }

    /// Runs every continuation in the list, and transitively every follow-up
    /// continuation they produce, in FIFO order.
    ///
    /// The execution is trampolined: follow-ups are collected into an
    /// explicit work queue instead of being invoked recursively, so the stack
    /// depth stays constant no matter how long the continuation chain grows.
    /// While the chain stays simple - each continuation produces at most one
    /// follow-up - a scalar fast path avoids touching the queue at all.
    pub(crate) fn run(self) {
        let mut current = match self.into_shape() {
            Shape::Empty => return,
            Shape::Single(callback) => callback,
            Shape::Several(first, more) => return Self::run_queued(first, more),
        };

        loop {
            match current().into_shape() {
                Shape::Empty => return,
                Shape::Single(callback) => current = callback,
                Shape::Several(first, more) => return Self::run_queued(first, more),
            }
        }
    }

    /// The general drain: the multi-item follow-up list itself becomes the
    /// FIFO work queue. Pop the front, run it, append whatever it produces.
    fn run_queued(first: Option<Callback>, more: RingBuffer<Callback>) {
        let mut queue = more;
        if let Some(callback) = first {
            queue.push_front(callback);
        }

        while let Some(callback) = queue.pop_front() {
            callback().drain_into(&mut queue);
        }
    }

    fn into_shape(self) -> Shape {
        match (self.first, self.more) {
            (None, None) => Shape::Empty,
            (Some(callback), None) => Shape::Single(callback),
            (first, Some(more)) if more.is_empty() => match first {
                Some(callback) => Shape::Single(callback),
                None => Shape::Empty,
            },
            (first, Some(more)) => Shape::Several(first, more),
        }
    }

    fn drain_into(self, queue: &mut RingBuffer<Callback>) {
        if let Some(callback) = self.first {
            queue.push_back(callback);
        }
        if let Some(more) = self.more {
            for callback in more {
                queue.push_back(callback);
            }
        }
    }
}

impl std::fmt::Debug for CallbackList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = usize::from(self.first.is_some())
            .wrapping_add(self.more.as_ref().map_or(0, RingBuffer::len));

        f.debug_struct("CallbackList")
            .field("len", &count)
            .finish_non_exhaustive()
    }
}
