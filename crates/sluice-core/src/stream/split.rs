//! Lazy result cursors returned by the `iter` and `split` terminals.

use crate::{
    error::Error,
    pipeline::{Elements, Pipeline},
};
use std::{fmt, marker::PhantomData};
use tracing::warn;

// Prefix batches grow by this many elements per split.
const BATCH_UNIT: usize = 1 << 10;

const MAX_BATCH: usize = 1 << 25;

///
/// StreamIter
///
/// Owns the consumed pipeline so its close handlers run once the iterator
/// is dropped or closed.
///

pub struct StreamIter<E, T> {
    elements: Elements,
    pipeline: Pipeline<E>,
    _marker: PhantomData<fn() -> T>,
}

impl<E, T: 'static> StreamIter<E, T> {
    pub(crate) fn new(elements: Elements, pipeline: Pipeline<E>) -> Self {
        Self {
            elements,
            pipeline,
            _marker: PhantomData,
        }
    }

    /// Run the close handlers now instead of on drop.
    pub fn close(mut self) -> Result<(), Error> {
        self.pipeline.close()
    }
}

impl<E, T: 'static> Iterator for StreamIter<E, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.elements
            .by_ref()
            .find_map(|element| element.downcast::<T>().ok())
            .map(|value| *value)
    }
}

impl<E, T> Drop for StreamIter<E, T> {
    fn drop(&mut self) {
        if let Err(err) = self.pipeline.close() {
            warn!(error = %err, "closing stream iterator failed");
        }
    }
}

impl<E, T> fmt::Debug for StreamIter<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamIter")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

///
/// Split
///
/// Sequential cursor that can hand out prefixes of the remaining elements.
/// Each `try_split` buffers a larger batch than the one before.
///

pub struct Split<E, T> {
    iter: StreamIter<E, T>,
    batch: usize,
    exhausted: bool,
}

impl<E, T: 'static> Split<E, T> {
    pub(crate) const fn new(iter: StreamIter<E, T>) -> Self {
        Self {
            iter,
            batch: 0,
            exhausted: false,
        }
    }

    /// Feed the next element to `action`; false once the cursor is exhausted.
    pub fn try_advance(&mut self, action: impl FnOnce(T)) -> bool {
        if self.exhausted {
            return false;
        }

        match self.iter.next() {
            Some(value) => {
                action(value);
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    /// Feed every remaining element to `action`.
    pub fn for_each_remaining(&mut self, mut action: impl FnMut(T)) {
        while self.try_advance(&mut action) {}
    }

    /// Detach a prefix of the remaining elements, or `None` when nothing is
    /// left.
    pub fn try_split(&mut self) -> Option<Vec<T>> {
        if self.exhausted {
            return None;
        }

        self.batch = (self.batch + BATCH_UNIT).min(MAX_BATCH);
        let prefix: Vec<T> = self.iter.by_ref().take(self.batch).collect();
        if prefix.len() < self.batch {
            self.exhausted = true;
        }

        (!prefix.is_empty()).then_some(prefix)
    }

    /// Run the close handlers now instead of on drop.
    pub fn close(self) -> Result<(), Error> {
        self.iter.close()
    }
}

impl<E, T> fmt::Debug for Split<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Split")
            .field("iter", &self.iter)
            .field("batch", &self.batch)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
