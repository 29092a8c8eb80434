//! Fixed-size batching over an ordered record sequence.

use crate::error::DomainValidatorError;

/// Lazy, single-pass sequence of fixed-size chunks.
///
/// Every chunk holds exactly `batch_size` items except possibly the last one.
/// Chunks are produced in source order, never overlap and never skip items.
/// The sequence cannot be restarted; build a new `Batches` for another pass.
pub struct Batches<I: Iterator> {
    items: std::iter::Peekable<I>,
    batch_size: usize,
}

impl<I: Iterator> Batches<I> {
    /// Split `items` into chunks of `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `batch_size` is zero.
    pub fn new<T>(items: T, batch_size: usize) -> Result<Self, DomainValidatorError>
    where
        T: IntoIterator<IntoIter = I>,
    {
        if batch_size == 0 {
            return Err(DomainValidatorError::invalid_argument(
                "batch_size",
                "must be at least 1",
            ));
        }
        Ok(Self {
            items: items.into_iter().peekable(),
            batch_size,
        })
    }

    /// Whether another chunk is available.
    pub fn has_next(&mut self) -> bool {
        self.items.peek().is_some()
    }

    /// Take the next chunk.
    ///
    /// # Errors
    ///
    /// Returns `BatchesExhausted` once every item has been handed out.
    pub fn next_batch(&mut self) -> Result<Vec<I::Item>, DomainValidatorError> {
        if !self.has_next() {
            return Err(DomainValidatorError::BatchesExhausted);
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.items.next() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        Ok(batch)
    }
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().ok()
    }
}

/// Convenience constructor mirroring [`Batches::new`].
pub fn batches<T: IntoIterator>(
    items: T,
    batch_size: usize,
) -> Result<Batches<T::IntoIter>, DomainValidatorError> {
    Batches::new(items, batch_size)
}
