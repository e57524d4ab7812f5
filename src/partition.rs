use serde::Serialize;
use std::ops::Range;

/// Contiguous range of document indices dispatched as one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Batch {
    /// First index (inclusive)
    pub lo: usize,
    /// Last index (exclusive)
    pub hi: usize,
}

impl Batch {
    /// Creates a batch covering `[lo, hi)`.
    #[must_use]
    pub const fn new(lo: usize, hi: usize) -> Self {
        Self { lo, hi }
    }

    /// Number of documents in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.hi - self.lo
    }

    /// Returns true if the batch holds no indices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.hi <= self.lo
    }

    /// Iterates the document indices in ascending order.
    #[must_use]
    pub const fn indices(&self) -> Range<usize> {
        self.lo..self.hi
    }
}

/// Splits `num_documents` into ascending, contiguous batches of `batch_size`.
///
/// The result depends only on its arguments, so an interrupted run and its
/// resume see the same batches. The last batch may be shorter; zero documents
/// yield zero batches.
///
/// # Panics
///
/// Panics if `batch_size` is zero. [`GenerationConfig`](crate::GenerationConfig)
/// validation rejects that value before a run starts.
#[must_use]
pub fn partition(num_documents: usize, batch_size: usize) -> Vec<Batch> {
    assert!(batch_size > 0, "batch_size must be greater than 0");

    (0..num_documents)
        .step_by(batch_size)
        .map(|lo| Batch::new(lo, lo.saturating_add(batch_size).min(num_documents)))
        .collect()
}

/// Groups consecutive batches into dispatch units of up to `chunksize` batches.
pub(crate) fn dispatch_chunks(batches: &[Batch], chunksize: usize) -> Vec<Vec<Batch>> {
    batches
        .chunks(chunksize.max(1))
        .map(<[Batch]>::to_vec)
        .collect()
}
