//! Index ranges into the caller's sample buffer.

use std::ops::Range;

/// Half-open `[start, end)` view into the sample buffer of one pass.
///
/// Only meaningful for the buffer (and the ordering of it) the pass that
/// produced it ran on; the next pass overwrites it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SampleRange {
  /// First sample index.
  pub start: usize,
  /// One past the last sample index.
  pub end: usize,
}

impl SampleRange {
  /// The empty range.
  pub const EMPTY: Self = Self { start: 0, end: 0 };

  /// Create a range.
  ///
  /// # Panics
  /// Debug-asserts that `start <= end`.
  pub fn new(start: usize, end: usize) -> Self {
    debug_assert!(start <= end, "SampleRange start must be <= end");
    Self { start, end }
  }

  /// Range of `len` samples starting at `start`.
  #[inline]
  pub fn from_offset(start: usize, len: usize) -> Self {
    Self {
      start,
      end: start + len,
    }
  }

  /// Number of samples.
  #[inline]
  pub fn len(&self) -> usize {
    self.end - self.start
  }

  /// True for an empty range.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.start >= self.end
  }

  /// Split at an offset relative to `start`.
  #[inline]
  pub fn split_at(&self, mid: usize) -> (Self, Self) {
    let pivot = (self.start + mid).min(self.end);
    (Self::new(self.start, pivot), Self::new(pivot, self.end))
  }

  /// The samples this range refers to, or `None` if it does not fit `samples`.
  #[inline]
  pub fn get<'a, S>(&self, samples: &'a [S]) -> Option<&'a [S]> {
    samples.get(self.as_range())
  }

  /// As a std range, for slicing.
  #[inline]
  pub fn as_range(&self) -> Range<usize> {
    self.start..self.end
  }
}

impl From<Range<usize>> for SampleRange {
  fn from(range: Range<usize>) -> Self {
    Self::new(range.start, range.end)
  }
}
