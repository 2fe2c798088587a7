//! Incremental positional statistics (count, mean, per-axis variance).
//!
//! Accumulation uses Welford's update, merging uses the pairwise form of
//! Chan et al., so statistics built per task can be combined in any grouping:
//!
//! ```text
//! n     = n_a + n_b
//! delta = mean_b - mean_a
//! mean  = mean_a + delta * n_b / n
//! M2    = M2_a + M2_b + delta² * n_a * n_b / n
//! ```
//!
//! Counts are fractional because [`RunningStatistics::decay`] scales them.

use glam::{DVec3, Vec3};

/// Running mean/variance accumulator over 3D positions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStatistics {
  count: f64,
  mean: DVec3,
  /// Sum of squared deviations from the mean, per axis.
  m2: DVec3,
}

impl RunningStatistics {
  /// Empty statistics.
  pub const EMPTY: Self = Self {
    count: 0.0,
    mean: DVec3::ZERO,
    m2: DVec3::ZERO,
  };

  /// Create empty statistics.
  pub fn new() -> Self {
    Self::EMPTY
  }

  /// Statistics over a set of positions.
  pub fn from_positions(positions: impl IntoIterator<Item = Vec3>) -> Self {
    let mut stats = Self::new();
    for p in positions {
      stats.add_sample(p);
    }
    stats
  }

  /// Reset to the empty state.
  pub fn clear(&mut self) {
    *self = Self::EMPTY;
  }

  /// Fold one position into the statistics.
  #[inline]
  pub fn add_sample(&mut self, position: Vec3) {
    let p = position.as_dvec3();
    self.count += 1.0;
    let delta = p - self.mean;
    self.mean += delta / self.count;
    self.m2 += delta * (p - self.mean);
  }

  /// Merge statistics of a disjoint sample set into `self`.
  pub fn merge(&mut self, other: &Self) {
    if other.count <= 0.0 {
      return;
    }
    if self.count <= 0.0 {
      *self = *other;
      return;
    }
    let count = self.count + other.count;
    let delta = other.mean - self.mean;
    self.mean += delta * (other.count / count);
    self.m2 += other.m2 + delta * delta * (self.count * other.count / count);
    self.count = count;
  }

  /// Return the merge of two statistics without modifying either.
  #[must_use]
  pub fn merged(mut self, other: &Self) -> Self {
    self.merge(other);
    self
  }

  /// Scale the effective sample count by `factor`.
  ///
  /// The mean is untouched and the squared-deviation sum is scaled with the
  /// count, so [`variance`](Self::variance) is unchanged while the weight of
  /// this evidence in later merges shrinks.
  pub fn decay(&mut self, factor: f32) {
    let factor = f64::from(factor);
    self.count *= factor;
    self.m2 *= factor;
  }

  /// Effective number of samples.
  #[inline]
  pub fn sample_count(&self) -> f64 {
    self.count
  }

  /// True when no samples have been accumulated.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.count <= 0.0
  }

  /// Running mean. Meaningless while [`is_empty`](Self::is_empty).
  #[inline]
  pub fn mean(&self) -> Vec3 {
    self.mean.as_vec3()
  }

  /// Per-axis population variance. Zero while empty.
  #[inline]
  pub fn variance(&self) -> Vec3 {
    if self.count <= 0.0 {
      return Vec3::ZERO;
    }
    (self.m2 / self.count).as_vec3()
  }

  /// Axis of largest variance; ties resolve to the lowest axis index.
  ///
  /// Returns `None` when no axis has a finite, positive variance (all
  /// samples coincide, or fewer than two samples).
  pub fn max_variance_axis(&self) -> Option<usize> {
    let variance = self.variance();
    let mut best: Option<usize> = None;
    for axis in 0..3 {
      let v = variance[axis];
      if !v.is_finite() || v <= 0.0 {
        continue;
      }
      match best {
        Some(b) if variance[b] >= v => {}
        _ => best = Some(axis),
      }
    }
    best
  }
}

#[cfg(test)]
#[path = "statistics_test.rs"]
mod statistics_test;
