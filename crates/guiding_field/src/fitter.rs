//! Region model fitting hook.
//!
//! The field does not know what a region's directional model looks like; it
//! hands each touched region's statistics and samples to a [`RegionFitter`]
//! once per pass and stores whatever model comes back.

use std::convert::Infallible;

use crate::region::RegionId;
use crate::statistics::RunningStatistics;

/// Strategy fitting a per-region model from the samples a region received.
///
/// Called from worker threads, one call per touched region per pass.
pub trait RegionFitter<S>: Send + Sync {
  /// Model stored in each region.
  type Model: Clone + Send + Sync;
  /// Fit failure. Failures are reported, never fatal: the region keeps its
  /// previous model.
  type Error: std::fmt::Display + Send;

  /// Fit a model from scratch.
  fn fit(&self, statistics: &RunningStatistics, samples: &[S]) -> Result<Self::Model, Self::Error>;

  /// Update an existing model with a new batch. Defaults to a fresh fit.
  fn refit(
    &self,
    existing: &Self::Model,
    statistics: &RunningStatistics,
    samples: &[S],
  ) -> Result<Self::Model, Self::Error> {
    let _ = existing;
    self.fit(statistics, samples)
  }
}

/// A region whose (re)fit failed during a pass. The region kept its
/// previous model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FitFailure {
  /// Region whose fit failed.
  pub region: RegionId,
  /// Fitter error, rendered with `Display`.
  pub message: String,
}

/// Fitter for callers that only need the spatial subdivision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoModel;

impl<S> RegionFitter<S> for NoModel {
  type Model = ();
  type Error = Infallible;

  fn fit(&self, _statistics: &RunningStatistics, _samples: &[S]) -> Result<(), Infallible> {
    Ok(())
  }
}
