//! Error types.

use std::collections::TryReserveError;

use thiserror::Error;

/// Invalid [`FieldConfig`](crate::FieldConfig) values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  #[error("max_samples_per_leaf must be greater than zero")]
  ZeroMaxSamples,
  #[error("min_samples_per_leaf ({min}) exceeds max_samples_per_leaf ({max})")]
  MinExceedsMax { min: usize, max: usize },
  #[error("max_depth must be at least 1")]
  ZeroMaxDepth,
  #[error("decay_on_split must lie in (0, 1], got {0}")]
  DecayOutOfRange(f32),
  #[error("stochastic_neighbors must be at least 1")]
  ZeroNeighbors,
}

/// Failure while growing the tree or the region storage. Aborts the pass.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("{what} capacity exceeded (limit {limit})")]
  CapacityExceeded { what: &'static str, limit: usize },
  #[error("allocation failed while growing {what}")]
  Allocation {
    what: &'static str,
    #[source]
    source: TryReserveError,
  },
  #[error("node {0} is not a leaf")]
  NotALeaf(u32),
  #[error("a build task panicked while holding the {0} lock")]
  Poisoned(&'static str),
}

/// Errors surfaced by [`Field`](crate::Field) operations.
#[derive(Debug, Error)]
pub enum FieldError {
  #[error("invalid configuration: {0}")]
  Config(#[from] ConfigError),
  #[error("spatial structure update aborted: {0}")]
  Build(#[from] BuildError),
  #[error("update_field called before build_field")]
  NotBuilt,
  #[error("failed to create worker pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
