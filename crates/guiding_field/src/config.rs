//! FieldConfig - split thresholds, lookup mode and worker settings.

use std::fmt;

use crate::error::ConfigError;

/// Configuration for the spatial subdivision and region lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FieldConfig {
  /// Accumulated samples a region needs before its model is (re)fitted.
  pub min_samples_per_leaf: usize,

  /// A leaf splits once its accumulated plus incoming samples exceed this.
  pub max_samples_per_leaf: usize,

  /// Maximum tree depth (root = 1). Leaves at this depth never split.
  pub max_depth: u32,

  /// Pick regions stochastically among the nearest region centers instead
  /// of by exact tree descent.
  pub use_stochastic_lookup: bool,

  /// Number of nearest region centers the stochastic lookup chooses from.
  pub stochastic_neighbors: usize,

  /// Canonicalize sample order so identical inputs give identical trees.
  pub deterministic: bool,

  /// Statistics decay applied to a region when its leaf splits.
  pub decay_on_split: f32,

  /// Worker threads for build/update passes (0 = rayon's global pool).
  pub num_threads: usize,
}

impl FieldConfig {
  /// Defaults used by the renderer integration.
  pub const DEFAULT: Self = Self {
    min_samples_per_leaf: 100,
    max_samples_per_leaf: 32_000,
    max_depth: 32,
    use_stochastic_lookup: false,
    stochastic_neighbors: 4,
    deterministic: false,
    decay_on_split: 0.25,
    num_threads: 0,
  };

  /// Defaults with deterministic ordering enabled.
  pub const DETERMINISTIC: Self = Self {
    deterministic: true,
    ..Self::DEFAULT
  };

  /// Check value ranges.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.max_samples_per_leaf == 0 {
      return Err(ConfigError::ZeroMaxSamples);
    }
    if self.min_samples_per_leaf > self.max_samples_per_leaf {
      return Err(ConfigError::MinExceedsMax {
        min: self.min_samples_per_leaf,
        max: self.max_samples_per_leaf,
      });
    }
    if self.max_depth == 0 {
      return Err(ConfigError::ZeroMaxDepth);
    }
    if !(self.decay_on_split > 0.0 && self.decay_on_split <= 1.0) {
      return Err(ConfigError::DecayOutOfRange(self.decay_on_split));
    }
    if self.stochastic_neighbors == 0 {
      return Err(ConfigError::ZeroNeighbors);
    }
    Ok(())
  }

  /// Estimated number of leaves a build over `sample_count` samples produces.
  #[inline]
  pub fn estimated_leaf_count(&self, sample_count: usize) -> usize {
    sample_count.saturating_mul(2) / self.max_samples_per_leaf.max(1) + 32
  }
}

impl Default for FieldConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

impl fmt::Display for FieldConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "FieldConfig:")?;
    writeln!(f, "  min_samples_per_leaf: {}", self.min_samples_per_leaf)?;
    writeln!(f, "  max_samples_per_leaf: {}", self.max_samples_per_leaf)?;
    writeln!(f, "  max_depth: {}", self.max_depth)?;
    writeln!(f, "  use_stochastic_lookup: {}", self.use_stochastic_lookup)?;
    writeln!(f, "  stochastic_neighbors: {}", self.stochastic_neighbors)?;
    writeln!(f, "  deterministic: {}", self.deterministic)?;
    writeln!(f, "  decay_on_split: {}", self.decay_on_split)?;
    write!(f, "  num_threads: {}", self.num_threads)
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
