//! guiding_field - Adaptive spatial subdivision for path guiding
//!
//! Partitions a scene volume into regions with a binary space partition that
//! is built from, and incrementally refined by, batches of radiance samples.
//! Each region carries positional statistics and a model fitted from the
//! samples that landed in it; renderers look up the region covering a shading
//! point to guide direction sampling.
//!
//! # Features
//!
//! - **Statistics-driven splits**: a leaf splits at the mean of its highest
//!   variance axis once its accumulated plus incoming samples exceed a
//!   threshold
//! - **Incremental updates**: later batches descend the existing tree and
//!   only refine it; region identities stay stable
//! - **Fork-join construction**: rayon tasks per subtree, in-place sample
//!   partitioning, optional bit-reproducible mode
//! - **Stochastic lookup**: optional k-nearest region selection to hide cell
//!   boundaries
//!
//! # Example
//!
//! ```ignore
//! use guiding_field::{Aabb3, DirectionalSample, Field, FieldConfig, NoModel};
//!
//! let mut field = Field::new(FieldConfig::default(), NoModel)?;
//! let report = field.build_field(Aabb3::UNIT, &mut samples)?;
//! field.add_training_iteration(4);
//!
//! let mut rng = rand::rng();
//! if let Some(region) = field.get_guiding_region(hit_point, &mut rng) {
//!     // guide with region.model()
//! }
//! ```

pub mod bounds;
pub mod config;
pub mod error;
pub mod range;
pub mod sample;
pub mod sampler;
pub mod statistics;

// Re-export commonly used items
pub use bounds::Aabb3;
pub use config::FieldConfig;
pub use error::{BuildError, ConfigError, FieldError};
pub use range::SampleRange;
pub use sample::{DirectionalSample, SpatialSample};
pub use sampler::{FixedSampler, Sampler};
pub use statistics::RunningStatistics;

// Spatial tree and its builder
pub mod tree;
pub use tree::{BuildOutcome, SpatialTree, TreeBuilder};

// Regions and model fitting
pub mod fitter;
pub mod region;
pub use fitter::{FitFailure, NoModel, RegionFitter};
pub use region::{Region, RegionId, RegionStorage};

// Nearest-region index for stochastic lookup
pub mod search;
pub use search::RegionSearchTree;

// Worker pool selection
pub mod threading;
pub use threading::WorkerPool;

// Guiding field facade
pub mod field;
pub use field::{Field, PassReport};

#[cfg(test)]
pub(crate) mod test_utils;
