//! Field - the guiding structure as seen by the renderer.
//!
//! Owns the spatial tree, the region storage, the optional region search
//! index and the worker pool, and sequences a pass:
//!
//! ```text
//!   build_field / update_field
//!     ├─ TreeBuilder::build / update   split leaves, record sample ranges
//!     ├─ fit_regions                   merge pass statistics, (re)fit models
//!     └─ rebuild_search_index          stochastic lookup only
//! ```
//!
//! Passes take `&mut self`, lookups take `&self`, so lookups never observe a
//! pass in progress.

use std::marker::PhantomData;

use rayon::prelude::*;
use web_time::Instant;

use crate::bounds::Aabb3;
use crate::config::FieldConfig;
use crate::error::{BuildError, FieldError};
use crate::fitter::{FitFailure, RegionFitter};
use crate::region::{Region, RegionId, RegionStorage};
use crate::sample::SpatialSample;
use crate::sampler::Sampler;
use crate::search::RegionSearchTree;
use crate::threading::WorkerPool;
use crate::tree::{BuildOutcome, SpatialTree, TreeBuilder};

/// Summary of one `build_field` / `update_field` pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassReport {
  /// Samples in the batch.
  pub samples: usize,
  /// Leaves split during the pass.
  pub splits: usize,
  /// Tree nodes after the pass.
  pub node_count: usize,
  /// Regions after the pass.
  pub region_count: usize,
  /// Regions whose model was (re)fitted.
  pub fitted: usize,
  /// Regions whose fit failed; they kept their previous model.
  pub fit_failures: Vec<FitFailure>,
  /// Wall time of the pass in microseconds.
  pub elapsed_us: u64,
}

/// Adaptive spatial subdivision with one learned model per region.
pub struct Field<S, F: RegionFitter<S>> {
  config: FieldConfig,
  fitter: F,
  builder: TreeBuilder,
  workers: WorkerPool,
  tree: SpatialTree,
  regions: RegionStorage<F::Model>,
  search: Option<RegionSearchTree>,
  iteration: u32,
  total_spp: u32,
  built: bool,
  _samples: PhantomData<fn(&mut [S])>,
}

impl<S: SpatialSample, F: RegionFitter<S>> Field<S, F> {
  /// Validate `config` and create an unbuilt field.
  pub fn new(config: FieldConfig, fitter: F) -> Result<Self, FieldError> {
    config.validate()?;
    let workers = WorkerPool::new(config.num_threads)?;
    tracing::debug!(config = %config, threads = workers.num_threads(), "guiding field created");
    Ok(Self {
      config,
      fitter,
      builder: TreeBuilder::new(),
      workers,
      tree: SpatialTree::new(Aabb3::UNIT),
      regions: RegionStorage::new(),
      search: None,
      iteration: 0,
      total_spp: 0,
      built: false,
      _samples: PhantomData,
    })
  }

  /// Replace the tree builder, e.g. to change its parallel grain.
  pub fn with_builder(mut self, builder: TreeBuilder) -> Self {
    self.builder = builder;
    self
  }

  /// Discard all learned state and build the structure from scratch over
  /// `bounds`. Resets the iteration and samples-per-pixel counters.
  ///
  /// `samples` is reordered in place.
  #[tracing::instrument(skip_all, name = "field::build_field", fields(samples = samples.len()))]
  pub fn build_field(&mut self, bounds: Aabb3, samples: &mut [S]) -> Result<PassReport, FieldError> {
    self.iteration = 0;
    self.total_spp = 0;
    self.built = false;
    self.search = None;
    let report = self.run_pass(Some(bounds), samples)?;
    self.built = true;
    Ok(report)
  }

  /// Refine the structure with a new batch and refit touched regions.
  ///
  /// An empty batch changes nothing. On error the tree and regions are left
  /// as they were before the call.
  #[tracing::instrument(skip_all, name = "field::update_field", fields(samples = samples.len()))]
  pub fn update_field(&mut self, samples: &mut [S]) -> Result<PassReport, FieldError> {
    if !self.built {
      return Err(FieldError::NotBuilt);
    }
    if samples.is_empty() {
      return Ok(self.report(BuildOutcome::default(), 0, Vec::new(), 0));
    }
    self.run_pass(None, samples)
  }

  fn run_pass(&mut self, bounds: Option<Aabb3>, samples: &mut [S]) -> Result<PassReport, FieldError> {
    let start = Instant::now();
    let Self {
      config,
      fitter,
      builder,
      workers,
      tree,
      regions,
      ..
    } = self;

    let (outcome, fitted, failures) = workers.install(|| -> Result<_, BuildError> {
      let outcome = match bounds {
        Some(bounds) => builder.build(tree, bounds, samples, regions, config)?,
        None => builder.update(tree, samples, regions, config)?,
      };
      let (fitted, failures) = fit_regions(&*fitter, regions, samples, config);
      Ok((outcome, fitted, failures))
    })?;

    for failure in &failures {
      tracing::warn!(
        region = failure.region.0,
        error = %failure.message,
        "region fit failed, keeping previous model"
      );
    }

    if self.config.use_stochastic_lookup {
      self.rebuild_search_index();
    }

    let elapsed_us = start.elapsed().as_micros() as u64;
    let report = self.report(outcome, fitted, failures, elapsed_us);
    tracing::debug!(
      samples = report.samples,
      splits = report.splits,
      nodes = report.node_count,
      regions = report.region_count,
      fitted = report.fitted,
      failures = report.fit_failures.len(),
      elapsed_us,
      "guiding field pass complete"
    );
    Ok(report)
  }

  fn report(
    &self,
    outcome: BuildOutcome,
    fitted: usize,
    fit_failures: Vec<FitFailure>,
    elapsed_us: u64,
  ) -> PassReport {
    PassReport {
      samples: outcome.samples,
      splits: outcome.splits,
      node_count: self.tree.node_count(),
      region_count: self.regions.len(),
      fitted,
      fit_failures,
      elapsed_us,
    }
  }

  /// Index every leaf's region at its sample mean, or at the leaf center
  /// when the region has no samples yet.
  fn rebuild_search_index(&mut self) {
    let _span = tracing::info_span!("rebuild_search_index").entered();
    let regions = &self.regions;
    let centers = self.tree.leaves().map(|leaf| {
      let id = RegionId(leaf.data_index);
      let center = regions
        .get(id)
        .map(Region::statistics)
        .filter(|stats| !stats.is_empty())
        .map_or_else(|| leaf.bounds.center(), |stats| stats.mean());
      (center, id)
    });
    self.search = Some(RegionSearchTree::build(centers));
  }

  /// Record a finished training iteration that consumed `spp` samples per
  /// pixel.
  pub fn add_training_iteration(&mut self, spp: u32) {
    self.total_spp = self.total_spp.saturating_add(spp);
    self.iteration = self.iteration.saturating_add(1);
  }

  /// Completed training iterations since the last build.
  #[inline]
  pub fn iteration(&self) -> u32 {
    self.iteration
  }

  /// Samples per pixel consumed since the last build.
  #[inline]
  pub fn total_samples_per_pixel(&self) -> u32 {
    self.total_spp
  }

  /// Region guiding at `position`.
  ///
  /// `None` before the first training iteration and outside the field
  /// bounds. With stochastic lookup one variate is drawn from `sampler`.
  pub fn get_guiding_region(
    &self,
    position: glam::Vec3,
    sampler: &mut impl Sampler,
  ) -> Option<&Region<F::Model>> {
    let id = self.locate_region(position, sampler)?;
    self.regions.get(id)
  }

  /// Id of the region guiding at `position`, see
  /// [`get_guiding_region`](Self::get_guiding_region).
  pub fn locate_region(&self, position: glam::Vec3, sampler: &mut impl Sampler) -> Option<RegionId> {
    if !self.built || self.iteration == 0 || !self.tree.bounds().contains_point(position) {
      return None;
    }
    match &self.search {
      Some(search) if self.config.use_stochastic_lookup => {
        search.sample_nearest(position, sampler.next_1d(), self.config.stochastic_neighbors)
      }
      _ => Some(RegionId(self.tree.locate(position).data_index)),
    }
  }

  /// Region by id.
  #[inline]
  pub fn region(&self, id: RegionId) -> Option<&Region<F::Model>> {
    self.regions.get(id)
  }

  #[inline]
  pub fn region_count(&self) -> usize {
    self.regions.len()
  }

  #[inline]
  pub fn node_count(&self) -> usize {
    self.tree.node_count()
  }

  /// Bounds passed to the last `build_field`.
  #[inline]
  pub fn bounds(&self) -> Aabb3 {
    self.tree.bounds()
  }

  #[inline]
  pub fn is_built(&self) -> bool {
    self.built
  }

  #[inline]
  pub fn tree(&self) -> &SpatialTree {
    &self.tree
  }

  #[inline]
  pub fn regions(&self) -> &RegionStorage<F::Model> {
    &self.regions
  }

  #[inline]
  pub fn config(&self) -> &FieldConfig {
    &self.config
  }

  #[inline]
  pub fn fitter(&self) -> &F {
    &self.fitter
  }

  #[cfg(test)]
  pub(crate) fn tree_mut(&mut self) -> &mut SpatialTree {
    &mut self.tree
  }

  #[cfg(test)]
  pub(crate) fn regions_mut(&mut self) -> &mut RegionStorage<F::Model> {
    &mut self.regions
  }
}

/// Fold each touched region's pass statistics into its accumulated
/// statistics, then fit or refit regions with enough evidence.
///
/// Returns the number of fitted regions and the failures.
fn fit_regions<S: SpatialSample, F: RegionFitter<S>>(
  fitter: &F,
  regions: &mut RegionStorage<F::Model>,
  samples: &[S],
  config: &FieldConfig,
) -> (usize, Vec<FitFailure>) {
  let _span = tracing::info_span!("fit_regions").entered();
  let min_samples = config.min_samples_per_leaf as f64;

  let results: Vec<Result<(), FitFailure>> = regions
    .entries_mut()
    .par_iter_mut()
    .enumerate()
    .filter_map(|(index, entry)| {
      let batch = entry.range.get(samples).filter(|batch| !batch.is_empty())?;
      entry.region.statistics.merge(&entry.pass_statistics);
      let statistics = &entry.region.statistics;
      if statistics.sample_count() < min_samples {
        return None;
      }
      let fitted = match &entry.region.model {
        Some(model) => fitter.refit(model, statistics, batch),
        None => fitter.fit(statistics, batch),
      };
      Some(match fitted {
        Ok(model) => {
          entry.region.model = Some(model);
          Ok(())
        }
        Err(err) => Err(FitFailure {
          region: RegionId(index as u32),
          message: err.to_string(),
        }),
      })
    })
    .collect();

  let fitted = results.iter().filter(|r| r.is_ok()).count();
  let failures = results.into_iter().filter_map(Result::err).collect();
  (fitted, failures)
}

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;
