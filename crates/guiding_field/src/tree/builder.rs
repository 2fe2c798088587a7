//! TreeBuilder - statistics-driven construction and incremental update of the
//! spatial tree.
//!
//! # Algorithm
//!
//! Every pass walks the existing tree top-down with the full sample buffer:
//!
//! 1. **Canonicalize** (deterministic mode): sort samples by their total order
//! 2. **Aggregate**: parallel reduction of positional statistics
//! 3. **Descend**: per node, with the node's contiguous slice of samples
//!    - leaf, enough evidence, depth left: split at the mean of the axis with
//!      the largest variance, then continue as inner node
//!    - leaf otherwise: record the slice on the leaf's region and stop
//!    - inner: partition the slice in place around the split plane, gathering
//!      per-side statistics during the same scan, and fork both children
//!
//! ```text
//!   samples: [ . . . . . . . . . . . . . . . . ]      node N (inner, x < s)
//!                     partition
//!            [ x<s x<s x<s x<s | x>=s x>=s x>=s ]
//!              └── left task ─┘ └── right task ─┘     rayon::join
//! ```
//!
//! Sub-slices are carved with `split_at_mut`, so each task owns its samples.
//! In deterministic mode the descent stays on the calling thread; sorting
//! and the statistics reduction are still parallel.
//! The node pool and the region storage are shared behind short-lived locks
//! that only cover reading a node, recording a range, or appending.
//!
//! A pass that fails to grow the node pool or the region storage is rolled
//! back: nodes, appended regions and decayed statistics are restored.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rayon::prelude::*;

use super::node::TreeNode;
use super::spatial_tree::SpatialTree;
use crate::bounds::Aabb3;
use crate::config::FieldConfig;
use crate::error::BuildError;
use crate::range::SampleRange;
use crate::region::RegionStorage;
use crate::sample::SpatialSample;
use crate::statistics::RunningStatistics;

/// Chunk size of the statistics reduction. Fixed so the reduction order does
/// not depend on the number of worker threads.
pub const STATISTICS_CHUNK: usize = 4096;

/// Below this many samples children are processed on the current thread.
pub const DEFAULT_PARALLEL_GRAIN: usize = 2048;

/// Summary of one build/update pass over the tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildOutcome {
  /// Samples pushed through the tree.
  pub samples: usize,
  /// Leaves split during the pass.
  pub splits: usize,
}

/// Builds and incrementally updates a [`SpatialTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeBuilder {
  parallel_grain: usize,
}

impl Default for TreeBuilder {
  fn default() -> Self {
    Self::new()
  }
}

/// State shared by all tasks of one pass.
struct PassContext<'a, M> {
  tree: Mutex<&'a mut SpatialTree>,
  regions: Mutex<RegionJournal<'a, M>>,
  splits: AtomicUsize,
  config: &'a FieldConfig,
}

/// Region storage plus the pre-split statistics needed for rollback.
struct RegionJournal<'a, M> {
  storage: &'a mut RegionStorage<M>,
  decayed: Vec<(u32, RunningStatistics)>,
}

fn lock<'m, T>(mutex: &'m Mutex<T>, what: &'static str) -> Result<MutexGuard<'m, T>, BuildError> {
  mutex.lock().map_err(|_| BuildError::Poisoned(what))
}

impl<M: Clone> PassContext<'_, M> {
  fn node(&self, index: u32) -> Result<TreeNode, BuildError> {
    let tree = lock(&self.tree, "tree")?;
    Ok(tree.nodes()[index as usize])
  }

  fn existing_samples(&self, data_index: u32) -> Result<f64, BuildError> {
    let regions = lock(&self.regions, "region storage")?;
    Ok(regions.storage.entry(data_index).region.statistics.sample_count())
  }

  fn record_leaf(
    &self,
    data_index: u32,
    range: SampleRange,
    statistics: RunningStatistics,
  ) -> Result<(), BuildError> {
    let mut regions = lock(&self.regions, "region storage")?;
    regions.storage.record_range(data_index, range, statistics);
    Ok(())
  }

  /// Decay the leaf's region, append its duplicate and convert the leaf.
  /// Returns the left child index.
  fn split(
    &self,
    node: u32,
    data_index: u32,
    axis: usize,
    position: f32,
  ) -> Result<u32, BuildError> {
    let right_index = {
      let mut regions = lock(&self.regions, "region storage")?;
      let (right_index, previous) = regions
        .storage
        .split_region(data_index, self.config.decay_on_split)?;
      regions.decayed.push((data_index, previous));
      right_index
    };
    let left = lock(&self.tree, "tree")?.split_leaf(node, axis, position, right_index)?;
    self.splits.fetch_add(1, Ordering::Relaxed);
    Ok(left)
  }
}

impl TreeBuilder {
  /// Builder with the default parallel grain.
  pub fn new() -> Self {
    Self {
      parallel_grain: DEFAULT_PARALLEL_GRAIN,
    }
  }

  /// Builder forking child tasks only for slices of at least `grain` samples.
  pub fn with_parallel_grain(grain: usize) -> Self {
    Self {
      parallel_grain: grain.max(1),
    }
  }

  /// Reset `tree` and `regions` to a single root leaf over `bounds`, then
  /// run the first [`update`](Self::update) pass.
  pub fn build<S: SpatialSample, M: Clone + Send>(
    &self,
    tree: &mut SpatialTree,
    bounds: Aabb3,
    samples: &mut [S],
    regions: &mut RegionStorage<M>,
    config: &FieldConfig,
  ) -> Result<BuildOutcome, BuildError> {
    let estimated_leaves = config.estimated_leaf_count(samples.len());
    tracing::debug!(
      samples = samples.len(),
      estimated_leaves,
      sample_buffer_mb = (samples.len() * std::mem::size_of::<S>()) as f64 * 1e-6,
      "reserving spatial structure"
    );
    tree.initialize(bounds, 4 * estimated_leaves)?;
    regions.reset(2 * estimated_leaves)?;
    self.update(tree, samples, regions, config)
  }

  /// Push a batch of samples through the tree, splitting leaves that have
  /// accumulated too much evidence.
  ///
  /// On success every leaf that received samples has its range and the
  /// statistics of those samples recorded in the region storage. An empty
  /// batch leaves tree and storage untouched.
  #[tracing::instrument(skip_all, name = "tree_builder::update", fields(samples = samples.len()))]
  pub fn update<S: SpatialSample, M: Clone + Send>(
    &self,
    tree: &mut SpatialTree,
    samples: &mut [S],
    regions: &mut RegionStorage<M>,
    config: &FieldConfig,
  ) -> Result<BuildOutcome, BuildError> {
    if samples.is_empty() {
      return Ok(BuildOutcome::default());
    }
    regions.begin_pass();

    if config.deterministic {
      let _span = tracing::info_span!("sort_samples").entered();
      samples.par_sort_unstable_by(|a, b| a.deterministic_cmp(b));
    }

    let statistics = {
      let _span = tracing::info_span!("aggregate_statistics").entered();
      aggregate_statistics(samples)
    };

    let node_snapshot = tree.nodes().to_vec();
    let region_count = regions.len();
    let sample_count = samples.len();

    let context = PassContext {
      tree: Mutex::new(tree),
      regions: Mutex::new(RegionJournal {
        storage: regions,
        decayed: Vec::new(),
      }),
      splits: AtomicUsize::new(0),
      config,
    };

    let result = {
      let _span = tracing::info_span!("update_nodes").entered();
      self.update_node(&context, 0, 1, 0, samples, statistics)
    };

    let splits = context.splits.into_inner();
    let tree = context.tree.into_inner().unwrap_or_else(PoisonError::into_inner);
    let journal = context
      .regions
      .into_inner()
      .unwrap_or_else(PoisonError::into_inner);

    match result {
      Ok(()) => Ok(BuildOutcome {
        samples: sample_count,
        splits,
      }),
      Err(err) => {
        tracing::error!(error = %err, splits, "tree update aborted, rolling back");
        tree.restore_nodes(node_snapshot);
        journal.storage.rollback(region_count, &journal.decayed);
        Err(err)
      }
    }
  }

  /// Split rule: enough accumulated plus incoming evidence, depth left, at
  /// least two samples and a non-degenerate spread.
  fn split_plane(
    &self,
    config: &FieldConfig,
    existing: f64,
    depth: u32,
    statistics: &RunningStatistics,
    incoming: usize,
  ) -> Option<(usize, f32)> {
    if depth >= config.max_depth || incoming < 2 {
      return None;
    }
    if existing + incoming as f64 <= config.max_samples_per_leaf as f64 {
      return None;
    }
    let axis = statistics.max_variance_axis()?;
    Some((axis, statistics.mean()[axis]))
  }

  fn update_node<S: SpatialSample, M: Clone + Send>(
    &self,
    context: &PassContext<'_, M>,
    node: u32,
    depth: u32,
    offset: usize,
    samples: &mut [S],
    statistics: RunningStatistics,
  ) -> Result<(), BuildError> {
    if samples.is_empty() {
      return Ok(());
    }

    let (left_child, (pivot, left_stats, right_stats)) = match context.node(node)? {
      TreeNode::Leaf { data_index } => {
        let existing = context.existing_samples(data_index)?;
        let plane = self.split_plane(context.config, existing, depth, &statistics, samples.len());
        let Some((axis, position)) = plane else {
          let range = SampleRange::from_offset(offset, samples.len());
          return context.record_leaf(data_index, range, statistics);
        };
        let partition = partition_with_statistics(samples, axis, position);
        if partition.0 == 0 || partition.0 == samples.len() {
          // Mean rounded onto a sample coordinate; the plane separates nothing.
          let range = SampleRange::from_offset(offset, samples.len());
          return context.record_leaf(data_index, range, statistics);
        }
        (context.split(node, data_index, axis, position)?, partition)
      }
      TreeNode::Inner {
        axis,
        position,
        left_child,
      } => (left_child, partition_with_statistics(samples, axis as usize, position)),
    };

    // Forked children allocate nodes in scheduling order; deterministic
    // passes descend on one thread so node numbering is reproducible.
    let parallel = !context.config.deterministic && samples.len() >= self.parallel_grain;
    let (left_samples, right_samples) = samples.split_at_mut(pivot);

    let mut recurse_left =
      move || self.update_node(context, left_child, depth + 1, offset, left_samples, left_stats);
    let mut recurse_right = move || {
      self.update_node(
        context,
        left_child + 1,
        depth + 1,
        offset + pivot,
        right_samples,
        right_stats,
      )
    };

    if parallel {
      let (left, right) = rayon::join(recurse_left, recurse_right);
      left.and(right)
    } else {
      recurse_left()?;
      recurse_right()
    }
  }
}

/// Statistics over all sample positions, reduced in fixed-size chunks.
pub fn aggregate_statistics<S: SpatialSample>(samples: &[S]) -> RunningStatistics {
  samples
    .par_chunks(STATISTICS_CHUNK)
    .map(|chunk| RunningStatistics::from_positions(chunk.iter().map(S::position)))
    .collect::<Vec<_>>()
    .iter()
    .fold(RunningStatistics::EMPTY, |acc, s| acc.merged(s))
}

/// Reorder `samples` so those with `position[axis] < pivot` come first.
///
/// Returns the number of left samples and the statistics of both sides,
/// gathered during the same scan. The result depends only on the input
/// order, not on threading.
pub fn partition_with_statistics<S: SpatialSample>(
  samples: &mut [S],
  axis: usize,
  pivot: f32,
) -> (usize, RunningStatistics, RunningStatistics) {
  let mut left = RunningStatistics::new();
  let mut right = RunningStatistics::new();
  let mut lo = 0;
  let mut hi = samples.len();
  while lo < hi {
    let p = samples[lo].position();
    if p[axis] < pivot {
      left.add_sample(p);
      lo += 1;
    } else {
      right.add_sample(p);
      hi -= 1;
      samples.swap(lo, hi);
    }
  }
  (lo, left, right)
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
