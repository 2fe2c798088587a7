//! Regions and the append-only storage that tree leaves index into.

use crate::error::BuildError;
use crate::range::SampleRange;
use crate::statistics::RunningStatistics;

/// Stable identifier of a region.
///
/// Issued when a leaf is created or split and never reused for a different
/// region during the lifetime of a [`Field`](crate::Field).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl RegionId {
  /// Raw storage index.
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// Learned state of one spatial cell: positional statistics plus the model
/// produced by the region fitter.
#[derive(Clone, Debug, PartialEq)]
pub struct Region<M> {
  pub(crate) statistics: RunningStatistics,
  pub(crate) model: Option<M>,
}

impl<M> Region<M> {
  /// Region without samples or model.
  pub fn new() -> Self {
    Self {
      statistics: RunningStatistics::EMPTY,
      model: None,
    }
  }

  /// Accumulated positional statistics.
  #[inline]
  pub fn statistics(&self) -> &RunningStatistics {
    &self.statistics
  }

  /// Fitted model, `None` until the first successful fit.
  #[inline]
  pub fn model(&self) -> Option<&M> {
    self.model.as_ref()
  }

  /// A region is valid once a model has been fitted for it.
  #[inline]
  pub fn is_valid(&self) -> bool {
    self.model.is_some()
  }
}

impl<M> Default for Region<M> {
  fn default() -> Self {
    Self::new()
  }
}

/// Storage slot: a region plus the samples it received in the current pass.
#[derive(Clone, Debug)]
pub(crate) struct RegionEntry<M> {
  pub(crate) region: Region<M>,
  pub(crate) range: SampleRange,
  /// Statistics of `range`, folded into `region.statistics` after the pass.
  pub(crate) pass_statistics: RunningStatistics,
}

impl<M> RegionEntry<M> {
  fn new(region: Region<M>) -> Self {
    Self {
      region,
      range: SampleRange::EMPTY,
      pass_statistics: RunningStatistics::EMPTY,
    }
  }
}

/// Append-only container of regions indexed by leaf `data_index`.
///
/// Entries are never removed outside of [`reset`](Self::reset), so a
/// [`RegionId`] stays valid for the lifetime of the storage.
#[derive(Clone, Debug)]
pub struct RegionStorage<M> {
  entries: Vec<RegionEntry<M>>,
  limit: usize,
}

impl<M> RegionStorage<M> {
  /// Largest storage addressable with `u32` leaf indices.
  pub const MAX_REGIONS: usize = u32::MAX as usize;

  /// Storage holding the single root region.
  pub fn new() -> Self {
    Self {
      entries: vec![RegionEntry::new(Region::new())],
      limit: Self::MAX_REGIONS,
    }
  }

  /// Drop all regions, keep one empty root region and reserve `capacity`.
  pub fn reset(&mut self, capacity: usize) -> Result<(), BuildError> {
    self.entries.clear();
    self
      .entries
      .try_reserve(capacity.min(self.limit).max(1))
      .map_err(|source| BuildError::Allocation {
        what: "region storage",
        source,
      })?;
    self.entries.push(RegionEntry::new(Region::new()));
    Ok(())
  }

  /// Cap the number of regions; appends beyond it fail with
  /// [`BuildError::CapacityExceeded`].
  pub fn set_region_limit(&mut self, limit: usize) {
    self.limit = limit.min(Self::MAX_REGIONS);
  }

  /// Number of regions.
  #[inline]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// True if the storage holds no regions.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Region by id.
  #[inline]
  pub fn get(&self, id: RegionId) -> Option<&Region<M>> {
    self.entries.get(id.index()).map(|e| &e.region)
  }

  /// Sample range the region received in the most recent pass.
  #[inline]
  pub fn range(&self, id: RegionId) -> Option<SampleRange> {
    self.entries.get(id.index()).map(|e| e.range)
  }

  /// Iterate `(id, region)` pairs in index order.
  pub fn iter(&self) -> impl Iterator<Item = (RegionId, &Region<M>)> + '_ {
    self
      .entries
      .iter()
      .enumerate()
      .map(|(i, e)| (RegionId(i as u32), &e.region))
  }

  /// All sample ranges of the most recent pass, in index order.
  pub fn ranges(&self) -> Vec<SampleRange> {
    self.entries.iter().map(|e| e.range).collect()
  }

  pub(crate) fn entries_mut(&mut self) -> &mut [RegionEntry<M>] {
    &mut self.entries
  }

  pub(crate) fn entry(&self, index: u32) -> &RegionEntry<M> {
    &self.entries[index as usize]
  }

  /// Forget the per-pass ranges before a new pass starts.
  pub(crate) fn begin_pass(&mut self) {
    for entry in &mut self.entries {
      entry.range = SampleRange::EMPTY;
      entry.pass_statistics = RunningStatistics::EMPTY;
    }
  }

  /// Record the samples a leaf received this pass.
  pub(crate) fn record_range(
    &mut self,
    index: u32,
    range: SampleRange,
    statistics: RunningStatistics,
  ) {
    let entry = &mut self.entries[index as usize];
    entry.range = range;
    entry.pass_statistics = statistics;
  }

  /// Undo the appends and decays of an aborted pass.
  pub(crate) fn rollback(&mut self, len: usize, decayed: &[(u32, RunningStatistics)]) {
    self.entries.truncate(len);
    // Newest first, so a region split twice ends at its oldest statistics.
    for &(index, statistics) in decayed.iter().rev() {
      if let Some(entry) = self.entries.get_mut(index as usize) {
        entry.region.statistics = statistics;
      }
    }
    self.begin_pass();
  }
}

impl<M: Clone> RegionStorage<M> {
  /// Decay region `index` and append a copy of it for the new right child.
  ///
  /// Returns the new index and the statistics the region had before decay.
  pub(crate) fn split_region(
    &mut self,
    index: u32,
    decay: f32,
  ) -> Result<(u32, RunningStatistics), BuildError> {
    if self.entries.len() >= self.limit {
      return Err(BuildError::CapacityExceeded {
        what: "region storage",
        limit: self.limit,
      });
    }
    self
      .entries
      .try_reserve(1)
      .map_err(|source| BuildError::Allocation {
        what: "region storage",
        source,
      })?;

    let entry = &mut self.entries[index as usize];
    let previous = entry.region.statistics;
    entry.region.statistics.decay(decay);
    let duplicate = entry.region.clone();

    let new_index = self.entries.len() as u32;
    self.entries.push(RegionEntry::new(duplicate));
    Ok((new_index, previous))
  }
}

impl<M> Default for RegionStorage<M> {
  fn default() -> Self {
    Self::new()
  }
}
