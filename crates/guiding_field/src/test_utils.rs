//! Test utilities: seeded sample generators and mock region fitters.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bounds::Aabb3;
use crate::fitter::RegionFitter;
use crate::sample::DirectionalSample;
use crate::statistics::RunningStatistics;

// =============================================================================
// Sample generators
// =============================================================================

fn random_direction(rng: &mut StdRng) -> Vec3 {
  loop {
    let v = Vec3::new(
      rng.random_range(-1.0..1.0),
      rng.random_range(-1.0..1.0),
      rng.random_range(-1.0..1.0),
    );
    let len = v.length();
    if len > 1e-3 && len <= 1.0 {
      return v / len;
    }
  }
}

/// Samples uniformly distributed inside `bounds`.
pub fn uniform_samples(seed: u64, count: usize, bounds: Aabb3) -> Vec<DirectionalSample> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..count)
    .map(|_| {
      let t = Vec3::new(rng.random(), rng.random(), rng.random());
      let position = bounds.min + t * bounds.size();
      DirectionalSample::new(position, random_direction(&mut rng))
    })
    .collect()
}

/// Samples in `[0, 1]³` concentrated around a few cluster centers.
pub fn clustered_samples(seed: u64, count: usize) -> Vec<DirectionalSample> {
  const CENTERS: [Vec3; 3] = [
    Vec3::new(0.2, 0.2, 0.2),
    Vec3::new(0.8, 0.3, 0.6),
    Vec3::new(0.5, 0.9, 0.1),
  ];
  let mut rng = StdRng::seed_from_u64(seed);
  (0..count)
    .map(|i| {
      let center = CENTERS[i % CENTERS.len()];
      let offset = Vec3::new(
        rng.random_range(-0.05..0.05),
        rng.random_range(-0.05..0.05),
        rng.random_range(-0.05..0.05),
      );
      let position = (center + offset).clamp(Vec3::ZERO, Vec3::ONE);
      DirectionalSample::new(position, random_direction(&mut rng))
    })
    .collect()
}

/// Random points inside `bounds` for lookup tests.
pub fn query_points(seed: u64, count: usize, bounds: Aabb3) -> Vec<Vec3> {
  uniform_samples(seed, count, bounds)
    .into_iter()
    .map(|s| s.position)
    .collect()
}

// =============================================================================
// Mock fitters
// =============================================================================

/// Model: mean incoming direction plus bookkeeping for assertions.
#[derive(Clone, Debug, PartialEq)]
pub struct MeanDirection {
  pub direction: Vec3,
  /// Total samples seen across fits of this model.
  pub samples_seen: usize,
  /// Number of (re)fits.
  pub fits: u32,
}

/// Fits [`MeanDirection`] models; can be switched to fail every call.
#[derive(Default)]
pub struct MeanDirectionFitter {
  pub fail: AtomicBool,
  pub calls: AtomicUsize,
}

impl MeanDirectionFitter {
  pub fn failing() -> Self {
    Self {
      fail: AtomicBool::new(true),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn set_failing(&self, fail: bool) {
    self.fail.store(fail, Ordering::Relaxed);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::Relaxed)
  }

  fn check(&self) -> Result<(), String> {
    self.calls.fetch_add(1, Ordering::Relaxed);
    if self.fail.load(Ordering::Relaxed) {
      Err("injected fit failure".to_string())
    } else {
      Ok(())
    }
  }
}

fn mean_direction(samples: &[DirectionalSample]) -> Vec3 {
  samples
    .iter()
    .map(|s| s.direction * s.weight)
    .sum::<Vec3>()
    .normalize_or_zero()
}

impl RegionFitter<DirectionalSample> for MeanDirectionFitter {
  type Model = MeanDirection;
  type Error = String;

  fn fit(
    &self,
    _statistics: &RunningStatistics,
    samples: &[DirectionalSample],
  ) -> Result<MeanDirection, String> {
    self.check()?;
    Ok(MeanDirection {
      direction: mean_direction(samples),
      samples_seen: samples.len(),
      fits: 1,
    })
  }

  fn refit(
    &self,
    existing: &MeanDirection,
    _statistics: &RunningStatistics,
    samples: &[DirectionalSample],
  ) -> Result<MeanDirection, String> {
    self.check()?;
    Ok(MeanDirection {
      direction: (existing.direction + mean_direction(samples)).normalize_or_zero(),
      samples_seen: existing.samples_seen + samples.len(),
      fits: existing.fits + 1,
    })
  }
}
