//! Sample types streamed in from the renderer.

use std::cmp::Ordering;

use glam::Vec3;

/// A sample with a world-space position.
///
/// The tree builder only reads [`position`](Self::position); everything else
/// is payload for the region fitter. Samples are reordered in place during a
/// pass, so they must be cheap to move.
pub trait SpatialSample: Send + Sync {
  /// World-space position of the sample.
  fn position(&self) -> Vec3;

  /// Total order used to canonicalize the sample buffer in deterministic
  /// mode. Samples that compare `Equal` must be indistinguishable to the
  /// fitter. The default orders by position only.
  fn deterministic_cmp(&self, other: &Self) -> Ordering {
    cmp_vec3(self.position(), other.position())
  }
}

/// Lexicographic total order over the bit patterns of a vector.
#[inline]
pub fn cmp_vec3(a: Vec3, b: Vec3) -> Ordering {
  a.x
    .total_cmp(&b.x)
    .then_with(|| a.y.total_cmp(&b.y))
    .then_with(|| a.z.total_cmp(&b.z))
}

/// Directional radiance sample: where it was taken, where light came from and
/// how much it contributed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalSample {
  /// Scattering position.
  pub position: Vec3,
  /// Unit direction toward the incoming light.
  pub direction: Vec3,
  /// Contribution divided by the sampling pdf.
  pub weight: f32,
  /// Pdf the direction was sampled with.
  pub pdf: f32,
  /// Distance to the next vertex along `direction`.
  pub distance: f32,
}

impl DirectionalSample {
  /// Sample with unit weight and pdf.
  pub fn new(position: Vec3, direction: Vec3) -> Self {
    Self {
      position,
      direction,
      weight: 1.0,
      pdf: 1.0,
      distance: f32::INFINITY,
    }
  }
}

impl SpatialSample for DirectionalSample {
  #[inline]
  fn position(&self) -> Vec3 {
    self.position
  }

  fn deterministic_cmp(&self, other: &Self) -> Ordering {
    cmp_vec3(self.position, other.position)
      .then_with(|| cmp_vec3(self.direction, other.direction))
      .then_with(|| self.weight.total_cmp(&other.weight))
      .then_with(|| self.pdf.total_cmp(&other.pdf))
      .then_with(|| self.distance.total_cmp(&other.distance))
  }
}

impl SpatialSample for Vec3 {
  #[inline]
  fn position(&self) -> Vec3 {
    *self
  }
}
