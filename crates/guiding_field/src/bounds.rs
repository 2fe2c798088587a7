//! Axis-aligned bounding box for the guided scene volume.

use glam::Vec3;

/// Single-precision axis-aligned bounding box.
///
/// Defines the volume covered by the spatial tree. Points outside the root
/// box have no guiding region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3 {
  /// Minimum corner (inclusive).
  pub min: Vec3,
  /// Maximum corner (inclusive).
  pub max: Vec3,
}

impl Aabb3 {
  /// Unit cube `[0, 1]³`.
  pub const UNIT: Self = Self {
    min: Vec3::ZERO,
    max: Vec3::ONE,
  };

  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: Vec3, max: Vec3) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y && min.z <= max.z,
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  /// Create a new AABB from center and half-extents.
  pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
    Self {
      min: center - half_extents,
      max: center + half_extents,
    }
  }

  /// Smallest box containing every point, or `None` for an empty iterator.
  pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
    Some(Self { min, max })
  }

  /// Check if this AABB contains a point (boundary included).
  #[inline]
  pub fn contains_point(&self, point: Vec3) -> bool {
    point.x >= self.min.x
      && point.x <= self.max.x
      && point.y >= self.min.y
      && point.y <= self.max.y
      && point.z >= self.min.z
      && point.z <= self.max.z
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> Vec3 {
    self.max - self.min
  }

  /// Get the center of the AABB.
  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  /// Split the box with the plane `p[axis] = position`.
  ///
  /// The position is clamped into the box so both halves stay well formed.
  #[inline]
  pub fn split(&self, axis: usize, position: f32) -> (Self, Self) {
    let position = position.clamp(self.min[axis], self.max[axis]);
    let mut left = *self;
    let mut right = *self;
    left.max[axis] = position;
    right.min[axis] = position;
    (left, right)
  }
}
