//! TreeNode - tagged leaf/inner node of the spatial tree.

/// Data index carried by child leaves between allocation and assignment.
pub const UNASSIGNED: u32 = u32::MAX;

/// Node of the binary spatial tree.
///
/// Inner nodes store only the left child; the right child is always
/// `left_child + 1` because children are allocated as an adjacent pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TreeNode {
  /// Leaf referencing one slot of the region storage.
  Leaf {
    /// Index into the region storage.
    data_index: u32,
  },
  /// Inner node splitting space with the plane `p[axis] = position`.
  Inner {
    /// Split axis (0 = X, 1 = Y, 2 = Z).
    axis: u8,
    /// Split coordinate. Points with `p[axis] < position` go left.
    position: f32,
    /// Index of the left child.
    left_child: u32,
  },
}

impl TreeNode {
  /// Leaf referencing `data_index`.
  #[inline]
  pub fn leaf(data_index: u32) -> Self {
    Self::Leaf { data_index }
  }

  /// True for leaves.
  #[inline]
  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf { .. })
  }

  /// Region index of a leaf, `None` for inner nodes.
  #[inline]
  pub fn data_index(&self) -> Option<u32> {
    match *self {
      Self::Leaf { data_index } => Some(data_index),
      Self::Inner { .. } => None,
    }
  }

  /// `(left, right)` children of an inner node, `None` for leaves.
  #[inline]
  pub fn children(&self) -> Option<(u32, u32)> {
    match *self {
      Self::Leaf { .. } => None,
      Self::Inner { left_child, .. } => Some((left_child, left_child + 1)),
    }
  }

  /// Split plane `(axis, position)` of an inner node.
  #[inline]
  pub fn split_plane(&self) -> Option<(usize, f32)> {
    match *self {
      Self::Leaf { .. } => None,
      Self::Inner { axis, position, .. } => Some((axis as usize, position)),
    }
  }
}
