//! SpatialTree - pool-allocated binary space partition over an AABB.

use glam::Vec3;
use smallvec::SmallVec;

use super::node::{TreeNode, UNASSIGNED};
use crate::bounds::Aabb3;
use crate::error::BuildError;

/// Result of descending the tree to the leaf containing a point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeafLocation {
  /// Node index of the leaf.
  pub node: u32,
  /// Region index stored in the leaf.
  pub data_index: u32,
  /// Tightened bounds of the leaf cell.
  pub bounds: Aabb3,
  /// Depth of the leaf (root = 1).
  pub depth: u32,
}

/// Binary space partition. The root is node 0 and covers [`bounds`](Self::bounds).
///
/// Nodes are only ever appended, so node indices stay valid for the
/// lifetime of the tree (until [`initialize`](Self::initialize)).
#[derive(Clone, Debug)]
pub struct SpatialTree {
  bounds: Aabb3,
  nodes: Vec<TreeNode>,
  node_limit: usize,
}

impl SpatialTree {
  /// Largest node pool addressable with `u32` child indices.
  pub const MAX_NODES: usize = u32::MAX as usize;

  /// Tree with a single root leaf over `bounds`, referencing region 0.
  pub fn new(bounds: Aabb3) -> Self {
    Self {
      bounds,
      nodes: vec![TreeNode::leaf(0)],
      node_limit: Self::MAX_NODES,
    }
  }

  /// Reset to a single root leaf over `bounds` and reserve room for
  /// `capacity_hint` nodes.
  pub fn initialize(&mut self, bounds: Aabb3, capacity_hint: usize) -> Result<(), BuildError> {
    self.bounds = bounds;
    self.nodes.clear();
    self
      .nodes
      .try_reserve(capacity_hint.min(self.node_limit).max(1))
      .map_err(|source| BuildError::Allocation {
        what: "tree node pool",
        source,
      })?;
    self.nodes.push(TreeNode::leaf(0));
    Ok(())
  }

  /// Cap the node pool size; allocations beyond it fail with
  /// [`BuildError::CapacityExceeded`].
  pub fn set_node_limit(&mut self, limit: usize) {
    self.node_limit = limit.min(Self::MAX_NODES);
  }

  /// Root bounds.
  #[inline]
  pub fn bounds(&self) -> Aabb3 {
    self.bounds
  }

  /// Number of nodes in the pool.
  #[inline]
  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  /// All nodes in allocation order.
  #[inline]
  pub fn nodes(&self) -> &[TreeNode] {
    &self.nodes
  }

  /// Node at `index`.
  #[inline]
  pub fn node(&self, index: u32) -> Option<TreeNode> {
    self.nodes.get(index as usize).copied()
  }

  /// Append two adjacent unassigned leaves and return the left index.
  pub fn allocate_child_pair(&mut self) -> Result<u32, BuildError> {
    if self.nodes.len() + 2 > self.node_limit {
      return Err(BuildError::CapacityExceeded {
        what: "tree node pool",
        limit: self.node_limit,
      });
    }
    self
      .nodes
      .try_reserve(2)
      .map_err(|source| BuildError::Allocation {
        what: "tree node pool",
        source,
      })?;
    let left = self.nodes.len() as u32;
    self.nodes.push(TreeNode::leaf(UNASSIGNED));
    self.nodes.push(TreeNode::leaf(UNASSIGNED));
    Ok(left)
  }

  /// Turn leaf `node` into an inner node with a fresh child pair.
  ///
  /// The left child keeps the leaf's region, the right child references
  /// `right_data_index`. Returns the left child index. Fails without
  /// touching the tree if `node` is not a leaf.
  pub fn split_leaf(
    &mut self,
    node: u32,
    axis: usize,
    position: f32,
    right_data_index: u32,
  ) -> Result<u32, BuildError> {
    let data_index = self
      .node(node)
      .and_then(|n| n.data_index())
      .ok_or(BuildError::NotALeaf(node))?;

    let left = self.allocate_child_pair()?;
    self.nodes[left as usize] = TreeNode::leaf(data_index);
    self.nodes[left as usize + 1] = TreeNode::leaf(right_data_index);
    self.nodes[node as usize] = TreeNode::Inner {
      axis: axis as u8,
      position,
      left_child: left,
    };
    Ok(left)
  }

  /// Restore the node pool to an earlier snapshot.
  pub(crate) fn restore_nodes(&mut self, nodes: Vec<TreeNode>) {
    self.nodes = nodes;
  }

  /// Descend from the root to the leaf whose cell contains `position`.
  ///
  /// Positions outside the root bounds still land on a boundary leaf; callers
  /// check [`bounds`](Self::bounds) first when that matters.
  pub fn locate(&self, position: Vec3) -> LeafLocation {
    let mut index = 0u32;
    let mut bounds = self.bounds;
    let mut depth = 1;
    loop {
      match self.nodes[index as usize] {
        TreeNode::Leaf { data_index } => {
          return LeafLocation {
            node: index,
            data_index,
            bounds,
            depth,
          };
        }
        TreeNode::Inner {
          axis,
          position: split,
          left_child,
        } => {
          let axis = axis as usize;
          let (left, right) = bounds.split(axis, split);
          if position[axis] < split {
            index = left_child;
            bounds = left;
          } else {
            index = left_child + 1;
            bounds = right;
          }
          depth += 1;
        }
      }
    }
  }

  /// Iterate over all leaves, depth first, left before right.
  pub fn leaves(&self) -> Leaves<'_> {
    let mut stack = SmallVec::new();
    stack.push((0u32, self.bounds, 1u32));
    Leaves { tree: self, stack }
  }

  /// Number of leaves.
  pub fn leaf_count(&self) -> usize {
    // Every split turns one leaf into an inner node and adds two leaves.
    (self.nodes.len() + 1) / 2
  }

  /// Depth of the deepest leaf.
  pub fn depth(&self) -> u32 {
    self.leaves().map(|leaf| leaf.depth).max().unwrap_or(1)
  }
}

/// Depth-first leaf iterator, see [`SpatialTree::leaves`].
pub struct Leaves<'a> {
  tree: &'a SpatialTree,
  stack: SmallVec<[(u32, Aabb3, u32); 32]>,
}

impl Iterator for Leaves<'_> {
  type Item = LeafLocation;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some((index, bounds, depth)) = self.stack.pop() {
      match self.tree.nodes[index as usize] {
        TreeNode::Leaf { data_index } => {
          return Some(LeafLocation {
            node: index,
            data_index,
            bounds,
            depth,
          });
        }
        TreeNode::Inner {
          axis,
          position,
          left_child,
        } => {
          let (left, right) = bounds.split(axis as usize, position);
          self.stack.push((left_child + 1, right, depth + 1));
          self.stack.push((left_child, left, depth + 1));
        }
      }
    }
    None
  }
}

#[cfg(test)]
#[path = "spatial_tree_test.rs"]
mod spatial_tree_test;
