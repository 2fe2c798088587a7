//! RegionSearchTree - k-d tree over region centers for stochastic lookup.
//!
//! Rebuilt after every pass from the current regions. A lookup gathers the
//! `k` centers nearest to the query and picks one of them with a uniform
//! variate, which blurs the hard cell boundaries of the spatial tree.

use glam::Vec3;
use smallvec::SmallVec;

use crate::bounds::Aabb3;
use crate::region::RegionId;

/// Points per leaf before a node is split.
const LEAF_SIZE: usize = 8;

/// Inline capacity of the neighbor list; larger `k` spills to the heap.
pub const INLINE_NEIGHBORS: usize = 8;

const NO_CHILD: u32 = u32::MAX;

#[derive(Clone, Copy, Debug)]
struct SearchNode {
  /// Tight bounds of all points below this node.
  bounds: Aabb3,
  /// Left child, or [`NO_CHILD`] for leaves. Right child is `left + 1`.
  left: u32,
  /// Leaf point range in `points`.
  start: u32,
  end: u32,
}

impl SearchNode {
  #[inline]
  fn is_leaf(&self) -> bool {
    self.left == NO_CHILD
  }
}

/// Candidate neighbor: squared distance and region id.
pub type Neighbor = (f32, RegionId);

/// Static k-d tree mapping points to region ids.
#[derive(Clone, Debug, Default)]
pub struct RegionSearchTree {
  nodes: Vec<SearchNode>,
  points: Vec<(Vec3, RegionId)>,
}

impl RegionSearchTree {
  /// Empty index; every lookup returns `None`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Build over `(center, region)` pairs. Non-finite centers are skipped.
  pub fn build(entries: impl IntoIterator<Item = (Vec3, RegionId)>) -> Self {
    let mut tree = Self {
      nodes: Vec::new(),
      points: entries.into_iter().filter(|(p, _)| p.is_finite()).collect(),
    };
    if tree.points.is_empty() {
      return tree;
    }
    // A median-split tree with leaves of at most LEAF_SIZE has fewer than
    // 4n / LEAF_SIZE nodes.
    tree.nodes.reserve(4 * tree.points.len() / LEAF_SIZE + 1);
    let root = tree.leaf(0, tree.points.len());
    tree.nodes.push(root);
    tree.split_node(0);
    tree
  }

  /// Number of indexed points.
  #[inline]
  pub fn len(&self) -> usize {
    self.points.len()
  }

  /// True if nothing is indexed.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  fn leaf(&self, start: usize, end: usize) -> SearchNode {
    let bounds = Aabb3::from_points(self.points[start..end].iter().map(|(p, _)| *p))
      .unwrap_or(Aabb3::new(Vec3::ZERO, Vec3::ZERO));
    SearchNode {
      bounds,
      left: NO_CHILD,
      start: start as u32,
      end: end as u32,
    }
  }

  fn split_node(&mut self, index: usize) {
    let node = self.nodes[index];
    let (start, end) = (node.start as usize, node.end as usize);
    let count = end - start;
    if count <= LEAF_SIZE {
      return;
    }

    let size = node.bounds.size();
    let axis = if size.x >= size.y && size.x >= size.z {
      0
    } else if size.y >= size.z {
      1
    } else {
      2
    };
    let mid = count / 2;
    // Region id breaks ties so the layout does not depend on input order.
    self.points[start..end].select_nth_unstable_by(mid, |a, b| {
      a.0[axis].total_cmp(&b.0[axis]).then(a.1.cmp(&b.1))
    });

    let left = self.nodes.len();
    let (left_node, right_node) = (self.leaf(start, start + mid), self.leaf(start + mid, end));
    self.nodes.push(left_node);
    self.nodes.push(right_node);
    self.nodes[index].left = left as u32;

    self.split_node(left);
    self.split_node(left + 1);
  }

  /// The `k` indexed points nearest to `position`, closest first. Equal
  /// distances are ordered by region id.
  pub fn nearest(&self, position: Vec3, k: usize) -> SmallVec<[Neighbor; INLINE_NEIGHBORS]> {
    let mut found = SmallVec::new();
    if k == 0 || self.nodes.is_empty() {
      return found;
    }
    self.search(0, position, k, &mut found);
    found
  }

  /// Pick one of the `k` nearest regions with the variate `u` in `[0, 1)`.
  pub fn sample_nearest(&self, position: Vec3, u: f32, k: usize) -> Option<RegionId> {
    let found = self.nearest(position, k);
    if found.is_empty() {
      return None;
    }
    let slot = ((u.clamp(0.0, 1.0) * found.len() as f32) as usize).min(found.len() - 1);
    Some(found[slot].1)
  }

  fn search(
    &self,
    index: usize,
    position: Vec3,
    k: usize,
    found: &mut SmallVec<[Neighbor; INLINE_NEIGHBORS]>,
  ) {
    let node = self.nodes[index];
    if found.len() == k && box_distance_squared(&node.bounds, position) > found[k - 1].0 {
      return;
    }

    if node.is_leaf() {
      for &(point, id) in &self.points[node.start as usize..node.end as usize] {
        insert_neighbor(found, k, (position.distance_squared(point), id));
      }
      return;
    }

    // Visit the child whose box is closer first.
    let (left, right) = (node.left as usize, node.left as usize + 1);
    let dl = box_distance_squared(&self.nodes[left].bounds, position);
    let dr = box_distance_squared(&self.nodes[right].bounds, position);
    let (first, second) = if dl <= dr { (left, right) } else { (right, left) };
    self.search(first, position, k, found);
    self.search(second, position, k, found);
  }
}

#[inline]
fn box_distance_squared(bounds: &Aabb3, position: Vec3) -> f32 {
  position.distance_squared(position.clamp(bounds.min, bounds.max))
}

/// Insert into the sorted candidate list, keeping at most `k` entries.
fn insert_neighbor(found: &mut SmallVec<[Neighbor; INLINE_NEIGHBORS]>, k: usize, candidate: Neighbor) {
  let slot = found.partition_point(|&(d, id)| (d, id) <= candidate);
  if slot >= k {
    return;
  }
  if found.len() == k {
    found.pop();
  }
  found.insert(slot, candidate);
}
