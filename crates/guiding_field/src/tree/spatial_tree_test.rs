use glam::Vec3;

use super::*;

/// Root split on X at 0.5, right child split on Y at 0.25.
///
/// ```text
///   y
///   1 ┌──────┬──────┐
///     │      │  2   │
///     │  0   ├──────┤ 0.25
///     │      │  1   │
///   0 └──────┴──────┘
///     0     0.5     1  x
/// ```
fn two_level_tree() -> SpatialTree {
  let mut tree = SpatialTree::new(Aabb3::UNIT);
  let left = tree.split_leaf(0, 0, 0.5, 1).unwrap();
  tree.split_leaf(left + 1, 1, 0.25, 2).unwrap();
  tree
}

#[test]
fn test_new_tree_is_single_root_leaf() {
  let tree = SpatialTree::new(Aabb3::UNIT);
  assert_eq!(tree.node_count(), 1);
  assert_eq!(tree.node(0), Some(TreeNode::leaf(0)));
  assert_eq!(tree.leaf_count(), 1);
  assert_eq!(tree.depth(), 1);

  let hit = tree.locate(Vec3::splat(0.3));
  assert_eq!(hit.node, 0);
  assert_eq!(hit.data_index, 0);
  assert_eq!(hit.bounds, Aabb3::UNIT);
}

#[test]
fn test_initialize_resets_tree() {
  let mut tree = two_level_tree();
  let bounds = Aabb3::new(Vec3::splat(-2.0), Vec3::splat(2.0));
  tree.initialize(bounds, 64).unwrap();
  assert_eq!(tree.node_count(), 1);
  assert_eq!(tree.bounds(), bounds);
  assert!(tree.nodes()[0].is_leaf());
}

#[test]
fn test_allocate_child_pair_is_adjacent() {
  let mut tree = SpatialTree::new(Aabb3::UNIT);
  let first = tree.allocate_child_pair().unwrap();
  let second = tree.allocate_child_pair().unwrap();
  assert_eq!(first, 1);
  assert_eq!(second, 3);
  assert_eq!(tree.node_count(), 5);
  assert_eq!(tree.node(first), Some(TreeNode::leaf(UNASSIGNED)));
}

#[test]
fn test_allocate_respects_node_limit() {
  let mut tree = SpatialTree::new(Aabb3::UNIT);
  tree.set_node_limit(3);
  assert!(tree.allocate_child_pair().is_ok());
  let err = tree.allocate_child_pair().unwrap_err();
  assert!(
    matches!(err, BuildError::CapacityExceeded { limit: 3, .. }),
    "unexpected error {err:?}"
  );
  assert_eq!(tree.node_count(), 3, "failed allocation must not grow the pool");
}

#[test]
fn test_split_leaf_assigns_children() {
  let mut tree = SpatialTree::new(Aabb3::UNIT);
  let left = tree.split_leaf(0, 2, 0.75, 9).unwrap();
  assert_eq!(left, 1);
  assert_eq!(
    tree.node(0),
    Some(TreeNode::Inner {
      axis: 2,
      position: 0.75,
      left_child: 1
    })
  );
  assert_eq!(tree.node(1), Some(TreeNode::leaf(0)));
  assert_eq!(tree.node(2), Some(TreeNode::leaf(9)));
}

#[test]
fn test_split_inner_node_is_rejected() {
  let mut tree = two_level_tree();
  let before = tree.nodes().to_vec();

  assert!(matches!(tree.split_leaf(0, 1, 0.5, 7), Err(BuildError::NotALeaf(0))));
  assert!(matches!(tree.split_leaf(99, 1, 0.5, 7), Err(BuildError::NotALeaf(99))));
  assert_eq!(tree.nodes(), &before[..], "nothing allocated or overwritten");
}

#[test]
fn test_locate_descends_to_correct_leaf() {
  let tree = two_level_tree();

  let hit = tree.locate(Vec3::new(0.1, 0.9, 0.5));
  assert_eq!(hit.data_index, 0);
  assert_eq!(hit.depth, 2);
  assert_eq!(hit.bounds.max.x, 0.5);

  let hit = tree.locate(Vec3::new(0.9, 0.1, 0.5));
  assert_eq!(hit.data_index, 1);
  assert_eq!(hit.depth, 3);
  assert_eq!(hit.bounds.min, Vec3::new(0.5, 0.0, 0.0));
  assert_eq!(hit.bounds.max, Vec3::new(1.0, 0.25, 1.0));

  let hit = tree.locate(Vec3::new(0.9, 0.9, 0.5));
  assert_eq!(hit.data_index, 2);
}

#[test]
fn test_locate_on_split_plane_goes_right() {
  let tree = two_level_tree();
  assert_eq!(tree.locate(Vec3::new(0.5, 0.1, 0.0)).data_index, 1);
  assert_eq!(tree.locate(Vec3::new(0.75, 0.25, 0.0)).data_index, 2);
}

#[test]
fn test_leaves_partition_root_bounds() {
  let tree = two_level_tree();
  let leaves: Vec<_> = tree.leaves().collect();
  assert_eq!(leaves.len(), 3);
  assert_eq!(tree.leaf_count(), 3);
  assert_eq!(tree.depth(), 3);

  let data: Vec<u32> = leaves.iter().map(|l| l.data_index).collect();
  assert_eq!(data, vec![0, 1, 2], "left-first depth-first order");

  let volume: f32 = leaves.iter().map(|l| l.bounds.size().element_product()).sum();
  assert!((volume - 1.0).abs() < 1e-6, "leaf volumes must sum to root volume");

  for leaf in &leaves {
    let center = leaf.bounds.center();
    assert_eq!(tree.locate(center).node, leaf.node);
  }
}
