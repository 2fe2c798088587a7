//! Binary space partitioning over the guided volume.
//!
//! The tree is an index-addressed node pool. Leaves point into the region
//! storage, inner nodes hold an axis-aligned split plane and the index of the
//! first of two adjacent children.
//!
//! ```text
//!            [0] Inner x < 0.5
//!             /            \
//!     [1] Leaf r0      [2] Inner y < 0.25
//!                        /          \
//!                 [3] Leaf r1    [4] Leaf r2
//! ```
//!
//! # Module Structure
//!
//! - [`node`]: `TreeNode` - leaf/inner tagged node
//! - [`spatial_tree`]: `SpatialTree` - node pool, descent, leaf iteration
//! - [`builder`]: `TreeBuilder` - statistics-driven build and incremental update

pub mod builder;
pub mod node;
pub mod spatial_tree;

// Re-exports
pub use builder::{BuildOutcome, TreeBuilder};
pub use node::TreeNode;
pub use spatial_tree::{LeafLocation, Leaves, SpatialTree};
