// src/math/spatial/mod.rs
pub mod bvh;
pub mod quadtree;

pub use bvh::{BoundingVolume, Bvh, SegmentBvh};
pub use quadtree::QuadTree;
