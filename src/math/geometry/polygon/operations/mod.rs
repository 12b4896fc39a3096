// src/math/geometry/polygon/operations/mod.rs
pub mod boolean;
pub mod convex_hull;
pub mod offset;

pub use boolean::{ClipRegion, punch, punch_regions, union};
pub use convex_hull::ConvexHullComputer;
pub use offset::{OffsetOperation, PolygonOffset};
