// src/math/geometry/mod.rs

pub mod polygon;

pub use self::polygon::{
    Polygon, PolyNodeId, PolyNodeTag, PolygonTree,
    operations::{ClipRegion, ConvexHullComputer, PolygonOffset},
};
