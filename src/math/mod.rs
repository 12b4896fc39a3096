// src/math/mod.rs
pub mod algorithms;
pub mod error;
pub mod geometry;
pub mod spatial;
pub mod types;
pub mod utils;

// Re-exports für einfache Verwendung
pub use error::{NavResult, NavmeshError};
pub use types::*;

// Öffentliche API
pub mod prelude {
    pub use super::{
        algorithms::{Dijkstra, SearchGraph, TieBreak},
        error::{NavResult, NavmeshError},
        geometry::{
            ClipRegion, ConvexHullComputer, PolyNodeId, PolyNodeTag, Polygon, PolygonOffset,
            PolygonTree,
        },
        spatial::{Bvh, QuadTree, SegmentBvh},
        types::*,
    };
}
