// src/lib.rs
pub mod debug;
pub mod math;
pub mod navmesh;

pub mod prelude {
    pub use crate::math::prelude::*;
    pub use crate::navmesh::{
        HoleId, HoleShape, NavmeshConfig, OverlayNodeId, Pathfinder, Roadmap, SectorId,
        TerrainOverlayNetwork, TerrainService, TerrainSnapshot, TerrainStaticMetadata,
    };
}
