// src/navmesh/mod.rs
pub mod config;
pub mod crossover;
pub mod holes;
pub mod ids;
pub mod local_geometry;
pub mod overlay;
pub mod pathfinder;
pub mod sector;
pub mod service;
pub mod triangulation;
pub mod visibility;

pub use config::NavmeshConfig;
pub use holes::{DynamicTerrainHoleDescription, HoleShape};
pub use ids::{AgentRadiusKey, HoleId, OverlayNodeId, SectorId, Version};
pub use local_geometry::{LocalGeometryJob, LocalGeometryView, LocalGeometryViewManager};
pub use overlay::{TerrainOverlayNetwork, TerrainOverlayNetworkManager};
pub use pathfinder::{Pathfinder, Roadmap, RoadmapStep};
pub use sector::{
    CrossoverSegment, CrossoverSegmentPair, SectorEdgeDescription, SectorNodeDescription,
    TerrainStaticMetadata,
};
pub use service::{TerrainService, TerrainSnapshot};
