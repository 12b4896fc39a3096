// src/math/geometry/polygon/mod.rs

pub mod core; // Enthält die Polygon-Struktur selbst
pub mod operations; // Boolean, Offset und konvexe Hülle
pub mod properties;
pub mod tree; // Land/Loch-Baum

pub use self::core::Polygon;
pub use self::properties::PointClassification;
pub use self::tree::{PolyNode, PolyNodeId, PolyNodeTag, PolygonTree};
