// src/math/types/mod.rs
pub mod bounds;
pub mod point;
pub mod segment;

pub use bounds::*;
pub use point::*;
pub use segment::*;

// Re-export häufig verwendete externe Typen
pub use bevy::math::{DAffine3, DVec2, DVec3, IVec2};
pub use spade::Point2;

// Einheitliche Typen für das gesamte Modul
pub type Point2D = DVec2;
pub type Point3D = DVec3;
pub type SpadePoint = Point2<f64>;
