// src/math/types/point.rs
use super::*;

// --- Konvertierungsfunktionen ---

pub fn to_spade(p: Point2D) -> SpadePoint {
    SpadePoint::new(p.x, p.y)
}

pub fn from_spade(p: SpadePoint) -> Point2D {
    Point2D::new(p.x, p.y)
}

pub fn to_coord(p: Point2D) -> geo::Coord<f64> {
    geo::coord! { x: p.x, y: p.y }
}

/// Rundet auf das Integer-Raster der Konturen.
pub fn round_to_grid(p: Point2D) -> IVec2 {
    IVec2::new(p.x.round() as i32, p.y.round() as i32)
}

/// Hebt einen lokalen Sektorpunkt in die Sektorebene (z = 0) und transformiert ihn.
pub fn local_to_world(transform: &DAffine3, local: Point2D) -> Point3D {
    transform.transform_point3(local.extend(0.0))
}
