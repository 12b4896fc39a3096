// src/math/geometry/polygon/properties.rs

use super::Polygon;
use crate::math::types::*;
use geo::coordinate_position::{CoordPos, CoordinatePosition};

/// Lage eines Punktes relativ zu einer Fläche
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClassification {
    Inside,
    OnBoundary,
    Outside,
}

impl From<CoordPos> for PointClassification {
    fn from(pos: CoordPos) -> Self {
        match pos {
            CoordPos::Inside => Self::Inside,
            CoordPos::OnBoundary => Self::OnBoundary,
            CoordPos::Outside => Self::Outside,
        }
    }
}

/// Vorzeichenbehaftete Fläche (Shoelace, exakt in i64). CCW positiv.
pub fn signed_area(points: &[IVec2]) -> f64 {
    signed_area_doubled(points) as f64 * 0.5
}

/// Doppelte vorzeichenbehaftete Fläche, exakt.
pub fn signed_area_doubled(points: &[IVec2]) -> i64 {
    let n = points.len();
    if n < 3 {
        return 0;
    }
    (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
        })
        .sum()
}

pub fn signed_area_f64(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    0.5 * (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum::<f64>()
}

pub fn clockness(points: &[IVec2]) -> Option<Clockness> {
    Clockness::from_signed_area(signed_area_doubled(points) as f64)
}

/// Bringt eine Kontur in den gewünschten Drehsinn.
pub fn oriented(mut points: Vec<IVec2>, target: Clockness) -> Vec<IVec2> {
    if clockness(&points).is_some_and(|c| c != target) {
        points.reverse();
    }
    points
}

/// Kreuzprodukt der Kanten (prev -> cur) und (cur -> next), exakt.
pub fn turn(prev: IVec2, cur: IVec2, next: IVec2) -> i64 {
    let a = cur - prev;
    let b = next - cur;
    a.x as i64 * b.y as i64 - a.y as i64 * b.x as i64
}

fn line_string(points: &[IVec2]) -> geo::LineString<f64> {
    let mut coords: Vec<geo::Coord<f64>> = points
        .iter()
        .map(|p| geo::coord! { x: p.x as f64, y: p.y as f64 })
        .collect();
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }
    geo::LineString::new(coords)
}

/// Fläche aus Außenkontur und Lochkonturen im geo-Format.
pub fn region_polygon(outer: &[IVec2], holes: &[&[IVec2]]) -> geo::Polygon<f64> {
    geo::Polygon::new(
        line_string(outer),
        holes.iter().map(|h| line_string(h)).collect(),
    )
}

/// Klassifiziert einen Punkt gegen eine Fläche.
pub fn classify_point(region: &geo::Polygon<f64>, point: Point2D) -> PointClassification {
    region.coordinate_position(&to_coord(point)).into()
}

impl Polygon {
    /// Vorzeichenbehaftete Fläche (0 für offene Polylinien)
    pub fn signed_area(&self) -> f64 {
        if self.is_closed() {
            signed_area(&self.points)
        } else {
            0.0
        }
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn clockness(&self) -> Option<Clockness> {
        if self.is_closed() {
            clockness(&self.points)
        } else {
            None
        }
    }

    /// Prüft ob ein Punkt im Inneren oder auf dem Rand liegt.
    pub fn contains_point(&self, point: Point2D) -> bool {
        self.is_closed()
            && classify_point(&region_polygon(&self.points, &[]), point)
                != PointClassification::Outside
    }
}
