// src/math/types/segment.rs

use super::*;
use crate::math::utils::simple_geometry;
use serde::{Deserialize, Serialize};

/// Drehsinn, z.B. von Konturen oder der Innenseite eines Übergangssegments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clockness {
    Clockwise,
    CounterClockwise,
}

impl Clockness {
    /// Drehsinn aus einer vorzeichenbehafteten Fläche (y nach oben).
    pub fn from_signed_area(area: f64) -> Option<Self> {
        if area > 0.0 {
            Some(Self::CounterClockwise)
        } else if area < 0.0 {
            Some(Self::Clockwise)
        } else {
            None
        }
    }
}

/// Liniensegment mit Float-Endpunkten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleLineSegment2 {
    pub a: Point2D,
    pub b: Point2D,
}

impl DoubleLineSegment2 {
    pub fn new(a: Point2D, b: Point2D) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    pub fn direction(&self) -> Point2D {
        (self.b - self.a).normalize_or_zero()
    }

    pub fn point_at(&self, t: f64) -> Point2D {
        self.a + (self.b - self.a) * t
    }

    pub fn midpoint(&self) -> Point2D {
        self.point_at(0.5)
    }

    pub fn bounds(&self) -> Bounds2D {
        Bounds2D::from_points(self.a, self.b)
    }

    pub fn is_degenerate(&self) -> bool {
        self.a.distance_squared(self.b) < crate::math::utils::constants::EPSILON_SQUARED
    }

    pub fn intersects(&self, other: &DoubleLineSegment2) -> bool {
        simple_geometry::segments_intersect(self.a, self.b, other.a, other.b)
    }

    /// Normale, die bei gegebenem Drehsinn zur Innenseite zeigt.
    pub fn inward_normal(&self, clockness: Clockness) -> Point2D {
        let left = self.direction().perp();
        match clockness {
            Clockness::CounterClockwise => left,
            Clockness::Clockwise => -left,
        }
    }

    pub fn distance_squared_to_point(&self, p: Point2D) -> f64 {
        simple_geometry::point_segment_distance_sq(p, self.a, self.b)
    }
}
