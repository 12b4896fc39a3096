// src/math/geometry/polygon/operations/convex_hull.rs
use crate::math::{types::*, utils::simple_geometry};

/// Konvexe Hülle nach Andrew's Monotone Chain (O(n log n)).
#[derive(Debug, Clone, Copy)]
pub struct ConvexHullComputer {
    tolerance: f64,
}

impl Default for ConvexHullComputer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvexHullComputer {
    pub fn new() -> Self {
        Self { tolerance: 1e-9 }
    }

    /// Hülle gegen den Uhrzeigersinn, ohne kollineare Punkte.
    ///
    /// Bei weniger als drei nicht kollinearen Punkten ist das Ergebnis ein Punkt oder eine
    /// Strecke (ein bzw. zwei Einträge).
    pub fn compute_hull(&self, points: &[Point2D]) -> Vec<Point2D> {
        let mut points = points.to_vec();

        // Sortiere Punkte lexikographisch (erst X, dann Y)
        points.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
        points.dedup_by(|a, b| {
            (a.x - b.x).abs() < self.tolerance && (a.y - b.y).abs() < self.tolerance
        });

        if points.len() < 3 {
            return points;
        }

        let mut lower_hull: Vec<Point2D> = Vec::new();
        for &point in &points {
            self.push_hull_point(&mut lower_hull, point);
        }
        let mut upper_hull: Vec<Point2D> = Vec::new();
        for &point in points.iter().rev() {
            self.push_hull_point(&mut upper_hull, point);
        }

        // Letzter Punkt jeder Kette ist der erste der anderen
        lower_hull.pop();
        upper_hull.pop();
        lower_hull.extend(upper_hull);
        lower_hull
    }

    fn push_hull_point(&self, hull: &mut Vec<Point2D>, point: Point2D) {
        while hull.len() >= 2 {
            let cross = simple_geometry::orient(hull[hull.len() - 2], hull[hull.len() - 1], point);
            if cross <= self.tolerance {
                hull.pop();
            } else {
                break;
            }
        }
        hull.push(point);
    }
}

/// Prüft ob ein Punkt in einer CCW-Hülle liegt (Rand eingeschlossen).
pub fn hull_contains_point(hull: &[Point2D], point: Point2D) -> bool {
    match hull.len() {
        0 => false,
        1 => hull[0].distance_squared(point) < 1e-18,
        2 => simple_geometry::point_segment_distance_sq(point, hull[0], hull[1]) < 1e-18,
        n => (0..n).all(|i| simple_geometry::orient(hull[i], hull[(i + 1) % n], point) >= 0.0),
    }
}

/// Prüft ob ein Segment die Hülle (Inneres oder Rand) berührt.
pub fn segment_touches_hull(hull: &[Point2D], s0: Point2D, s1: Point2D) -> bool {
    if hull_contains_point(hull, s0) || hull_contains_point(hull, s1) {
        return true;
    }
    let n = hull.len();
    match n {
        0 => false,
        1 => simple_geometry::point_segment_distance_sq(hull[0], s0, s1) < 1e-18,
        2 => simple_geometry::segments_intersect(hull[0], hull[1], s0, s1),
        _ => (0..n).any(|i| simple_geometry::segments_intersect(hull[i], hull[(i + 1) % n], s0, s1)),
    }
}
