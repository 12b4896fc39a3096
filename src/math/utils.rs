// src/math/utils.rs

/// Mathematische Konstanten
pub mod constants {
    pub const EPSILON: f64 = 1e-9;
    pub const EPSILON_SQUARED: f64 = EPSILON * EPSILON; // Für Vergleiche mit Längen
    pub const TAU: f64 = std::f64::consts::TAU;
    pub const PI: f64 = std::f64::consts::PI;
}

/// Geometrische Hilfsfunktionen (einfach, ohne komplexe Strukturen)
pub mod simple_geometry {
    use super::constants::EPSILON;
    use bevy::math::DVec2;

    /// Berechnet das Kreuzprodukt zweier 2D-Vektoren (Skalar)
    pub fn cross_product_2d(a: DVec2, b: DVec2) -> f64 {
        a.x * b.y - a.y * b.x
    }

    /// Orientierung des Tripels (a, b, c): > 0 bei Linksdrehung
    pub fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
        cross_product_2d(b - a, c - a)
    }

    /// Prüft ob sich zwei Segmente echt schneiden oder berühren.
    pub fn segments_intersect(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2) -> bool {
        let d1 = orient(b0, b1, a0);
        let d2 = orient(b0, b1, a1);
        let d3 = orient(a0, a1, b0);
        let d4 = orient(a0, a1, b1);

        if ((d1 > EPSILON && d2 < -EPSILON) || (d1 < -EPSILON && d2 > EPSILON))
            && ((d3 > EPSILON && d4 < -EPSILON) || (d3 < -EPSILON && d4 > EPSILON))
        {
            return true;
        }

        (d1.abs() <= EPSILON && on_segment(b0, b1, a0))
            || (d2.abs() <= EPSILON && on_segment(b0, b1, a1))
            || (d3.abs() <= EPSILON && on_segment(a0, a1, b0))
            || (d4.abs() <= EPSILON && on_segment(a0, a1, b1))
    }

    /// Setzt Kollinearität voraus und prüft nur die Bounding Box.
    fn on_segment(s0: DVec2, s1: DVec2, p: DVec2) -> bool {
        p.x >= s0.x.min(s1.x) - EPSILON
            && p.x <= s0.x.max(s1.x) + EPSILON
            && p.y >= s0.y.min(s1.y) - EPSILON
            && p.y <= s0.y.max(s1.y) + EPSILON
    }

    /// Schnittparameter (t auf a, u auf b) zweier nicht paralleler Segmente.
    pub fn segment_intersection_params(
        a0: DVec2,
        a1: DVec2,
        b0: DVec2,
        b1: DVec2,
    ) -> Option<(f64, f64)> {
        let r = a1 - a0;
        let s = b1 - b0;
        let denom = cross_product_2d(r, s);
        if denom.abs() < EPSILON {
            return None;
        }
        let qp = b0 - a0;
        let t = cross_product_2d(qp, s) / denom;
        let u = cross_product_2d(qp, r) / denom;
        if (-EPSILON..=1.0 + EPSILON).contains(&t) && (-EPSILON..=1.0 + EPSILON).contains(&u) {
            Some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
        } else {
            None
        }
    }

    /// Abstand des Strahls `origin + t * dir` (t >= 0) bis zum Segment, als t.
    pub fn ray_segment_intersection(origin: DVec2, dir: DVec2, s0: DVec2, s1: DVec2) -> Option<f64> {
        let s = s1 - s0;
        let denom = cross_product_2d(dir, s);
        if denom.abs() < EPSILON {
            return None;
        }
        let qp = s0 - origin;
        let t = cross_product_2d(qp, s) / denom;
        let u = cross_product_2d(qp, dir) / denom;
        if t >= 0.0 && (-EPSILON..=1.0 + EPSILON).contains(&u) {
            Some(t)
        } else {
            None
        }
    }

    /// Projiziert einen Punkt auf ein Segment
    pub fn closest_point_on_segment(point: DVec2, s0: DVec2, s1: DVec2) -> DVec2 {
        let line_vec = s1 - s0;
        let length_sq = line_vec.length_squared();
        if length_sq < EPSILON {
            return s0; // Segment ist ein Punkt
        }
        let t = ((point - s0).dot(line_vec) / length_sq).clamp(0.0, 1.0);
        s0 + line_vec * t
    }

    pub fn point_segment_distance_sq(point: DVec2, s0: DVec2, s1: DVec2) -> f64 {
        point.distance_squared(closest_point_on_segment(point, s0, s1))
    }

    /// Berechnet den Flächeninhalt eines Dreiecks (vorzeichenbehaftet, CCW positiv)
    pub fn triangle_signed_area(p1: DVec2, p2: DVec2, p3: DVec2) -> f64 {
        0.5 * orient(p1, p2, p3)
    }

    /// Prüft ob ein Punkt in einem CCW-Dreieck liegt (Rand eingeschlossen)
    pub fn point_in_triangle(point: DVec2, a: DVec2, b: DVec2, c: DVec2, tolerance: f64) -> bool {
        orient(a, b, point) >= -tolerance
            && orient(b, c, point) >= -tolerance
            && orient(c, a, point) >= -tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::simple_geometry::*;
    use approx::assert_abs_diff_eq;
    use bevy::math::DVec2;

    #[test]
    fn test_segments_intersect() {
        let a0 = DVec2::new(0.0, 0.0);
        let a1 = DVec2::new(10.0, 10.0);
        assert!(segments_intersect(a0, a1, DVec2::new(0.0, 10.0), DVec2::new(10.0, 0.0)));
        assert!(!segments_intersect(a0, a1, DVec2::new(5.0, 0.0), DVec2::new(10.0, 0.0)));
        // Berührung am Endpunkt
        assert!(segments_intersect(a0, a1, DVec2::new(10.0, 10.0), DVec2::new(20.0, 0.0)));
    }

    #[test]
    fn test_ray_segment_intersection() {
        let t = ray_segment_intersection(
            DVec2::ZERO,
            DVec2::X,
            DVec2::new(5.0, -1.0),
            DVec2::new(5.0, 1.0),
        );
        assert_abs_diff_eq!(t.unwrap_or(f64::NAN), 5.0, epsilon = 1e-9);
        assert!(
            ray_segment_intersection(DVec2::ZERO, -DVec2::X, DVec2::new(5.0, -1.0), DVec2::new(5.0, 1.0))
                .is_none()
        );
    }
}
