// src/math/geometry/polygon/operations/offset.rs

use super::boolean::{self, ClipRegion};
use crate::math::geometry::polygon::{Polygon, tree::PolygonTree};
use crate::math::{error::*, types::*, utils::constants};

/// Art des Offsets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetOperation {
    /// Fläche um `r` vergrößern (Minkowski-Summe)
    Dilate(f64),
    /// Fläche um `r` verkleinern (Minkowski-Differenz)
    Erode(f64),
}

/// Offset-Builder: `PolygonOffset::new().include(..)?.dilate(r).execute()`.
///
/// Die Scheibe wird durch ein umschriebenes regelmäßiges n-Eck angenähert, d.h. der
/// Offset ist nie kleiner als `r`.
#[derive(Debug, Clone)]
pub struct PolygonOffset {
    region: ClipRegion,
    operation: Option<OffsetOperation>,
    arc_segments: usize,
}

impl Default for PolygonOffset {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonOffset {
    pub fn new() -> Self {
        Self {
            region: ClipRegion::new(),
            operation: None,
            arc_segments: 16,
        }
    }

    pub fn with_arc_segments(mut self, segments: usize) -> Self {
        self.arc_segments = segments.max(4);
        self
    }

    /// Fügt geschlossene Konturen als Fläche hinzu.
    pub fn include(mut self, polygons: &[Polygon]) -> NavResult<Self> {
        for polygon in polygons {
            self.region.add_polygon(polygon)?;
        }
        Ok(self)
    }

    /// Fügt einen ganzen Baum (inklusive Löchern) hinzu.
    pub fn include_tree(mut self, tree: &PolygonTree) -> Self {
        self.region.add_tree(tree);
        self
    }

    pub fn dilate(mut self, radius: f64) -> Self {
        self.operation = Some(OffsetOperation::Dilate(radius));
        self
    }

    pub fn erode(mut self, radius: f64) -> Self {
        self.operation = Some(OffsetOperation::Erode(radius));
        self
    }

    pub fn execute(&self) -> NavResult<PolygonTree> {
        let base = boolean::union(&self.region);
        let Some(operation) = self.operation else {
            return Ok(base);
        };

        let radius = match operation {
            OffsetOperation::Dilate(r) | OffsetOperation::Erode(r) => r,
        };
        if !radius.is_finite() || radius < 0.0 {
            return Err(NavmeshError::InvalidConfiguration {
                message: format!("Offset radius must be finite and non-negative, got {radius}"),
            });
        }
        if radius < constants::EPSILON || base.is_empty() {
            return Ok(base);
        }

        let sweep = self.boundary_sweep(&base, radius);
        let base_region = ClipRegion::from_tree(&base);
        Ok(match operation {
            OffsetOperation::Dilate(_) => {
                let mut combined = base_region;
                combined.extend(&sweep);
                boolean::union(&combined)
            }
            OffsetOperation::Erode(_) => boolean::punch_regions(&base_region, &sweep),
        })
    }

    /// Überstreicht jeden Rand des Baums mit der Scheibe: ein Rechteck pro Kante und
    /// ein n-Eck pro Vertex.
    fn boundary_sweep(&self, tree: &PolygonTree, radius: f64) -> ClipRegion {
        let n = self.arc_segments;
        let step = constants::TAU / n as f64;
        let circumradius = radius / (constants::PI / n as f64).cos();

        let mut sweep = ClipRegion::new();
        for (_, contour) in tree.contours() {
            let points: Vec<Point2D> = contour.iter().map(|p| p.as_dvec2()).collect();
            for (i, &a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                let dir = b - a;
                let length = dir.length();
                if length > constants::EPSILON {
                    let normal = dir.perp() / length * radius;
                    sweep.add_filled_contour(vec![a + normal, b + normal, b - normal, a - normal]);
                }

                let disk = (0..n)
                    .map(|k| {
                        let angle = step * k as f64 + step * 0.5;
                        a + Point2D::new(angle.cos(), angle.sin()) * circumradius
                    })
                    .collect();
                sweep.add_filled_contour(disk);
            }
        }
        sweep
    }
}
