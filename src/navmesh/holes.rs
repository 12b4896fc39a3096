// src/navmesh/holes.rs

use super::{ids::*, sector::SectorNodeDescription};
use crate::math::{
    geometry::{Polygon, polygon::operations::ConvexHullComputer},
    types::*,
    utils::constants,
};

/// Form eines dynamischen Lochs im lokalen System des Lochs.
#[derive(Debug, Clone, PartialEq)]
pub enum HoleShape {
    /// Kugel um den Ursprung
    Sphere { radius: f64 },
    /// Grundfläche in der XY-Ebene, entlang +Z extrudiert
    Prism { base: Vec<Point2D>, height: f64 },
    /// Flaches Rechteck in der XY-Ebene, zentriert
    Rectangle { half_extents: Point2D },
}

impl HoleShape {
    /// Eckpunkte bzw. Stützpunkte im lokalen System des Lochs.
    fn local_support_points(&self) -> Vec<Point3D> {
        match self {
            HoleShape::Sphere { radius } => {
                let r = *radius;
                vec![Point3D::splat(-r), Point3D::splat(r)]
            }
            HoleShape::Prism { base, height } => base
                .iter()
                .flat_map(|p| [p.extend(0.0), p.extend(*height)])
                .collect(),
            HoleShape::Rectangle { half_extents } => {
                let h = *half_extents;
                vec![
                    Point3D::new(-h.x, -h.y, 0.0),
                    Point3D::new(h.x, -h.y, 0.0),
                    Point3D::new(h.x, h.y, 0.0),
                    Point3D::new(-h.x, h.y, 0.0),
                ]
            }
        }
    }

    /// Welt-AABB der Form unter der gegebenen Transformation.
    pub fn world_bounds(&self, transform: &DAffine3) -> Bounds3D {
        let points = self.local_support_points();
        match self {
            // Achsenparallele Box der Kugel transformieren ergibt eine konservative Hülle
            HoleShape::Sphere { radius } => {
                let center = transform.translation;
                let scale = max_axis_scale(transform);
                Bounds3D {
                    min: center - Point3D::splat(radius * scale),
                    max: center + Point3D::splat(radius * scale),
                }
            }
            _ => Bounds3D::from_points_iter(points.into_iter().map(|p| transform.transform_point3(p)))
                .unwrap_or(Bounds3D::empty()),
        }
    }

    /// Projiziert die Form auf die Ebene eines Sektors.
    ///
    /// `None`, wenn die Form die Sektorebene (± Toleranz) nicht schneidet oder entartet ist.
    pub fn try_project_onto(
        &self,
        hole_transform: &DAffine3,
        sector: &SectorNodeDescription,
        tolerance: f64,
        arc_segments: usize,
    ) -> Option<Polygon> {
        let to_local = sector.inverse_transform * *hole_transform;
        let points: Vec<Point2D> = match self {
            HoleShape::Sphere { radius } => {
                let center = to_local.transform_point3(Point3D::ZERO);
                let world_radius = radius * max_axis_scale(hole_transform);
                let local_radius = world_radius / max_axis_scale(&sector.world_transform);
                let reach = local_radius + tolerance;
                if center.z.abs() > reach {
                    return None;
                }
                // Schnittkreis mit der Ebene, mindestens Toleranz-dick
                let section = (reach * reach - center.z * center.z).sqrt().min(local_radius);
                let section = section.max(tolerance.min(local_radius));
                let step = constants::TAU / arc_segments as f64;
                (0..arc_segments)
                    .map(|k| {
                        let angle = step * k as f64;
                        center.truncate() + Point2D::new(angle.cos(), angle.sin()) * section
                    })
                    .collect()
            }
            HoleShape::Prism { .. } | HoleShape::Rectangle { .. } => {
                let local: Vec<Point3D> = self
                    .local_support_points()
                    .into_iter()
                    .map(|p| to_local.transform_point3(p))
                    .collect();
                let min_z = local.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
                let max_z = local.iter().map(|p| p.z).fold(f64::NEG_INFINITY, f64::max);
                if min_z > tolerance || max_z < -tolerance {
                    return None;
                }
                let flat: Vec<Point2D> = local.iter().map(|p| p.truncate()).collect();
                ConvexHullComputer::new().compute_hull(&flat)
            }
        };

        let mut contour: Vec<IVec2> = points.into_iter().map(round_to_grid).collect();
        contour.dedup();
        Polygon::closed(contour).ok().filter(|p| p.area() > 0.0)
    }
}

fn max_axis_scale(transform: &DAffine3) -> f64 {
    let m = transform.matrix3;
    m.x_axis.length().max(m.y_axis.length()).max(m.z_axis.length())
}

/// Dynamisches Loch: Form, Welt-Transformation und Version.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicTerrainHoleDescription {
    pub id: HoleId,
    pub shape: HoleShape,
    world_transform: DAffine3,
    version: Version,
}

impl DynamicTerrainHoleDescription {
    pub fn new(id: HoleId, shape: HoleShape, world_transform: DAffine3) -> Self {
        Self {
            id,
            shape,
            world_transform,
            version: Version::INITIAL,
        }
    }

    pub fn world_transform(&self) -> &DAffine3 {
        &self.world_transform
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Setzt die Transformation und erhöht die Version.
    pub fn set_world_transform(&mut self, transform: DAffine3) -> Version {
        self.world_transform = transform;
        self.version.bump()
    }

    pub fn world_bounds(&self) -> Bounds3D {
        self.shape.world_bounds(&self.world_transform)
    }

    pub fn try_project_onto(&self, sector: &SectorNodeDescription, tolerance: f64, arc_segments: usize) -> Option<Polygon> {
        self.shape
            .try_project_onto(&self.world_transform, sector, tolerance, arc_segments)
    }
}
