// src/navmesh/sector.rs

use super::ids::SectorId;
use crate::math::{error::*, geometry::Polygon, types::*, utils::simple_geometry};
use std::sync::Arc;

/// Statische Geländebeschreibung eines Sektors in lokalen Koordinaten.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainStaticMetadata {
    pub local_boundary: IntRect,
    /// Begehbare Flächen
    pub included_contours: Vec<Polygon>,
    /// Dauerhafte Löcher
    pub excluded_contours: Vec<Polygon>,
}

impl TerrainStaticMetadata {
    /// Rechteckiger Sektor, dessen gesamte Fläche begehbar ist.
    pub fn rectangle(boundary: IntRect) -> Self {
        Self {
            local_boundary: boundary,
            included_contours: vec![Polygon::rectangle(boundary)],
            excluded_contours: Vec::new(),
        }
    }

    pub fn with_included(mut self, contour: Polygon) -> Self {
        self.included_contours.push(contour);
        self
    }

    pub fn with_excluded(mut self, contour: Polygon) -> Self {
        self.excluded_contours.push(contour);
        self
    }

    pub fn validate(&self) -> NavResult<()> {
        if self.local_boundary.width() <= 0 || self.local_boundary.height() <= 0 {
            return Err(NavmeshError::InvalidMetadata {
                message: format!("Sector boundary {:?} has no area", self.local_boundary),
            });
        }
        if self.included_contours.is_empty() {
            return Err(NavmeshError::InvalidMetadata {
                message: "Sector needs at least one included contour".to_string(),
            });
        }
        for contour in self.included_contours.iter().chain(&self.excluded_contours) {
            contour.require_closed("sector metadata")?;
            if contour.len() < 3 {
                return Err(NavmeshError::InsufficientPoints {
                    expected: 3,
                    actual: contour.len(),
                });
            }
            if contour.area() == 0.0 {
                return Err(NavmeshError::InvalidMetadata {
                    message: format!("{contour} has zero area"),
                });
            }
        }
        Ok(())
    }
}

/// Knoten des Sektorgraphen: Metadaten plus Welt-Transformation.
///
/// Lokale 2D-Koordinaten liegen in der XY-Ebene (z = 0) des Sektors.
#[derive(Debug, Clone)]
pub struct SectorNodeDescription {
    pub id: SectorId,
    pub metadata: Arc<TerrainStaticMetadata>,
    pub world_transform: DAffine3,
    pub inverse_transform: DAffine3,
    pub world_bounds: Bounds3D,
}

impl SectorNodeDescription {
    pub fn new(id: SectorId, metadata: Arc<TerrainStaticMetadata>, world_transform: DAffine3) -> NavResult<Self> {
        metadata.validate()?;
        let inverse_transform = invert_transform(&world_transform, &format!("{id}"))?;
        let corners = metadata
            .local_boundary
            .to_bounds()
            .corners()
            .map(|c| local_to_world(&world_transform, c));
        let world_bounds = Bounds3D::from_points_iter(corners).unwrap_or(Bounds3D::empty());
        Ok(Self {
            id,
            metadata,
            world_transform,
            inverse_transform,
            world_bounds,
        })
    }

    pub fn local_to_world(&self, local: Point2D) -> Point3D {
        local_to_world(&self.world_transform, local)
    }

    /// Lokale Koordinaten; z ist der Abstand zur Sektorebene (in lokalen Einheiten).
    pub fn world_to_local(&self, world: Point3D) -> Point3D {
        self.inverse_transform.transform_point3(world)
    }
}

/// Invertiert eine Transformation oder meldet sie als singulär.
pub fn invert_transform(transform: &DAffine3, entity: &str) -> NavResult<DAffine3> {
    let determinant = transform.matrix3.determinant();
    if !determinant.is_finite() || determinant.abs() < 1e-12 {
        return Err(NavmeshError::NonInvertibleTransform {
            entity: entity.to_string(),
            determinant,
        });
    }
    Ok(transform.inverse())
}

/// Übergangssegment auf dem Sektorrand; der Drehsinn gibt die Innenseite an.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverSegment {
    pub segment: DoubleLineSegment2,
    pub inward: Clockness,
}

impl CrossoverSegment {
    pub fn new(segment: DoubleLineSegment2, inward: Clockness) -> Self {
        Self { segment, inward }
    }

    /// Innenseite ist die Seite, auf der das Zentrum des Sektors liegt.
    pub fn facing_into(segment: DoubleLineSegment2, boundary: &IntRect) -> Self {
        let side = simple_geometry::orient(segment.a, segment.b, boundary.center());
        let inward = if side >= 0.0 {
            Clockness::CounterClockwise
        } else {
            Clockness::Clockwise
        };
        Self { segment, inward }
    }

    pub fn inward_normal(&self) -> Point2D {
        self.segment.inward_normal(self.inward)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverSegmentPair {
    /// Im lokalen System des Quellsektors
    pub source: CrossoverSegment,
    /// Im lokalen System des Zielsektors
    pub destination: CrossoverSegment,
}

/// Gerichtete Nachbarschaft zweier Sektoren.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorEdgeDescription {
    pub source: SectorId,
    pub destination: SectorId,
    pub segments: Vec<CrossoverSegmentPair>,
}

impl SectorEdgeDescription {
    pub fn reversed(&self) -> Self {
        Self {
            source: self.destination,
            destination: self.source,
            segments: self
                .segments
                .iter()
                .map(|pair| CrossoverSegmentPair {
                    source: pair.destination,
                    destination: pair.source,
                })
                .collect(),
        }
    }
}
