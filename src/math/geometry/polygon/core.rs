// src/math/geometry/polygon/core.rs

use crate::math::{error::*, types::*};
use std::fmt;

/// Polygon-Struktur auf dem Integer-Raster.
///
/// Geschlossene Polygone speichern den Schlusspunkt nicht doppelt; die Kante vom letzten
/// zum ersten Vertex ist implizit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    pub points: Vec<IVec2>,
    /// Gibt an, ob das Polygon als geschlossen betrachtet wird.
    is_closed_flag: bool,
}

impl Polygon {
    /// Erstellt ein geschlossenes Polygon. Ein wiederholter Schlusspunkt wird entfernt.
    pub fn closed(mut points: Vec<IVec2>) -> NavResult<Self> {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return Err(NavmeshError::InsufficientPoints {
                expected: 3,
                actual: points.len(),
            });
        }
        Ok(Self {
            points,
            is_closed_flag: true,
        })
    }

    /// Erstellt eine offene Polylinie.
    pub fn open(points: Vec<IVec2>) -> NavResult<Self> {
        if points.len() < 2 {
            return Err(NavmeshError::InsufficientPoints {
                expected: 2,
                actual: points.len(),
            });
        }
        Ok(Self {
            points,
            is_closed_flag: false,
        })
    }

    /// Rechteck im Uhrzeigersinn.
    pub fn rectangle(rect: IntRect) -> Self {
        Self {
            points: rect.clockwise_corners().to_vec(),
            is_closed_flag: true,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed_flag
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fehler für Operationen, die eine geschlossene Kontur benötigen.
    pub fn require_closed(&self, operation: &str) -> NavResult<()> {
        if self.is_closed_flag {
            Ok(())
        } else {
            Err(NavmeshError::OpenContour {
                operation: operation.to_string(),
            })
        }
    }

    pub fn bounds(&self) -> Option<Bounds2D> {
        Bounds2D::from_points_iter(self.points.iter().map(|p| p.as_dvec2()))
    }

    /// Kehrt den Umlaufsinn um.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self {
            points,
            is_closed_flag: self.is_closed_flag,
        }
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Polygon({} vertices, {})",
            self.points.len(),
            if self.is_closed_flag { "closed" } else { "open" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_drops_repeated_endpoint() {
        let poly = Polygon::closed(vec![
            IVec2::new(0, 0),
            IVec2::new(0, 10),
            IVec2::new(10, 10),
            IVec2::new(0, 0),
        ])
        .unwrap();
        assert_eq!(poly.len(), 3);
        assert!(poly.is_closed());
    }

    #[test]
    fn test_open_contour_rejected() {
        let poly = Polygon::open(vec![IVec2::new(0, 0), IVec2::new(5, 5)]).unwrap();
        assert!(matches!(
            poly.require_closed("punch"),
            Err(NavmeshError::OpenContour { .. })
        ));
    }

    #[test]
    fn test_insufficient_points() {
        assert!(matches!(
            Polygon::closed(vec![IVec2::ZERO, IVec2::ONE]),
            Err(NavmeshError::InsufficientPoints { expected: 3, actual: 2 })
        ));
    }
}
