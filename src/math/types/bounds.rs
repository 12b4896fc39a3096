// src/math/types/bounds.rs

use crate::math::{error::*, types::*};
use std::fmt;

/// 2D Bounding Box (Axis-Aligned Bounding Box)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2D {
    pub min: Point2D,
    pub max: Point2D,
}

impl Bounds2D {
    /// Erstellt eine neue Bounding Box
    pub fn new(min: Point2D, max: Point2D) -> NavResult<Self> {
        if min.x > max.x || min.y > max.y {
            return Err(NavmeshError::InvalidConfiguration {
                message: format!("Invalid bounds: min {:?} > max {:?}", min, max),
            });
        }

        Ok(Self { min, max })
    }

    /// Erstellt eine Bounding Box aus zwei beliebigen Punkten
    pub fn from_points(p1: Point2D, p2: Point2D) -> Self {
        Self {
            min: p1.min(p2),
            max: p1.max(p2),
        }
    }

    /// Erstellt eine Bounding Box die alle Punkte umschließt
    pub fn from_points_iter<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point2D>,
    {
        let mut points_iter = points.into_iter();
        let first_point = points_iter.next()?;

        let mut bounds = Self {
            min: first_point,
            max: first_point,
        };
        for point in points_iter {
            bounds.expand_to_include_point(point);
        }

        Some(bounds)
    }

    /// Leere Bounding Box (ungültig)
    pub fn empty() -> Self {
        Self {
            min: Point2D::splat(f64::INFINITY),
            max: Point2D::splat(f64::NEG_INFINITY),
        }
    }

    /// Prüft ob die Bounding Box leer ist
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Breite der Bounding Box
    pub fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0)
    }

    /// Höhe der Bounding Box
    pub fn height(&self) -> f64 {
        (self.max.y - self.min.y).max(0.0)
    }

    /// Zentrum der Bounding Box
    pub fn center(&self) -> Point2D {
        (self.min + self.max) * 0.5
    }

    /// Prüft ob ein Punkt in der Bounding Box liegt
    pub fn contains_point(&self, point: Point2D) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Prüft ob sich zwei Bounding Boxes überschneiden
    pub fn intersects(&self, other: &Bounds2D) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Vereinigt zwei Bounding Boxes
    pub fn union(&self, other: &Bounds2D) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Erweitert die Bounding Box um einen Punkt
    pub fn expand_to_include_point(&mut self, point: Point2D) {
        if self.is_empty() {
            self.min = point;
            self.max = point;
        } else {
            self.min = self.min.min(point);
            self.max = self.max.max(point);
        }
    }

    /// Erweitert die Bounding Box um einen Margin
    pub fn expand(&self, margin: f64) -> Self {
        if self.is_empty() {
            return *self;
        }

        Self {
            min: self.min - Point2D::splat(margin),
            max: self.max + Point2D::splat(margin),
        }
    }

    /// Slab-Test: Eintrittsparameter des Strahls, falls er die Box vor `max_t` trifft.
    pub fn ray_entry(&self, origin: Point2D, inv_dir: Point2D, max_t: f64) -> Option<f64> {
        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;
        let t_min = t1.min(t2);
        let t_max = t1.max(t2);
        let enter = t_min.x.max(t_min.y).max(0.0);
        let exit = t_max.x.min(t_max.y).min(max_t);
        (enter <= exit).then_some(enter)
    }

    /// Erzeugt die vier Eckpunkte der Bounding Box
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.min,                             // unten links
            Point2D::new(self.max.x, self.min.y), // unten rechts
            self.max,                             // oben rechts
            Point2D::new(self.min.x, self.max.y), // oben links
        ]
    }
}

impl fmt::Display for Bounds2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Bounds2D(empty)")
        } else {
            write!(f, "Bounds2D({:?} to {:?})", self.min, self.max)
        }
    }
}

/// 3D Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3D {
    pub min: Point3D,
    pub max: Point3D,
}

impl Bounds3D {
    pub fn from_points_iter<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3D>,
    {
        let mut points_iter = points.into_iter();
        let first_point = points_iter.next()?;
        let (min, max) = points_iter.fold((first_point, first_point), |(min, max), p| {
            (min.min(p), max.max(p))
        });
        Some(Self { min, max })
    }

    pub fn empty() -> Self {
        Self {
            min: Point3D::splat(f64::INFINITY),
            max: Point3D::splat(f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Point3D {
        (self.min + self.max) * 0.5
    }

    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min: self.min - Point3D::splat(margin),
            max: self.max + Point3D::splat(margin),
        }
    }

    pub fn union(&self, other: &Bounds3D) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersects(&self, other: &Bounds3D) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, point: Point3D) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

/// Ganzzahliges Rechteck, beide Grenzen inklusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntRect {
    pub min: IVec2,
    pub max: IVec2,
}

impl IntRect {
    pub fn new(min: IVec2, max: IVec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Kleinstes ganzzahliges Rechteck, das die Float-Box enthält, plus Padding.
    pub fn enclosing(bounds: &Bounds2D, padding: i32) -> Self {
        let min = bounds.min.floor().as_ivec2() - IVec2::splat(padding);
        let max = bounds.max.ceil().as_ivec2() + IVec2::splat(padding);
        Self { min, max }
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2D {
        (self.min.as_dvec2() + self.max.as_dvec2()) * 0.5
    }

    pub fn contains_point(&self, point: IVec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &IntRect) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    pub fn intersects(&self, other: &IntRect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Eckpunkte im Uhrzeigersinn (Land-Orientierung).
    pub fn clockwise_corners(&self) -> [IVec2; 4] {
        [
            self.min,
            IVec2::new(self.min.x, self.max.y),
            self.max,
            IVec2::new(self.max.x, self.min.y),
        ]
    }

    pub fn to_bounds(&self) -> Bounds2D {
        Bounds2D {
            min: self.min.as_dvec2(),
            max: self.max.as_dvec2(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_union_and_intersects() {
        let a = Bounds2D::from_points(Point2D::new(0.0, 0.0), Point2D::new(2.0, 2.0));
        let b = Bounds2D::from_points(Point2D::new(3.0, 3.0), Point2D::new(1.0, 1.0));
        assert!(a.intersects(&b));
        let u = a.union(&b);
        assert_eq!(u.min, Point2D::new(0.0, 0.0));
        assert_eq!(u.max, Point2D::new(3.0, 3.0));
        assert!(!a.intersects(&Bounds2D::empty()));
    }

    #[test]
    fn test_ray_entry() {
        let b = Bounds2D::from_points(Point2D::new(5.0, -1.0), Point2D::new(6.0, 1.0));
        let dir = Point2D::new(1.0, 0.0);
        let inv = Point2D::ONE / dir;
        assert_eq!(b.ray_entry(Point2D::ZERO, inv, f64::INFINITY), Some(5.0));
        assert_eq!(b.ray_entry(Point2D::ZERO, inv, 4.0), None);
    }

    #[test]
    fn test_int_rect_enclosing() {
        let b = Bounds2D::from_points(Point2D::new(0.5, -0.5), Point2D::new(2.2, 3.0));
        let r = IntRect::enclosing(&b, 1);
        assert_eq!(r.min, IVec2::new(-1, -2));
        assert_eq!(r.max, IVec2::new(4, 4));
        assert!(r.contains_point(IVec2::new(0, 0)));
    }
}
