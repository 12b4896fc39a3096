// src/math/spatial/bvh.rs

use crate::math::{types::*, utils::simple_geometry};
use std::cell::Cell;

/// Achsenparallele Hüllkörper, über die eine [`Bvh`] aufgebaut werden kann.
pub trait BoundingVolume: Copy {
    const AXES: usize;

    fn empty() -> Self;
    fn merged(&self, other: &Self) -> Self;
    fn overlaps(&self, other: &Self) -> bool;
    /// Mittelpunkt entlang einer Achse
    fn center_on(&self, axis: usize) -> f64;
    /// Ausdehnung entlang einer Achse
    fn extent_on(&self, axis: usize) -> f64;
}

impl BoundingVolume for Bounds2D {
    const AXES: usize = 2;

    fn empty() -> Self {
        Bounds2D::empty()
    }

    fn merged(&self, other: &Self) -> Self {
        self.union(other)
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.intersects(other)
    }

    fn center_on(&self, axis: usize) -> f64 {
        self.center()[axis]
    }

    fn extent_on(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }
}

impl BoundingVolume for Bounds3D {
    const AXES: usize = 3;

    fn empty() -> Self {
        Bounds3D::empty()
    }

    fn merged(&self, other: &Self) -> Self {
        self.union(other)
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.intersects(other)
    }

    fn center_on(&self, axis: usize) -> f64 {
        self.center()[axis]
    }

    fn extent_on(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }
}

#[derive(Debug, Clone)]
enum BvhNodeKind {
    Leaf { first: usize, count: usize },
    Branch { left: usize, right: usize },
}

#[derive(Debug, Clone)]
struct BvhNode<B> {
    bounds: B,
    kind: BvhNodeKind,
}

/// Bounding Volume Hierarchy über beliebige Elemente.
///
/// Aufbau top-down: Teilung am Median der längsten Achse. Callbacks erhalten den
/// ursprünglichen Index des Elements.
#[derive(Debug, Clone)]
pub struct Bvh<B, T> {
    nodes: Vec<BvhNode<B>>,
    items: Vec<T>,
    item_bounds: Vec<B>,
    order: Vec<usize>,
    leaf_size: usize,
}

impl<B: BoundingVolume, T> Bvh<B, T> {
    pub fn build(items: Vec<(B, T)>, leaf_size: usize) -> Self {
        let (item_bounds, items): (Vec<B>, Vec<T>) = items.into_iter().unzip();
        let mut bvh = Self {
            nodes: Vec::with_capacity(2 * item_bounds.len() / leaf_size.max(1) + 1),
            order: (0..item_bounds.len()).collect(),
            items,
            item_bounds,
            leaf_size: leaf_size.max(1),
        };
        if !bvh.items.is_empty() {
            bvh.build_recursive(0, bvh.order.len());
        }
        bvh
    }

    fn build_recursive(&mut self, first: usize, count: usize) -> usize {
        let bounds = self.order[first..first + count]
            .iter()
            .fold(B::empty(), |acc, &i| acc.merged(&self.item_bounds[i]));
        let node_index = self.nodes.len();
        self.nodes.push(BvhNode {
            bounds,
            kind: BvhNodeKind::Leaf { first, count },
        });
        if count <= self.leaf_size {
            return node_index;
        }

        // Finde die längste Achse
        let axis = (1..B::AXES).fold(0, |best, axis| {
            if bounds.extent_on(axis) > bounds.extent_on(best) {
                axis
            } else {
                best
            }
        });
        let item_bounds = &self.item_bounds;
        self.order[first..first + count].sort_by(|&a, &b| {
            item_bounds[a]
                .center_on(axis)
                .total_cmp(&item_bounds[b].center_on(axis))
        });

        let split = count / 2;
        let left = self.build_recursive(first, split);
        let right = self.build_recursive(first + split, count - split);
        self.nodes[node_index].kind = BvhNodeKind::Branch { left, right };
        node_index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn bounds(&self) -> Option<B> {
        self.nodes.first().map(|n| n.bounds)
    }

    /// Allgemeine Traversierung: `descend` entscheidet pro Knoten-Box, `visit` pro Element.
    /// Gibt `visit` `false` zurück, wird abgebrochen.
    pub fn traverse<D, V>(&self, mut descend: D, mut visit: V)
    where
        D: FnMut(&B) -> bool,
        V: FnMut(usize, &B, &T) -> bool,
    {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !descend(&node.bounds) {
                continue;
            }
            match node.kind {
                BvhNodeKind::Leaf { first, count } => {
                    for &item in &self.order[first..first + count] {
                        if descend(&self.item_bounds[item])
                            && !visit(item, &self.item_bounds[item], &self.items[item])
                        {
                            return;
                        }
                    }
                }
                BvhNodeKind::Branch { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }

    /// Alle Elemente, deren Box `query` überlappt.
    pub fn query(&self, query: &B) -> Vec<usize> {
        let mut result = Vec::new();
        self.traverse(
            |b| b.overlaps(query),
            |i, _, _| {
                result.push(i);
                true
            },
        );
        result
    }

    /// Prüft ob ein Element mit überlappender Box das Prädikat erfüllt.
    pub fn any_overlapping<P>(&self, query: &B, mut predicate: P) -> bool
    where
        P: FnMut(usize, &T) -> bool,
    {
        let mut found = false;
        self.traverse(
            |b| b.overlaps(query),
            |i, _, item| {
                found = predicate(i, item);
                !found
            },
        );
        found
    }
}

/// BVH über 2D-Segmente (Barrieren, Konturkanten).
pub type SegmentBvh = Bvh<Bounds2D, DoubleLineSegment2>;

impl Bvh<Bounds2D, DoubleLineSegment2> {
    pub fn from_segments(segments: impl IntoIterator<Item = DoubleLineSegment2>, leaf_size: usize) -> Self {
        Self::build(
            segments
                .into_iter()
                .filter(|s| !s.is_degenerate())
                .map(|s| (s.bounds(), s))
                .collect(),
            leaf_size,
        )
    }

    /// Schneidet das Segment irgendein Segment der BVH?
    pub fn intersects_any(&self, segment: &DoubleLineSegment2) -> bool {
        self.any_overlapping(&segment.bounds(), |_, s| s.intersects(segment))
    }

    /// Nächster Treffer des Strahls `origin + t * dir`, als (Index, t).
    pub fn nearest_ray_hit(&self, origin: Point2D, dir: Point2D, max_t: f64) -> Option<(usize, f64)> {
        let inv_dir = Point2D::ONE / dir;
        let mut best: Option<(usize, f64)> = None;
        let limit = Cell::new(max_t);
        self.traverse(
            |b| b.ray_entry(origin, inv_dir, limit.get()).is_some(),
            |i, _, s| {
                if let Some(t) = simple_geometry::ray_segment_intersection(origin, dir, s.a, s.b) {
                    if t <= limit.get() {
                        limit.set(t);
                        best = Some((i, t));
                    }
                }
                true
            },
        );
        best
    }

    /// Alle Schnittparameter des Segments mit den Segmenten der BVH (entlang `segment`).
    pub fn intersection_params(&self, segment: &DoubleLineSegment2) -> Vec<f64> {
        let mut params = Vec::new();
        self.traverse(
            |b| b.overlaps(&segment.bounds()),
            |_, _, s| {
                if let Some((t, _)) = simple_geometry::segment_intersection_params(
                    segment.a, segment.b, s.a, s.b,
                ) {
                    params.push(t);
                }
                true
            },
        );
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_segments() -> Vec<DoubleLineSegment2> {
        (0..20)
            .map(|i| {
                let x = i as f64 * 10.0;
                DoubleLineSegment2::new(Point2D::new(x, 0.0), Point2D::new(x, 5.0))
            })
            .collect()
    }

    #[test]
    fn test_query_matches_brute_force() {
        let segments = grid_segments();
        let bvh = SegmentBvh::from_segments(segments.clone(), 2);
        let query = Bounds2D::from_points(Point2D::new(25.0, 1.0), Point2D::new(61.0, 2.0));
        let mut hits = bvh.query(&query);
        hits.sort();
        let expected: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.bounds().intersects(&query))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hits, expected);
    }

    #[test]
    fn test_intersects_any() {
        let bvh = SegmentBvh::from_segments(grid_segments(), 4);
        let crossing = DoubleLineSegment2::new(Point2D::new(15.0, 2.0), Point2D::new(25.0, 2.0));
        let free = DoubleLineSegment2::new(Point2D::new(11.0, 2.0), Point2D::new(19.0, 2.0));
        assert!(bvh.intersects_any(&crossing));
        assert!(!bvh.intersects_any(&free));
    }

    #[test]
    fn test_nearest_ray_hit() {
        let bvh = SegmentBvh::from_segments(grid_segments(), 3);
        let (index, t) = bvh
            .nearest_ray_hit(Point2D::new(33.0, 2.0), Point2D::new(1.0, 0.0), f64::INFINITY)
            .unwrap();
        assert_eq!(index, 4);
        assert!((t - 7.0).abs() < 1e-9);
        assert!(bvh.nearest_ray_hit(Point2D::new(33.0, 8.0), Point2D::new(1.0, 0.0), f64::INFINITY).is_none());
    }

    #[test]
    fn test_bvh_3d_point_query() {
        let boxes: Vec<(Bounds3D, usize)> = (0..10)
            .map(|i| {
                let min = Point3D::new(i as f64 * 2.0, 0.0, 0.0);
                (Bounds3D { min, max: min + Point3D::ONE }, i)
            })
            .collect();
        let bvh = Bvh::build(boxes, 1);
        let p = Point3D::new(6.5, 0.5, 0.5);
        let hits = bvh.query(&Bounds3D { min: p, max: p });
        assert_eq!(hits, vec![3]);
    }
}
