// src/navmesh/visibility.rs

use crate::math::{
    algorithms::SearchGraph,
    geometry::{PolyNodeId, PolygonTree, polygon::properties},
    spatial::SegmentBvh,
    types::*,
    utils::constants,
};

/// Maximale Bisektionstiefe, wenn sich die Randstrahlen eines Winkelbereichs uneinig sind.
const MAX_RANGE_SUBDIVISION: u32 = 8;

/// Miter länger als `MITER_LIMIT * dilation` werden abgeschrägt.
const MITER_LIMIT: f64 = 2.0;

/// Wegpunkte einer Kontur: alle Ecken mit Linksdrehung.
///
/// Da Land rechts jeder Kante liegt, sind das genau die konvexen Hindernisecken.
pub fn find_contour_waypoints(contour: &[IVec2]) -> Vec<Point2D> {
    let n = contour.len();
    if n < 3 {
        return Vec::new();
    }
    (0..n)
        .filter(|&i| properties::turn(contour[(i + n - 1) % n], contour[i], contour[(i + 1) % n]) > 0)
        .map(|i| contour[i].as_dvec2())
        .collect()
}

/// Barrieren eines Landknotens: eigene Kontur und direkte Löcher, jeweils um `dilation`
/// vom Land weg verschoben und an beiden Enden um `expansion` verlängert.
pub fn find_contour_and_child_hole_barriers(
    tree: &PolygonTree,
    land: PolyNodeId,
    dilation: f64,
    expansion: f64,
) -> Vec<DoubleLineSegment2> {
    let node = tree.node(land);
    let mut barriers = offset_contour_barriers(&node.contour, dilation, expansion);
    for hole in tree.child_contours(land) {
        barriers.extend(offset_contour_barriers(hole, dilation, expansion));
    }
    barriers
}

fn offset_contour_barriers(contour: &[IVec2], dilation: f64, expansion: f64) -> Vec<DoubleLineSegment2> {
    let points: Vec<Point2D> = contour.iter().map(|p| p.as_dvec2()).collect();
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    // Linke Normale zeigt vom Land weg
    let normal = |a: Point2D, b: Point2D| (b - a).normalize_or_zero().perp();
    let mut offset = Vec::with_capacity(n + n / 2);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let n1 = normal(prev, cur);
        let n2 = normal(cur, next);
        let denom = 1.0 + n1.dot(n2);
        let miter = if denom > constants::EPSILON {
            Some((n1 + n2) / denom)
        } else {
            None
        };
        match miter {
            Some(m) if m.length() <= MITER_LIMIT => offset.push(cur + m * dilation),
            _ => {
                offset.push(cur + n1 * dilation);
                offset.push(cur + n2 * dilation);
            }
        }
    }

    let m = offset.len();
    (0..m)
        .filter_map(|i| {
            let a = offset[i];
            let b = offset[(i + 1) % m];
            let dir = (b - a).normalize_or_zero();
            (dir != Point2D::ZERO).then(|| DoubleLineSegment2::new(a - dir * expansion, b + dir * expansion))
        })
        .collect()
}

/// Winkelbereich `[start, end)` mit dem nächsten verdeckenden Barrierensegment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityRange {
    pub start: f64,
    pub end: f64,
    pub segment: Option<usize>,
    /// Untere Schranke des Abstands² zur Verdeckung im Bereich
    pub min_dist_sq: f64,
}

/// Radiale Zerlegung des von `origin` aus sichtbaren Raums.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityPolygon {
    pub origin: Point2D,
    /// Aufsteigend sortiert, deckt `[ranges[0].start, ranges[0].start + TAU)` ab
    pub ranges: Vec<VisibilityRange>,
}

impl VisibilityPolygon {
    pub fn compute(origin: Point2D, barriers: &SegmentBvh) -> Self {
        let mut angles: Vec<f64> = barriers
            .items()
            .iter()
            .flat_map(|s| [s.a, s.b])
            .filter(|p| p.distance_squared(origin) > constants::EPSILON_SQUARED)
            .map(|p| {
                let d = p - origin;
                d.y.atan2(d.x)
            })
            .collect();
        angles.sort_by(f64::total_cmp);
        angles.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

        if angles.is_empty() {
            return Self {
                origin,
                ranges: vec![VisibilityRange {
                    start: -constants::PI,
                    end: constants::PI,
                    segment: None,
                    min_dist_sq: f64::INFINITY,
                }],
            };
        }

        let reach = barriers
            .bounds()
            .map(|b| b.union(&Bounds2D::from_points(origin, origin)))
            .map(|b| (b.width() + b.height()) * 2.0 + 1.0)
            .unwrap_or(1.0);
        let probe = |angle: f64| {
            barriers
                .nearest_ray_hit(origin, Point2D::new(angle.cos(), angle.sin()), reach)
                .map(|(index, _)| index)
        };

        let mut ranges = Vec::with_capacity(angles.len());
        let count = angles.len();
        for i in 0..count {
            let start = angles[i];
            let end = if i + 1 < count {
                angles[i + 1]
            } else {
                angles[0] + constants::TAU
            };
            if end - start > 1e-12 {
                subdivide(origin, barriers, &probe, start, end, 0, &mut ranges);
            }
        }
        Self { origin, ranges }
    }

    fn range_index(&self, angle: f64) -> Option<usize> {
        let first = self.ranges.first()?.start;
        let mut a = angle;
        while a < first {
            a += constants::TAU;
        }
        while a >= first + constants::TAU {
            a -= constants::TAU;
        }
        let index = self.ranges.partition_point(|r| r.end <= a);
        Some(index.min(self.ranges.len() - 1))
    }

    /// Schneller Test; `None` heißt: exakte Prüfung nötig.
    pub fn quick_visible(&self, point: Point2D) -> Option<bool> {
        let d = point - self.origin;
        let dist_sq = d.length_squared();
        if dist_sq <= constants::EPSILON_SQUARED {
            return Some(true);
        }
        let range = &self.ranges[self.range_index(d.y.atan2(d.x))?];
        (dist_sq < range.min_dist_sq).then_some(true)
    }

    /// Sichtbarkeit von `point`; fällt auf einen exakten Segmenttest zurück.
    pub fn is_visible(&self, point: Point2D, barriers: &SegmentBvh) -> bool {
        match self.quick_visible(point) {
            Some(visible) => visible,
            None => !barriers.intersects_any(&DoubleLineSegment2::new(self.origin, point)),
        }
    }
}

fn subdivide<P>(
    origin: Point2D,
    barriers: &SegmentBvh,
    probe: &P,
    start: f64,
    end: f64,
    depth: u32,
    out: &mut Vec<VisibilityRange>,
) where
    P: Fn(f64) -> Option<usize>,
{
    let delta = (end - start) * 1e-3;
    let left = probe(start + delta);
    let right = probe(end - delta);
    if left != right && depth < MAX_RANGE_SUBDIVISION {
        let mid = 0.5 * (start + end);
        subdivide(origin, barriers, probe, start, mid, depth + 1, out);
        subdivide(origin, barriers, probe, mid, end, depth + 1, out);
        return;
    }

    let distance = |segment: Option<usize>| {
        segment
            .and_then(|i| barriers.get(i))
            .map(|s| s.distance_squared_to_point(origin))
            .unwrap_or(f64::INFINITY)
    };
    let min_dist_sq = if left == right {
        distance(left)
    } else {
        distance(left).min(distance(right))
    };
    // Strahlen, die nichts treffen, dürfen keinen Freibrief geben, wenn sich die Enden uneinig sind
    let min_dist_sq = if left != right && (left.is_none() || right.is_none()) {
        0.0
    } else {
        min_dist_sq
    };
    out.push(VisibilityRange {
        start,
        end,
        segment: left.or(right),
        min_dist_sq,
    });
}

/// Sichtbarkeitsgraph im CSR-Format; Kosten sind euklidische Abstände.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorVisibilityGraph {
    pub offsets: Vec<usize>,
    pub targets: Vec<usize>,
    pub costs: Vec<f64>,
}

impl SectorVisibilityGraph {
    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    pub fn neighbors(&self, vertex: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[vertex]..self.offsets[vertex + 1];
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.costs[range].iter().copied())
    }

    pub fn edge_cost(&self, from: usize, to: usize) -> Option<f64> {
        self.neighbors(from).find(|(t, _)| *t == to).map(|(_, c)| c)
    }
}

impl SearchGraph for SectorVisibilityGraph {
    fn node_count(&self) -> usize {
        self.vertex_count()
    }

    fn for_each_neighbor(&self, node: usize, visit: &mut dyn FnMut(usize, f64)) {
        for (target, cost) in self.neighbors(node) {
            visit(target, cost);
        }
    }
}

/// Sichtbarkeitspolygone aller Wegpunkte.
pub fn compute_waypoint_visibility_polygons(waypoints: &[Point2D], barriers: &SegmentBvh) -> Vec<VisibilityPolygon> {
    waypoints
        .iter()
        .map(|w| VisibilityPolygon::compute(*w, barriers))
        .collect()
}

/// Paarweiser Sichtbarkeitstest, beschleunigt durch die Sichtbarkeitspolygone.
///
/// Jedes Paar wird genau einmal geprüft und in beide Richtungen eingetragen.
pub fn compute_visibility_graph(
    vertices: &[Point2D],
    polygons: &[VisibilityPolygon],
    barriers: &SegmentBvh,
) -> SectorVisibilityGraph {
    extend_visibility_graph(&SectorVisibilityGraph::default(), vertices, polygons, barriers)
}

/// Erweitert `base`, der die ersten `base.vertex_count()` Knoten abdeckt, um die übrigen.
///
/// Geprüft werden nur Paare mit mindestens einem neuen Knoten.
pub fn extend_visibility_graph(
    base: &SectorVisibilityGraph,
    vertices: &[Point2D],
    polygons: &[VisibilityPolygon],
    barriers: &SegmentBvh,
) -> SectorVisibilityGraph {
    let n = vertices.len();
    let known = base.vertex_count().min(n);
    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for (i, list) in adjacency.iter_mut().enumerate().take(known) {
        list.extend(base.neighbors(i).filter(|(j, _)| *j < n));
    }
    for i in 0..n {
        for j in (i + 1).max(known)..n {
            let visible = match polygons.get(i) {
                Some(polygon) => polygon.is_visible(vertices[j], barriers),
                None => !barriers.intersects_any(&DoubleLineSegment2::new(vertices[i], vertices[j])),
            };
            if visible {
                let cost = vertices[i].distance(vertices[j]);
                adjacency[i].push((j, cost));
                adjacency[j].push((i, cost));
            }
        }
    }

    let mut graph = SectorVisibilityGraph {
        offsets: Vec::with_capacity(n + 1),
        ..Default::default()
    };
    graph.offsets.push(0);
    for list in adjacency {
        for (target, cost) in list {
            graph.targets.push(target);
            graph.costs.push(cost);
        }
        graph.offsets.push(graph.targets.len());
    }
    graph
}

/// Prüft direkt gegen die Barrieren, ob zwei Punkte sich sehen.
pub fn segment_is_clear(a: Point2D, b: Point2D, barriers: &SegmentBvh) -> bool {
    a.distance_squared(b) <= constants::EPSILON_SQUARED
        || !barriers.intersects_any(&DoubleLineSegment2::new(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::geometry::{Polygon, polygon::operations::punch};
    use approx::assert_abs_diff_eq;

    /// Quadrat [0,100]² mit Loch [40,60]²
    fn square_with_hole() -> PolygonTree {
        let outer = Polygon::rectangle(IntRect::new(IVec2::ZERO, IVec2::splat(100)));
        let hole = Polygon::rectangle(IntRect::new(IVec2::splat(40), IVec2::splat(60)));
        punch(&[outer], &[hole]).unwrap()
    }

    fn barriers_of(tree: &PolygonTree) -> (PolyNodeId, SegmentBvh) {
        let land = tree.land_nodes().next().unwrap();
        let barriers = find_contour_and_child_hole_barriers(tree, land, 2.0, 1.0);
        (land, SegmentBvh::from_segments(barriers, 4))
    }

    #[test]
    fn test_waypoints_are_hole_corners_only() {
        let tree = square_with_hole();
        let land = tree.land_nodes().next().unwrap();
        // Außenkontur hat keine konvexen Hindernisecken
        assert!(find_contour_waypoints(&tree.node(land).contour).is_empty());
        let hole = tree.child_contours(land)[0];
        let mut waypoints = find_contour_waypoints(hole);
        waypoints.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        assert_eq!(
            waypoints,
            vec![
                Point2D::new(40.0, 40.0),
                Point2D::new(40.0, 60.0),
                Point2D::new(60.0, 40.0),
                Point2D::new(60.0, 60.0),
            ]
        );
    }

    #[test]
    fn test_barriers_stay_away_from_land() {
        let tree = square_with_hole();
        let (_, bvh) = barriers_of(&tree);
        assert_eq!(bvh.len(), 8);
        for barrier in bvh.items() {
            // Lochbarrieren liegen im Loch, Außenbarrieren außerhalb des Quadrats
            let mid = barrier.midpoint();
            let inside_hole = mid.x > 40.0 && mid.x < 60.0 && mid.y > 40.0 && mid.y < 60.0;
            let outside = mid.x < 0.0 || mid.x > 100.0 || mid.y < 0.0 || mid.y > 100.0;
            assert!(inside_hole || outside, "{barrier:?}");
        }
        // Ecke zu Ecke entlang einer Lochkante bleibt frei
        assert!(!bvh.intersects_any(&DoubleLineSegment2::new(
            Point2D::new(40.0, 40.0),
            Point2D::new(60.0, 40.0)
        )));
        // Diagonale durch das Loch ist blockiert
        assert!(bvh.intersects_any(&DoubleLineSegment2::new(
            Point2D::new(40.0, 40.0),
            Point2D::new(60.0, 60.0)
        )));
    }

    #[test]
    fn test_visibility_polygon_agrees_with_exact_test() {
        let tree = square_with_hole();
        let (_, bvh) = barriers_of(&tree);
        let polygon = VisibilityPolygon::compute(Point2D::new(20.0, 50.0), &bvh);
        assert!(!polygon.ranges.is_empty());
        let total: f64 = polygon.ranges.iter().map(|r| r.end - r.start).sum();
        assert_abs_diff_eq!(total, constants::TAU, epsilon = 1e-9);

        for x in (5..100).step_by(10) {
            for y in (5..100).step_by(10) {
                let target = Point2D::new(x as f64, y as f64);
                let exact = !bvh.intersects_any(&DoubleLineSegment2::new(polygon.origin, target));
                assert_eq!(polygon.is_visible(target, &bvh), exact, "{target}");
                if polygon.quick_visible(target) == Some(true) {
                    assert!(exact);
                }
            }
        }
        assert!(!polygon.is_visible(Point2D::new(80.0, 50.0), &bvh));
        assert!(polygon.is_visible(Point2D::new(20.0, 90.0), &bvh));
    }

    #[test]
    fn test_visibility_graph_is_symmetric() {
        let tree = square_with_hole();
        let (land, bvh) = barriers_of(&tree);
        let mut vertices = find_contour_waypoints(tree.child_contours(land)[0]);
        vertices.push(Point2D::new(10.0, 10.0));
        vertices.push(Point2D::new(90.0, 90.0));
        let polygons = compute_waypoint_visibility_polygons(&vertices, &bvh);
        let graph = compute_visibility_graph(&vertices, &polygons, &bvh);
        assert_eq!(graph.vertex_count(), vertices.len());

        for i in 0..graph.vertex_count() {
            for (j, cost) in graph.neighbors(i) {
                assert_eq!(graph.edge_cost(j, i), Some(cost));
                assert_abs_diff_eq!(cost, vertices[i].distance(vertices[j]), epsilon = 1e-12);
            }
        }
        // Gegenüberliegende Außenecken sehen sich nicht
        assert_eq!(graph.edge_cost(4, 5), None);
    }

    #[test]
    fn test_extended_graph_matches_full_rebuild() {
        let tree = square_with_hole();
        let (land, bvh) = barriers_of(&tree);
        let waypoints = find_contour_waypoints(tree.child_contours(land)[0]);
        let polygons = compute_waypoint_visibility_polygons(&waypoints, &bvh);
        let base = compute_visibility_graph(&waypoints, &polygons, &bvh);

        let mut vertices = waypoints.clone();
        vertices.push(Point2D::new(10.0, 50.0));
        vertices.push(Point2D::new(90.0, 50.0));
        let all_polygons = compute_waypoint_visibility_polygons(&vertices, &bvh);
        let extended = extend_visibility_graph(&base, &vertices, &all_polygons, &bvh);
        let full = compute_visibility_graph(&vertices, &all_polygons, &bvh);

        assert_eq!(extended.vertex_count(), full.vertex_count());
        assert_eq!(extended.edge_count(), full.edge_count());
        for i in 0..full.vertex_count() {
            for (j, cost) in full.neighbors(i) {
                assert_eq!(extended.edge_cost(i, j), Some(cost));
            }
        }
        // Links und rechts des Lochs sehen sich nicht
        assert_eq!(extended.edge_cost(4, 5), None);
    }
}
