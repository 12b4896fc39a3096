// src/navmesh/crossover.rs

use super::{
    local_geometry::{PunchedLand, PunchedLandNode},
    visibility::{self, SectorVisibilityGraph, VisibilityPolygon},
};
use crate::math::{
    algorithms::{AugmentedGraph, Dijkstra, ShortestPathTree},
    geometry::polygon::operations::{ConvexHullComputer, convex_hull},
    types::*,
};
use bevy::log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Übergangspunkte, die über dasselbe Segment eingefügt wurden.
#[derive(Debug, Clone)]
pub struct CrossoverGroup {
    pub segment: DoubleLineSegment2,
    pub crossovers: Vec<usize>,
}

/// Verbindung eines freien Punkts zu einem Übergangspunkt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverLink {
    pub crossover: usize,
    pub cost: f64,
    /// Erster Graphknoten auf dem Weg vom Punkt aus
    pub via: usize,
}

/// Lokaler Weg innerhalb eines Landknotens.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPath {
    pub cost: f64,
    pub points: Vec<Point2D>,
}

/// Zählerstände für Profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossoverDiagnostics {
    pub invocations: u64,
    pub candidate_visibility_checks: u64,
    pub hull_fast_path_hits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    invocations: AtomicU64,
    candidate_visibility_checks: AtomicU64,
    hull_fast_path_hits: AtomicU64,
}

#[derive(Debug)]
struct CrossoverGraph {
    vertices: Vec<Point2D>,
    polygons: Vec<VisibilityPolygon>,
    graph: SectorVisibilityGraph,
    /// Je Übergangspunkt ein Kürzeste-Wege-Baum über alle Graphknoten
    trees: Vec<ShortestPathTree>,
    /// `distances[c][v]`; `NaN` = nicht erreichbar
    distances: Vec<Vec<f64>>,
}

/// Verwaltet die Übergangspunkte eines Landknotens und dessen Sichtbarkeitsgraph.
///
/// Graphknoten sind zuerst die Wegpunkte des Landknotens, danach alle Übergangspunkte,
/// die nicht mit einem Wegpunkt zusammenfallen.
#[derive(Debug)]
pub struct CrossoverPointManager {
    land: Arc<PunchedLand>,
    node: usize,
    dedup_distance: f64,
    crossovers: Vec<Point2D>,
    crossover_vertex: Vec<usize>,
    extra_vertices: Vec<Point2D>,
    groups: Vec<CrossoverGroup>,
    graph: OnceLock<CrossoverGraph>,
    counters: Counters,
}

impl CrossoverPointManager {
    pub fn new(land: Arc<PunchedLand>, node: usize, dedup_distance: f64) -> Self {
        Self {
            land,
            node,
            dedup_distance,
            crossovers: Vec::new(),
            crossover_vertex: Vec::new(),
            extra_vertices: Vec::new(),
            groups: Vec::new(),
            graph: OnceLock::new(),
            counters: Counters::default(),
        }
    }

    pub fn land(&self) -> &Arc<PunchedLand> {
        &self.land
    }

    pub fn land_node(&self) -> &PunchedLandNode {
        &self.land.nodes[self.node]
    }

    pub fn crossovers(&self) -> &[Point2D] {
        &self.crossovers
    }

    pub fn groups(&self) -> &[CrossoverGroup] {
        &self.groups
    }

    fn waypoints(&self) -> &[Point2D] {
        &self.land_node().waypoints
    }

    /// Fügt Übergangspunkte eines Segments hinzu und liefert ihre Indizes.
    ///
    /// Punkte, die schon als Übergangspunkt existieren, werden wiederverwendet; Punkte auf
    /// einem Wegpunkt teilen sich dessen Graphknoten.
    pub fn add_many(&mut self, segment: DoubleLineSegment2, points: &[Point2D]) -> Vec<usize> {
        let tolerance_sq = self.dedup_distance * self.dedup_distance;
        let group_index = match self.groups.iter().position(|g| {
            g.segment.a.distance_squared(segment.a) <= tolerance_sq
                && g.segment.b.distance_squared(segment.b) <= tolerance_sq
        }) {
            Some(index) => index,
            None => {
                self.groups.push(CrossoverGroup {
                    segment,
                    crossovers: Vec::new(),
                });
                self.groups.len() - 1
            }
        };

        let mut indices = Vec::with_capacity(points.len());
        for &point in points {
            let existing = self
                .crossovers
                .iter()
                .position(|c| c.distance_squared(point) <= tolerance_sq);
            let index = match existing {
                Some(index) => index,
                None => {
                    let vertex = match self
                        .waypoints()
                        .iter()
                        .position(|w| w.distance_squared(point) <= tolerance_sq)
                    {
                        Some(waypoint) => waypoint,
                        None => {
                            self.extra_vertices.push(point);
                            self.waypoints().len() + self.extra_vertices.len() - 1
                        }
                    };
                    self.crossovers.push(point);
                    self.crossover_vertex.push(vertex);
                    self.crossovers.len() - 1
                }
            };
            if !self.groups[group_index].crossovers.contains(&index) {
                self.groups[group_index].crossovers.push(index);
            }
            indices.push(index);
        }
        self.graph = OnceLock::new();
        indices
    }

    fn compiled(&self) -> &CrossoverGraph {
        self.graph.get_or_init(|| {
            let land_node = self.land_node();
            let barriers = &land_node.barriers;
            let waypoint_visibility = land_node.waypoint_visibility();
            let mut vertices = self.waypoints().to_vec();
            vertices.extend(self.extra_vertices.iter().copied());
            let mut polygons = waypoint_visibility.polygons.clone();
            polygons.extend(visibility::compute_waypoint_visibility_polygons(&self.extra_vertices, barriers));
            let graph = visibility::extend_visibility_graph(&waypoint_visibility.graph, &vertices, &polygons, barriers);

            let dijkstra = Dijkstra::new();
            let trees: Vec<ShortestPathTree> = self
                .crossover_vertex
                .iter()
                .map(|&v| dijkstra.run(&graph, &[(v, 0.0)]))
                .collect();
            let distances = trees
                .iter()
                .map(|tree| {
                    (0..vertices.len())
                        .map(|v| tree.distance(v).unwrap_or(f64::NAN))
                        .collect()
                })
                .collect();
            debug!(
                "{}: visibility graph with {} vertices / {} edges, {} crossovers",
                land_node.context.sector,
                vertices.len(),
                graph.edge_count(),
                self.crossovers.len()
            );
            CrossoverGraph {
                vertices,
                polygons,
                graph,
                trees,
                distances,
            }
        })
    }

    pub fn visibility_graph(&self) -> &SectorVisibilityGraph {
        &self.compiled().graph
    }

    pub fn graph_vertices(&self) -> &[Point2D] {
        &self.compiled().vertices
    }

    pub fn visibility_polygons(&self) -> &[VisibilityPolygon] {
        &self.compiled().polygons
    }

    /// Kürzeste Distanz zwischen zwei Übergangspunkten; `NaN` wenn unerreichbar.
    pub fn crossover_distance(&self, from: usize, to: usize) -> f64 {
        let compiled = self.compiled();
        match (compiled.distances.get(from), self.crossover_vertex.get(to)) {
            (Some(row), Some(&vertex)) => row[vertex],
            _ => f64::NAN,
        }
    }

    /// Polylinie zwischen zwei Übergangspunkten.
    pub fn crossover_route(&self, from: usize, to: usize) -> Option<Vec<Point2D>> {
        let compiled = self.compiled();
        let vertices = compiled.trees.get(from)?.path_to(*self.crossover_vertex.get(to)?)?;
        Some(vertices.into_iter().map(|v| compiled.vertices[v]).collect())
    }

    /// Polylinie von einem freien Punkt über `link` zum Übergangspunkt.
    pub fn route_from_point(&self, point: Point2D, link: &CrossoverLink) -> Option<Vec<Point2D>> {
        let compiled = self.compiled();
        let mut vertices = compiled.trees.get(link.crossover)?.path_to(link.via)?;
        vertices.reverse();
        let mut route = vec![point];
        route.extend(vertices.into_iter().map(|v| compiled.vertices[v]));
        Some(route)
    }

    /// Sichtbare Graphknoten vom Punkt aus, als `(Knoten, Abstand)`.
    fn visible_vertices(&self, point: Point2D) -> Vec<(usize, f64)> {
        let compiled = self.compiled();
        let barriers = &self.land_node().barriers;
        let polygon = VisibilityPolygon::compute(point, barriers);
        let mut visible = vec![false; compiled.vertices.len()];
        let mut decided = vec![false; compiled.vertices.len()];

        // Gemeinsame Sichtbarkeit ganzer Segmentgruppen über die konvexe Hülle
        let hull_computer = ConvexHullComputer::new();
        for group in &self.groups {
            if group.crossovers.is_empty() {
                continue;
            }
            let mut points: Vec<Point2D> = group.crossovers.iter().map(|&c| self.crossovers[c]).collect();
            points.push(point);
            let hull = hull_computer.compute_hull(&points);
            let Some(bounds) = Bounds2D::from_points_iter(hull.iter().copied()) else {
                continue;
            };
            let blocked = barriers.any_overlapping(&bounds, |_, s| convex_hull::segment_touches_hull(&hull, s.a, s.b));
            if !blocked {
                self.counters.hull_fast_path_hits.fetch_add(1, Ordering::Relaxed);
                for &c in &group.crossovers {
                    let v = self.crossover_vertex[c];
                    visible[v] = true;
                    decided[v] = true;
                }
            }
        }

        let mut checks = 0u64;
        for (v, vertex) in compiled.vertices.iter().enumerate() {
            if !decided[v] {
                checks += 1;
                visible[v] = polygon.is_visible(*vertex, barriers);
            }
        }
        self.counters
            .candidate_visibility_checks
            .fetch_add(checks, Ordering::Relaxed);

        visible
            .iter()
            .enumerate()
            .filter(|(_, is_visible)| **is_visible)
            .map(|(v, _)| (v, point.distance(compiled.vertices[v])))
            .collect()
    }

    /// Günstigste Anbindung eines freien Punkts an jeden erreichbaren Übergangspunkt.
    pub fn find_optimal_links_to_crossovers(&self, point: Point2D) -> Vec<CrossoverLink> {
        self.counters.invocations.fetch_add(1, Ordering::Relaxed);
        let visible = self.visible_vertices(point);
        let compiled = self.compiled();

        (0..self.crossovers.len())
            .filter_map(|c| {
                visible
                    .iter()
                    .filter_map(|&(v, direct)| {
                        let rest = compiled.distances[c][v];
                        (!rest.is_nan()).then_some((v, direct + rest))
                    })
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(via, cost)| CrossoverLink {
                        crossover: c,
                        cost,
                        via,
                    })
            })
            .collect()
    }

    /// Kürzester Weg zwischen zwei freien Punkten innerhalb des Landknotens.
    pub fn find_local_path(&self, from: Point2D, to: Point2D) -> Option<LocalPath> {
        let barriers = &self.land_node().barriers;
        if visibility::segment_is_clear(from, to, barriers) {
            return Some(LocalPath {
                cost: from.distance(to),
                points: vec![from, to],
            });
        }

        let compiled = self.compiled();
        let augmented = AugmentedGraph::new(&compiled.graph, self.visible_vertices(from), self.visible_vertices(to));
        let (source, target) = (augmented.source(), augmented.target());
        let tree = Dijkstra::new()
            .with_terminals(vec![target])
            .run(&augmented, &[(source, 0.0)]);
        let cost = tree.distance(target)?;
        let points = tree
            .path_to(target)?
            .into_iter()
            .map(|v| match v {
                v if v == source => from,
                v if v == target => to,
                v => compiled.vertices[v],
            })
            .collect();
        Some(LocalPath { cost, points })
    }

    pub fn diagnostics(&self) -> CrossoverDiagnostics {
        CrossoverDiagnostics {
            invocations: self.counters.invocations.load(Ordering::Relaxed),
            candidate_visibility_checks: self.counters.candidate_visibility_checks.load(Ordering::Relaxed),
            hull_fast_path_hits: self.counters.hull_fast_path_hits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navmesh::{
        config::NavmeshConfig,
        ids::{SectorId, Version},
        local_geometry::{LocalGeometryJob, LocalGeometryView},
        sector::{CrossoverSegment, SectorNodeDescription, TerrainStaticMetadata},
    };
    use crate::math::geometry::Polygon;
    use approx::assert_abs_diff_eq;

    fn punched(radius: f64, crossovers: Vec<CrossoverSegment>) -> Arc<PunchedLand> {
        let boundary = IntRect::new(IVec2::ZERO, IVec2::splat(100));
        let metadata = TerrainStaticMetadata::rectangle(boundary)
            .with_excluded(Polygon::rectangle(IntRect::new(IVec2::splat(40), IVec2::splat(60))));
        let sector = SectorNodeDescription::new(SectorId(0), Arc::new(metadata), DAffine3::IDENTITY).unwrap();
        let job = LocalGeometryJob {
            sector: Arc::new(sector),
            crossover_segments: crossovers,
            holes: Vec::new(),
            version: Version(1),
            config: Arc::new(NavmeshConfig::default()),
        };
        LocalGeometryView::new(Arc::new(job), radius).punched_land().unwrap()
    }

    #[test]
    fn test_local_path_around_hole() {
        let land = punched(0.0, Vec::new());
        let manager = CrossoverPointManager::new(land, 0, 0.5);
        let path = manager
            .find_local_path(Point2D::new(30.0, 50.0), Point2D::new(70.0, 50.0))
            .unwrap();
        assert_abs_diff_eq!(path.cost, 20.0 + 2.0 * 200f64.sqrt(), epsilon = 1e-6);
        assert_eq!(path.points.len(), 4);

        let direct = manager
            .find_local_path(Point2D::new(10.0, 10.0), Point2D::new(90.0, 10.0))
            .unwrap();
        assert_eq!(direct.points.len(), 2);
        assert_abs_diff_eq!(direct.cost, 80.0, epsilon = 1e-12);
    }

    #[test]
    fn test_add_many_dedups_against_crossovers_and_waypoints() {
        let land = punched(0.0, Vec::new());
        let mut manager = CrossoverPointManager::new(land, 0, 0.5);
        let segment = DoubleLineSegment2::new(Point2D::new(100.0, 0.0), Point2D::new(100.0, 100.0));
        let first = manager.add_many(segment, &[Point2D::new(100.0, 20.0), Point2D::new(100.0, 80.0)]);
        let again = manager.add_many(segment, &[Point2D::new(100.0, 20.2)]);
        assert_eq!(first, vec![0, 1]);
        assert_eq!(again, vec![0]);
        assert_eq!(manager.groups().len(), 1);

        // Fällt mit einer Lochecke zusammen
        let corner = manager.add_many(segment, &[Point2D::new(40.0, 40.0)]);
        assert_eq!(corner, vec![2]);
        assert_eq!(manager.graph_vertices().len(), 4 + 2);
    }

    #[test]
    fn test_links_and_counters() {
        let land = punched(0.0, Vec::new());
        let mut manager = CrossoverPointManager::new(land, 0, 0.5);
        let east = DoubleLineSegment2::new(Point2D::new(100.0, 0.0), Point2D::new(100.0, 100.0));
        manager.add_many(east, &[Point2D::new(98.0, 50.0)]);
        let west = DoubleLineSegment2::new(Point2D::new(0.0, 0.0), Point2D::new(0.0, 100.0));
        manager.add_many(west, &[Point2D::new(2.0, 50.0)]);

        let links = manager.find_optimal_links_to_crossovers(Point2D::new(20.0, 50.0));
        assert_eq!(links.len(), 2);
        let to_west = links.iter().find(|l| l.crossover == 1).unwrap();
        assert_abs_diff_eq!(to_west.cost, 18.0, epsilon = 1e-9);
        let to_east = links.iter().find(|l| l.crossover == 0).unwrap();
        // Über zwei Lochecken: (40,40) und (60,40)
        assert_abs_diff_eq!(to_east.cost, 500f64.sqrt() + 20.0 + 1544f64.sqrt(), epsilon = 1e-6);

        let route = manager.route_from_point(Point2D::new(20.0, 50.0), to_east).unwrap();
        assert_eq!(route.first(), Some(&Point2D::new(20.0, 50.0)));
        assert_eq!(route.last(), Some(&Point2D::new(98.0, 50.0)));

        let before = manager.diagnostics();
        assert_eq!(before.invocations, 1);
        assert!(before.hull_fast_path_hits >= 1);
        manager.find_optimal_links_to_crossovers(Point2D::new(80.0, 80.0));
        let after = manager.diagnostics();
        assert_eq!(after.invocations, 2);
        assert!(after.candidate_visibility_checks >= before.candidate_visibility_checks);

        assert_abs_diff_eq!(
            manager.crossover_distance(0, 1),
            manager.crossover_distance(1, 0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_unreachable_crossover_is_nan() {
        // Zwei getrennte Hälften: Loch schneidet das Quadrat vollständig
        let boundary = IntRect::new(IVec2::ZERO, IVec2::splat(100));
        let metadata = TerrainStaticMetadata::rectangle(boundary)
            .with_excluded(Polygon::rectangle(IntRect::new(IVec2::new(40, -10), IVec2::new(60, 110))));
        let sector = SectorNodeDescription::new(SectorId(0), Arc::new(metadata), DAffine3::IDENTITY).unwrap();
        let job = LocalGeometryJob {
            sector: Arc::new(sector),
            crossover_segments: Vec::new(),
            holes: Vec::new(),
            version: Version(1),
            config: Arc::new(NavmeshConfig::default()),
        };
        let land = LocalGeometryView::new(Arc::new(job), 0.0).punched_land().unwrap();
        assert_eq!(land.nodes.len(), 2);

        let left = land.find_land_node(Point2D::new(10.0, 50.0)).unwrap();
        let mut manager = CrossoverPointManager::new(land, left, 0.5);
        let segment = DoubleLineSegment2::new(Point2D::new(0.0, 0.0), Point2D::new(0.0, 100.0));
        manager.add_many(segment, &[Point2D::new(2.0, 50.0)]);
        // Punkt jenseits des Lochs, künstlich eingefügt
        manager.add_many(segment, &[Point2D::new(80.0, 50.0)]);
        assert!(manager.crossover_distance(0, 1).is_nan());
        assert!(manager.crossover_distance(0, 0) == 0.0);
    }
}
