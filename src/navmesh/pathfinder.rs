// src/navmesh/pathfinder.rs

use super::{
    crossover::CrossoverLink,
    ids::*,
    overlay::{TerrainOverlayNetwork, TerrainOverlayNetworkNode},
};
use crate::math::{
    algorithms::{AugmentedGraph, Dijkstra, TieBreak},
    types::*,
};
use bevy::log::debug;

/// Ein Punkt der Route, lokal im Sektor des Knotens und in Weltkoordinaten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadmapStep {
    pub node: OverlayNodeId,
    pub sector: SectorId,
    pub local: Point2D,
    pub world: Point3D,
}

/// Gefundene Route. Beim Sektorwechsel erscheint derselbe Weltpunkt zweimal,
/// einmal je Knoten.
#[derive(Debug, Clone, PartialEq)]
pub struct Roadmap {
    pub steps: Vec<RoadmapStep>,
    pub total_distance: f64,
}

impl Roadmap {
    pub fn world_points(&self) -> impl Iterator<Item = Point3D> + '_ {
        self.steps.iter().map(|s| s.world)
    }

    /// Länge der Polylinie in Weltkoordinaten
    pub fn world_length(&self) -> f64 {
        self.steps.windows(2).map(|w| w[0].world.distance(w[1].world)).sum()
    }

    pub fn sectors(&self) -> Vec<SectorId> {
        let mut sectors: Vec<SectorId> = self.steps.iter().map(|s| s.sector).collect();
        sectors.dedup();
        sectors
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pathfinder {
    tie_break: TieBreak,
}

impl Pathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn try_find_path_world(
        &self,
        network: &TerrainOverlayNetwork,
        from: Point3D,
        to: Point3D,
    ) -> Option<Roadmap> {
        let Some((from_node, from_local)) = network.try_find_terrain_overlay_node(from) else {
            debug!("No overlay node at start {from}");
            return None;
        };
        let Some((to_node, to_local)) = network.try_find_terrain_overlay_node(to) else {
            debug!("No overlay node at destination {to}");
            return None;
        };
        self.try_find_path(network, from_node, from_local, to_node, to_local)
    }

    /// Kürzester Weg zwischen zwei lokalen Punkten auf Knoten des Netzes.
    ///
    /// Suchgraph: alle Übergangspunkte des Netzes plus eine virtuelle Quelle und ein
    /// virtuelles Ziel. Liegen beide Punkte im selben Knoten, gibt es zusätzlich eine
    /// direkte Kante mit den Kosten der lokalen Suche.
    pub fn try_find_path(
        &self,
        network: &TerrainOverlayNetwork,
        from: OverlayNodeId,
        from_local: Point2D,
        to: OverlayNodeId,
        to_local: Point2D,
    ) -> Option<Roadmap> {
        let from_node = network.node(from)?;
        let to_node = network.node(to)?;
        if !from_node.contains_local_point(from_local) || !to_node.contains_local_point(to_local) {
            debug!("Path endpoint outside of land: {from_local} / {to_local}");
            return None;
        }

        let graph = network.crossover_graph();
        let source_links = from_node.crossover_points.find_optimal_links_to_crossovers(from_local);
        let target_links = to_node.crossover_points.find_optimal_links_to_crossovers(to_local);
        let direct = (from == to)
            .then(|| from_node.crossover_points.find_local_path(from_local, to_local))
            .flatten();

        let augmented = AugmentedGraph::new(
            &graph.graph,
            source_links
                .iter()
                .map(|l| (graph.global_index(from, l.crossover), l.cost))
                .collect(),
            target_links
                .iter()
                .map(|l| (graph.global_index(to, l.crossover), l.cost)),
        )
        .with_direct_edge(direct.as_ref().map(|p| p.cost));
        let (source, target) = (augmented.source(), augmented.target());
        let tree = Dijkstra::new()
            .with_tie_break(self.tie_break)
            .with_terminals(vec![target])
            .run(&augmented, &[(source, 0.0)]);

        let Some(total_distance) = tree.distance(target) else {
            debug!("No path between {from:?} and {to:?}");
            return None;
        };
        let path = tree.path_to(target)?;
        let crossings: Vec<(OverlayNodeId, usize)> = path[1..path.len() - 1]
            .iter()
            .map(|&global| graph.resolve(global))
            .collect();

        let mut builder = RoadmapBuilder::default();
        match (crossings.first(), crossings.last()) {
            (Some(&(first_node, first)), Some(&(last_node, last))) => {
                let link = find_link(&source_links, first)?;
                builder.extend(from_node, from_node.crossover_points.route_from_point(from_local, link)?);
                for pair in crossings.windows(2) {
                    let ((a_node, a), (b_node, b)) = (pair[0], pair[1]);
                    let node = network.node(b_node)?;
                    if a_node == b_node {
                        builder.extend(node, node.crossover_points.crossover_route(a, b)?);
                    } else {
                        builder.extend(node, vec![node.crossover_points.crossovers()[b]]);
                    }
                }
                debug_assert_eq!((first_node, last_node), (from, to));
                let link = find_link(&target_links, last)?;
                let mut tail = to_node.crossover_points.route_from_point(to_local, link)?;
                tail.reverse();
                builder.extend(to_node, tail);
            }
            _ => builder.extend(from_node, direct?.points),
        }

        debug!(
            "Path {from:?} -> {to:?}: distance {total_distance:.2}, {} crossings",
            crossings.len()
        );
        Some(Roadmap {
            steps: builder.steps,
            total_distance,
        })
    }
}

fn find_link(links: &[CrossoverLink], crossover: usize) -> Option<&CrossoverLink> {
    links.iter().find(|l| l.crossover == crossover)
}

#[derive(Default)]
struct RoadmapBuilder {
    steps: Vec<RoadmapStep>,
}

impl RoadmapBuilder {
    /// Hängt lokale Punkte an; Wiederholungen im selben Knoten entfallen.
    fn extend(&mut self, node: &TerrainOverlayNetworkNode, points: Vec<Point2D>) {
        for local in points {
            let duplicate = self
                .steps
                .last()
                .is_some_and(|s| s.node == node.id && s.local.distance_squared(local) < 1e-12);
            if !duplicate {
                self.steps.push(RoadmapStep {
                    node: node.id,
                    sector: node.sector.id,
                    local,
                    world: node.local_to_world(local),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::geometry::Polygon;
    use crate::navmesh::{sector::TerrainStaticMetadata, service::TerrainService};
    use approx::assert_abs_diff_eq;

    fn square_sector_service() -> TerrainService {
        let boundary = IntRect::new(IVec2::ZERO, IVec2::splat(1000));
        let metadata = TerrainStaticMetadata::rectangle(boundary)
            .with_excluded(Polygon::rectangle(IntRect::new(IVec2::splat(100), IVec2::splat(400))));
        let mut service = TerrainService::default();
        service.add_sector(metadata, DAffine3::IDENTITY).unwrap();
        service
    }

    #[test]
    fn test_routes_around_dilated_hole() {
        let snapshot = square_sector_service().compile_snapshot();
        let network = snapshot
            .overlay_network_manager()
            .compile_terrain_overlay_network(15.0)
            .unwrap();
        let roadmap = Pathfinder::new()
            .try_find_path_world(&network, DVec3::new(50.0, 50.0, 0.0), DVec3::new(950.0, 950.0, 0.0))
            .unwrap();

        let straight = 900.0 * 2f64.sqrt();
        assert!(roadmap.total_distance > straight);
        // Umweg über eine Ecke des dilatierten Lochs, nicht weiter außen herum
        assert!(roadmap.total_distance < 35f64.hypot(365.0) + 865f64.hypot(535.0) + 10.0);
        assert_abs_diff_eq!(roadmap.world_length(), roadmap.total_distance, epsilon = 1e-6);
        assert_eq!(roadmap.sectors(), vec![SectorId(0)]);

        let first = roadmap.steps.first().unwrap();
        let last = roadmap.steps.last().unwrap();
        assert_eq!(first.local, Point2D::new(50.0, 50.0));
        assert_eq!(last.local, Point2D::new(950.0, 950.0));
        // Jeder Punkt hält den Agentenradius zum Loch [100, 400]² ein (bis auf Rasterung)
        for step in &roadmap.steps {
            let p = step.local;
            let dx = (100.0 - p.x).max(p.x - 400.0).max(0.0);
            let dy = (100.0 - p.y).max(p.y - 400.0).max(0.0);
            assert!(dx.hypot(dy) >= 13.0, "step {p:?} inside the dilated hole");
        }
    }

    #[test]
    fn test_endpoint_inside_hole_has_no_path() {
        let snapshot = square_sector_service().compile_snapshot();
        let network = snapshot
            .overlay_network_manager()
            .compile_terrain_overlay_network(15.0)
            .unwrap();
        let pathfinder = Pathfinder::new();
        assert!(
            pathfinder
                .try_find_path_world(&network, DVec3::new(50.0, 50.0, 0.0), DVec3::new(250.0, 250.0, 0.0))
                .is_none()
        );

        let (node, _) = network
            .try_find_terrain_overlay_node(DVec3::new(50.0, 50.0, 0.0))
            .unwrap();
        assert!(
            pathfinder
                .try_find_path(&network, node, Point2D::new(50.0, 50.0), node, Point2D::new(250.0, 250.0))
                .is_none()
        );
    }

    #[test]
    fn test_tie_break_keeps_cost() {
        let snapshot = square_sector_service().compile_snapshot();
        let network = snapshot
            .overlay_network_manager()
            .compile_terrain_overlay_network(15.0)
            .unwrap();
        let from = DVec3::new(50.0, 50.0, 0.0);
        let to = DVec3::new(950.0, 950.0, 0.0);
        let a = Pathfinder::new().try_find_path_world(&network, from, to).unwrap();
        let b = Pathfinder::new()
            .with_tie_break(TieBreak::ReverseInsertionOrder)
            .try_find_path_world(&network, from, to)
            .unwrap();
        assert_abs_diff_eq!(a.total_distance, b.total_distance, epsilon = 1e-9);
    }
}
