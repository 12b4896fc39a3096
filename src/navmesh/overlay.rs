// src/navmesh/overlay.rs

use super::{
    config::NavmeshConfig,
    crossover::CrossoverPointManager,
    ids::*,
    local_geometry::{LocalGeometryView, LocalGeometryViewManager, PunchedLand},
    sector::{CrossoverSegmentPair, SectorEdgeDescription, SectorNodeDescription},
};
use crate::math::{
    algorithms::AdjacencyGraph,
    error::*,
    spatial::Bvh,
    types::*,
};
use bevy::log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Landknoten eines Sektors als Knoten des Overlay-Netzes.
#[derive(Debug)]
pub struct TerrainOverlayNetworkNode {
    pub id: OverlayNodeId,
    pub sector: Arc<SectorNodeDescription>,
    pub view: Arc<LocalGeometryView>,
    pub land_index: usize,
    pub crossover_points: CrossoverPointManager,
    pub world_bounds: Bounds3D,
}

impl TerrainOverlayNetworkNode {
    pub fn contains_local_point(&self, local: Point2D) -> bool {
        self.crossover_points.land_node().contains_point(local)
    }

    pub fn local_to_world(&self, local: Point2D) -> Point3D {
        self.sector.local_to_world(local)
    }
}

/// Verbindung zweier Übergangspunkte benachbarter Knoten (Kosten 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayLink {
    pub source_crossover: usize,
    pub destination_crossover: usize,
}

/// Alle Links von einem Knoten zu einem Nachbarknoten.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainOverlayNetworkEdgeGroup {
    pub source: OverlayNodeId,
    pub destination: OverlayNodeId,
    pub links: Vec<OverlayLink>,
}

/// Kennzahlen eines Netzes, z.B. für Vergleiche nach Cache-Invalidierung.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkSummary {
    pub nodes: usize,
    pub edge_groups: usize,
    pub links: usize,
    pub crossovers: usize,
    /// Summe aller endlichen Kantenkosten des globalen Übergangsgraphen
    pub total_edge_cost: f64,
}

/// Graph über alle Übergangspunkte des Netzes.
///
/// Globaler Index = `offsets[knoten] + lokaler Übergangsindex`.
#[derive(Debug, Clone)]
pub struct CrossoverNetworkGraph {
    pub offsets: Vec<usize>,
    pub graph: AdjacencyGraph,
}

impl CrossoverNetworkGraph {
    pub fn global_index(&self, node: OverlayNodeId, crossover: usize) -> usize {
        self.offsets[node.0] + crossover
    }

    pub fn resolve(&self, global: usize) -> (OverlayNodeId, usize) {
        let node = self.offsets.partition_point(|&o| o <= global) - 1;
        (OverlayNodeId(node), global - self.offsets[node])
    }
}

/// Sektorübergreifendes Netz für einen Agentenradius.
#[derive(Debug)]
pub struct TerrainOverlayNetwork {
    radius: f64,
    config: Arc<NavmeshConfig>,
    nodes: Vec<TerrainOverlayNetworkNode>,
    edge_groups: Vec<TerrainOverlayNetworkEdgeGroup>,
    node_bvh: Bvh<Bounds3D, OverlayNodeId>,
    crossover_graph: OnceLock<CrossoverNetworkGraph>,
}

impl TerrainOverlayNetwork {
    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn nodes(&self) -> &[TerrainOverlayNetworkNode] {
        &self.nodes
    }

    pub fn node(&self, id: OverlayNodeId) -> Option<&TerrainOverlayNetworkNode> {
        self.nodes.get(id.0)
    }

    pub fn edge_groups(&self) -> &[TerrainOverlayNetworkEdgeGroup] {
        &self.edge_groups
    }

    pub fn nodes_of_sector(&self, sector: SectorId) -> impl Iterator<Item = &TerrainOverlayNetworkNode> {
        self.nodes.iter().filter(move |n| n.sector.id == sector)
    }

    /// Knoten, dessen Land den Weltpunkt enthält, samt lokaler Koordinate.
    ///
    /// Bei mehreren Treffern gewinnt der Sektor mit dem kleinsten Ebenenabstand.
    pub fn try_find_terrain_overlay_node(&self, world: Point3D) -> Option<(OverlayNodeId, Point2D)> {
        let tolerance = self.config.sector_plane_tolerance;
        let query = Bounds3D { min: world, max: world };
        self.node_bvh
            .query(&query)
            .into_iter()
            .filter_map(|index| {
                let id = *self.node_bvh.get(index)?;
                let node = &self.nodes[id.0];
                let local = node.sector.world_to_local(world);
                (local.z.abs() <= tolerance && node.contains_local_point(local.truncate()))
                    .then_some((id, local.truncate(), local.z.abs()))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)))
            .map(|(id, local, _)| (id, local))
    }

    pub fn crossover_graph(&self) -> &CrossoverNetworkGraph {
        self.crossover_graph.get_or_init(|| {
            let mut offsets = Vec::with_capacity(self.nodes.len() + 1);
            let mut total = 0;
            for node in &self.nodes {
                offsets.push(total);
                total += node.crossover_points.crossovers().len();
            }
            offsets.push(total);

            let mut graph = AdjacencyGraph::with_nodes(total);
            for (n, node) in self.nodes.iter().enumerate() {
                let count = node.crossover_points.crossovers().len();
                for from in 0..count {
                    for to in 0..count {
                        let cost = node.crossover_points.crossover_distance(from, to);
                        if from != to && !cost.is_nan() {
                            graph.add_edge(offsets[n] + from, offsets[n] + to, cost);
                        }
                    }
                }
            }
            for group in &self.edge_groups {
                for link in &group.links {
                    graph.add_undirected_edge(
                        offsets[group.source.0] + link.source_crossover,
                        offsets[group.destination.0] + link.destination_crossover,
                        0.0,
                    );
                }
            }
            debug!("Crossover network graph over {total} crossover points");
            CrossoverNetworkGraph { offsets, graph }
        })
    }

    pub fn summary(&self) -> NetworkSummary {
        let graph = self.crossover_graph();
        NetworkSummary {
            nodes: self.nodes.len(),
            edge_groups: self.edge_groups.len(),
            links: self.edge_groups.iter().map(|g| g.links.len()).sum(),
            crossovers: graph.graph.edges.len(),
            total_edge_cost: graph
                .graph
                .edges
                .iter()
                .flatten()
                .map(|(_, cost)| *cost)
                .filter(|c| c.is_finite())
                .sum(),
        }
    }
}

/// Sektorkanten nach Quelle, Ziel und beliebigem Endpunkt.
#[derive(Debug, Clone, Default)]
pub struct SectorEdgeLookup {
    pub by_source: HashMap<SectorId, Vec<usize>>,
    pub by_destination: HashMap<SectorId, Vec<usize>>,
    pub by_endpoint: HashMap<SectorId, Vec<usize>>,
}

impl SectorEdgeLookup {
    pub fn new(edges: &[SectorEdgeDescription]) -> Self {
        let mut lookup = Self::default();
        for (index, edge) in edges.iter().enumerate() {
            lookup.by_source.entry(edge.source).or_default().push(index);
            lookup.by_destination.entry(edge.destination).or_default().push(index);
            lookup.by_endpoint.entry(edge.source).or_default().push(index);
            if edge.destination != edge.source {
                lookup.by_endpoint.entry(edge.destination).or_default().push(index);
            }
        }
        lookup
    }
}

/// Baut und cached Overlay-Netze je Agentenradius.
#[derive(Debug)]
pub struct TerrainOverlayNetworkManager {
    sectors: BTreeMap<SectorId, Arc<SectorNodeDescription>>,
    view_managers: BTreeMap<SectorId, Arc<LocalGeometryViewManager>>,
    edges: Vec<SectorEdgeDescription>,
    lookup: SectorEdgeLookup,
    config: Arc<NavmeshConfig>,
    networks: Mutex<HashMap<AgentRadiusKey, Arc<TerrainOverlayNetwork>>>,
}

impl TerrainOverlayNetworkManager {
    pub fn new(
        view_managers: BTreeMap<SectorId, Arc<LocalGeometryViewManager>>,
        edges: Vec<SectorEdgeDescription>,
        config: Arc<NavmeshConfig>,
    ) -> Self {
        let sectors = view_managers
            .iter()
            .map(|(id, manager)| (*id, manager.job().sector.clone()))
            .collect();
        let lookup = SectorEdgeLookup::new(&edges);
        Self {
            sectors,
            view_managers,
            edges,
            lookup,
            config,
            networks: Mutex::new(HashMap::new()),
        }
    }

    pub fn edge_lookup(&self) -> &SectorEdgeLookup {
        &self.lookup
    }

    pub fn edges(&self) -> &[SectorEdgeDescription] {
        &self.edges
    }

    pub fn view_manager(&self, sector: SectorId) -> Option<&Arc<LocalGeometryViewManager>> {
        self.view_managers.get(&sector)
    }

    fn lock_networks(&self) -> MutexGuard<'_, HashMap<AgentRadiusKey, Arc<TerrainOverlayNetwork>>> {
        self.networks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Verwirft alle Netze und alle Sichten der Sektoren.
    pub fn invalidate_caches(&self) {
        self.lock_networks().clear();
        for manager in self.view_managers.values() {
            manager.invalidate();
        }
    }

    pub fn compile_terrain_overlay_network(&self, radius: f64) -> NavResult<Arc<TerrainOverlayNetwork>> {
        let key = AgentRadiusKey::new(radius);
        if let Some(network) = self.lock_networks().get(&key) {
            return Ok(network.clone());
        }
        let network = Arc::new(self.build_network(radius)?);
        Ok(self.lock_networks().entry(key).or_insert(network).clone())
    }

    fn build_network(&self, radius: f64) -> NavResult<TerrainOverlayNetwork> {
        let mut nodes: Vec<TerrainOverlayNetworkNode> = Vec::new();
        let mut lands: HashMap<SectorId, (Arc<PunchedLand>, usize)> = HashMap::new();

        for (sector_id, manager) in &self.view_managers {
            let view = manager.get_view_or_preview(radius);
            let land = view.punched_land()?;
            let sector = self.sectors[sector_id].clone();
            lands.insert(*sector_id, (land.clone(), nodes.len()));
            for (land_index, land_node) in land.nodes.iter().enumerate() {
                let corners = land_node
                    .bounds
                    .corners()
                    .map(|c| sector.local_to_world(c));
                let world_bounds = Bounds3D::from_points_iter(corners)
                    .unwrap_or(Bounds3D::empty())
                    .expand(self.config.sector_plane_tolerance);
                nodes.push(TerrainOverlayNetworkNode {
                    id: OverlayNodeId(nodes.len()),
                    sector: sector.clone(),
                    view: view.clone(),
                    land_index,
                    crossover_points: CrossoverPointManager::new(
                        land.clone(),
                        land_index,
                        self.config.crossover_dedup_distance,
                    ),
                    world_bounds,
                });
            }
        }

        let mut groups: Vec<TerrainOverlayNetworkEdgeGroup> = Vec::new();
        let mut group_index: HashMap<(OverlayNodeId, OverlayNodeId), usize> = HashMap::new();
        for edge in &self.edges {
            let (Some(source), Some(destination)) = (lands.get(&edge.source), lands.get(&edge.destination)) else {
                continue;
            };
            let source_sector = &self.sectors[&edge.source];
            let destination_sector = &self.sectors[&edge.destination];
            for pair in &edge.segments {
                for (source_node, source_point, destination_node, destination_point) in
                    self.match_crossover_points(radius, pair, source_sector, source, destination_sector, destination)
                {
                    let s = nodes[source_node]
                        .crossover_points
                        .add_many(pair.source.segment, &[source_point])[0];
                    let d = nodes[destination_node]
                        .crossover_points
                        .add_many(pair.destination.segment, &[destination_point])[0];
                    let key = (OverlayNodeId(source_node), OverlayNodeId(destination_node));
                    let index = *group_index.entry(key).or_insert_with(|| {
                        groups.push(TerrainOverlayNetworkEdgeGroup {
                            source: key.0,
                            destination: key.1,
                            links: Vec::new(),
                        });
                        groups.len() - 1
                    });
                    let link = OverlayLink {
                        source_crossover: s,
                        destination_crossover: d,
                    };
                    if !groups[index].links.contains(&link) {
                        groups[index].links.push(link);
                    }
                }
            }
        }

        let node_bvh = Bvh::build(
            nodes.iter().map(|n| (n.world_bounds, n.id)).collect(),
            self.config.bvh_leaf_size,
        );
        info!(
            "Compiled overlay network r={radius}: {} nodes, {} edge groups, {} links",
            nodes.len(),
            groups.len(),
            groups.iter().map(|g| g.links.len()).sum::<usize>()
        );
        Ok(TerrainOverlayNetwork {
            radius,
            config: self.config.clone(),
            nodes,
            edge_groups: groups,
            node_bvh,
            crossover_graph: OnceLock::new(),
        })
    }

    /// Tastet die Landintervalle eines Übergangssegments ab und ordnet jede Probe dem
    /// Landknoten auf der Gegenseite zu: `(Quellknoten, Punkt, Zielknoten, Punkt)`.
    ///
    /// Randproben halten mindestens den Agentenradius Abstand zu den Intervallenden; ist
    /// das Intervall dafür zu kurz, bleibt nur die Mitte.
    fn match_crossover_points(
        &self,
        radius: f64,
        pair: &CrossoverSegmentPair,
        source_sector: &SectorNodeDescription,
        (source_land, source_offset): &(Arc<PunchedLand>, usize),
        destination_sector: &SectorNodeDescription,
        (destination_land, destination_offset): &(Arc<PunchedLand>, usize),
    ) -> Vec<(usize, Point2D, usize, Point2D)> {
        let segment = pair.source.segment;
        let length = segment.length();
        if length <= 0.0 {
            return Vec::new();
        }
        let margin = self.config.crossover_point_margin.max(radius) / length;
        let mut matches = Vec::new();

        for (land_index, land_node) in source_land.nodes.iter().enumerate() {
            let mut params = land_node.edge_bvh.intersection_params(&segment);
            params.push(0.0);
            params.push(1.0);
            params.retain(|t| (0.0..=1.0).contains(t));
            params.sort_by(f64::total_cmp);
            params.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

            for window in params.windows(2) {
                let (t0, t1) = (window[0], window[1]);
                let mid = 0.5 * (t0 + t1);
                if !land_node.contains_point(segment.point_at(mid)) {
                    continue;
                }
                let samples = if t1 - t0 > 2.0 * margin {
                    vec![t0 + margin, mid, t1 - margin]
                } else {
                    vec![mid]
                };
                for t in samples {
                    let local = segment.point_at(t);
                    let world = source_sector.local_to_world(local);
                    let remote = destination_sector.world_to_local(world);
                    if remote.z.abs() > self.config.sector_plane_tolerance {
                        continue;
                    }
                    let remote = remote.truncate();
                    if let Some(remote_index) = destination_land.find_land_node(remote) {
                        matches.push((
                            source_offset + land_index,
                            local,
                            destination_offset + remote_index,
                            remote,
                        ));
                    }
                }
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::geometry::Polygon;
    use crate::navmesh::{
        local_geometry::LocalGeometryJob,
        sector::{CrossoverSegment, TerrainStaticMetadata},
    };
    use approx::assert_abs_diff_eq;

    fn boundary() -> IntRect {
        IntRect::new(IVec2::ZERO, IVec2::splat(1000))
    }

    /// Zwei Sektoren, B um +1000 in x verschoben, verbunden über die Ostkante von A.
    fn two_sector_manager(b_metadata: TerrainStaticMetadata) -> TerrainOverlayNetworkManager {
        let config = Arc::new(NavmeshConfig::default());
        let a = Arc::new(
            SectorNodeDescription::new(
                SectorId(0),
                Arc::new(TerrainStaticMetadata::rectangle(boundary())),
                DAffine3::IDENTITY,
            )
            .unwrap(),
        );
        let b = Arc::new(
            SectorNodeDescription::new(
                SectorId(1),
                Arc::new(b_metadata),
                DAffine3::from_translation(DVec3::new(1000.0, 0.0, 0.0)),
            )
            .unwrap(),
        );
        let east = DoubleLineSegment2::new(Point2D::new(1000.0, 0.0), Point2D::new(1000.0, 1000.0));
        let west = DoubleLineSegment2::new(Point2D::new(0.0, 0.0), Point2D::new(0.0, 1000.0));
        let pair = CrossoverSegmentPair {
            source: CrossoverSegment::facing_into(east, &boundary()),
            destination: CrossoverSegment::facing_into(west, &boundary()),
        };
        let edge = SectorEdgeDescription {
            source: SectorId(0),
            destination: SectorId(1),
            segments: vec![pair],
        };

        let make = |sector: Arc<SectorNodeDescription>, crossover: CrossoverSegment| {
            Arc::new(LocalGeometryViewManager::new(Arc::new(LocalGeometryJob {
                sector,
                crossover_segments: vec![crossover],
                holes: Vec::new(),
                version: Version(1),
                config: config.clone(),
            })))
        };
        let mut managers = BTreeMap::new();
        managers.insert(SectorId(0), make(a, pair.source));
        managers.insert(SectorId(1), make(b, pair.destination));
        TerrainOverlayNetworkManager::new(managers, vec![edge.clone(), edge.reversed()], config)
    }

    #[test]
    fn test_network_links_adjacent_sectors() {
        let manager = two_sector_manager(TerrainStaticMetadata::rectangle(boundary()));
        let network = manager.compile_terrain_overlay_network(15.0).unwrap();
        let summary = network.summary();
        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.edge_groups, 2);
        // Rand, Mitte, Rand in beide Richtungen
        assert_eq!(summary.links, 6);
        for node in network.nodes() {
            assert_eq!(node.crossover_points.crossovers().len(), 3);
        }

        let graph = network.crossover_graph();
        let (node, c) = graph.resolve(graph.global_index(OverlayNodeId(1), 2));
        assert_eq!((node, c), (OverlayNodeId(1), 2));

        assert_eq!(manager.edge_lookup().by_endpoint[&SectorId(1)].len(), 2);
        assert_eq!(manager.edge_lookup().by_source[&SectorId(0)], vec![0]);
    }

    #[test]
    fn test_find_node_by_world_point() {
        let manager = two_sector_manager(TerrainStaticMetadata::rectangle(boundary()));
        let network = manager.compile_terrain_overlay_network(15.0).unwrap();

        let (id, local) = network
            .try_find_terrain_overlay_node(DVec3::new(1500.0, 500.0, 0.5))
            .unwrap();
        assert_eq!(network.node(id).unwrap().sector.id, SectorId(1));
        assert_abs_diff_eq!(local.x, 500.0, epsilon = 1e-9);

        assert!(network.try_find_terrain_overlay_node(DVec3::new(1500.0, 500.0, 5.0)).is_none());
        assert!(network.try_find_terrain_overlay_node(DVec3::new(5.0, 500.0, 0.0)).is_none());
        assert!(network.try_find_terrain_overlay_node(DVec3::new(3000.0, 500.0, 0.0)).is_none());
    }

    #[test]
    fn test_blocked_destination_yields_no_links() {
        // Auf der B-Seite ist der gesamte Westrand ein Loch
        let b = TerrainStaticMetadata::rectangle(boundary())
            .with_excluded(Polygon::rectangle(IntRect::new(IVec2::new(-50, -50), IVec2::new(100, 1050))));
        let manager = two_sector_manager(b);
        let network = manager.compile_terrain_overlay_network(15.0).unwrap();
        assert_eq!(network.summary().links, 0);
    }

    #[test]
    fn test_networks_cached_until_invalidated() {
        let manager = two_sector_manager(TerrainStaticMetadata::rectangle(boundary()));
        let first = manager.compile_terrain_overlay_network(15.0).unwrap();
        let again = manager.compile_terrain_overlay_network(15.0).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        manager.invalidate_caches();
        let view_manager = manager.view_manager(SectorId(0)).unwrap();
        assert!(!view_manager.is_punched_land_evaluated(15.0));
        let rebuilt = manager.compile_terrain_overlay_network(15.0).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(first.summary(), rebuilt.summary());
    }
}
