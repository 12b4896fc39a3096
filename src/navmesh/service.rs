// src/navmesh/service.rs

use super::{
    config::NavmeshConfig,
    holes::{DynamicTerrainHoleDescription, HoleShape},
    ids::*,
    local_geometry::{LocalGeometryJob, LocalGeometryViewManager},
    overlay::TerrainOverlayNetworkManager,
    sector::{CrossoverSegment, CrossoverSegmentPair, SectorEdgeDescription, SectorNodeDescription, TerrainStaticMetadata},
};
use crate::math::{error::*, types::*};
use bevy::log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Unveränderlicher Stand des Terrains zu einer Snapshot-Version.
#[derive(Debug)]
pub struct TerrainSnapshot {
    version: Version,
    sectors: Vec<Arc<SectorNodeDescription>>,
    edges: Vec<SectorEdgeDescription>,
    overlay_network_manager: Arc<TerrainOverlayNetworkManager>,
}

impl TerrainSnapshot {
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn sectors(&self) -> &[Arc<SectorNodeDescription>] {
        &self.sectors
    }

    pub fn edges(&self) -> &[SectorEdgeDescription] {
        &self.edges
    }

    pub fn overlay_network_manager(&self) -> &Arc<TerrainOverlayNetworkManager> {
        &self.overlay_network_manager
    }
}

#[derive(Debug)]
struct SectorEntry {
    description: Arc<SectorNodeDescription>,
    crossover_segments: Vec<CrossoverSegment>,
    view_manager: Arc<LocalGeometryViewManager>,
}

/// Besitzt Sektoren, Kanten und dynamische Löcher und erzeugt daraus Snapshots.
#[derive(Debug)]
pub struct TerrainService {
    config: Arc<NavmeshConfig>,
    sectors: BTreeMap<SectorId, SectorEntry>,
    edges: Vec<SectorEdgeDescription>,
    holes: BTreeMap<HoleId, DynamicTerrainHoleDescription>,
    active_holes: BTreeSet<HoleId>,
    next_sector_id: usize,
    next_hole_id: usize,
    job_versions: VersionSource,
    snapshot_version: Version,
    snapshot: Option<Arc<TerrainSnapshot>>,
}

impl Default for TerrainService {
    fn default() -> Self {
        Self::with_validated_config(NavmeshConfig::default())
    }
}

impl TerrainService {
    pub fn new(config: NavmeshConfig) -> NavResult<Self> {
        config.validate()?;
        Ok(Self::with_validated_config(config))
    }

    fn with_validated_config(config: NavmeshConfig) -> Self {
        Self {
            config: Arc::new(config),
            sectors: BTreeMap::new(),
            edges: Vec::new(),
            holes: BTreeMap::new(),
            active_holes: BTreeSet::new(),
            next_sector_id: 0,
            next_hole_id: 0,
            job_versions: VersionSource::default(),
            snapshot_version: Version::INITIAL,
            snapshot: None,
        }
    }

    pub fn config(&self) -> &Arc<NavmeshConfig> {
        &self.config
    }

    pub fn sector(&self, id: SectorId) -> NavResult<&Arc<SectorNodeDescription>> {
        self.sectors
            .get(&id)
            .map(|entry| &entry.description)
            .ok_or(NavmeshError::UnknownSector(id.0))
    }

    pub fn hole(&self, id: HoleId) -> NavResult<&DynamicTerrainHoleDescription> {
        self.holes.get(&id).ok_or(NavmeshError::UnknownHole(id.0))
    }

    pub fn is_hole_active(&self, id: HoleId) -> bool {
        self.active_holes.contains(&id)
    }

    pub fn view_manager(&self, id: SectorId) -> NavResult<&Arc<LocalGeometryViewManager>> {
        self.sectors
            .get(&id)
            .map(|entry| &entry.view_manager)
            .ok_or(NavmeshError::UnknownSector(id.0))
    }

    /// Legt einen Sektor an. Ungültige Metadaten oder Transformationen schlagen sofort fehl.
    pub fn add_sector(&mut self, metadata: TerrainStaticMetadata, world_transform: DAffine3) -> NavResult<SectorId> {
        metadata.validate()?;
        let id = SectorId(self.next_sector_id);
        let description = Arc::new(SectorNodeDescription::new(id, Arc::new(metadata), world_transform)?);
        self.next_sector_id += 1;

        let job = self.build_job(&description, Vec::new());
        self.sectors.insert(
            id,
            SectorEntry {
                description,
                crossover_segments: Vec::new(),
                view_manager: Arc::new(LocalGeometryViewManager::new(job)),
            },
        );
        info!("Added {id}");
        self.invalidate_snapshot();
        Ok(id)
    }

    pub fn add_sector_edge(&mut self, edge: SectorEdgeDescription) -> NavResult<()> {
        for id in [edge.source, edge.destination] {
            self.sector(id)?;
        }
        for pair in &edge.segments {
            self.register_crossover(edge.source, pair.source);
            self.register_crossover(edge.destination, pair.destination);
        }
        debug!(
            "Added edge {} -> {} with {} crossover segments",
            edge.source,
            edge.destination,
            edge.segments.len()
        );
        let affected = [edge.source, edge.destination];
        self.edges.push(edge);
        for id in affected {
            self.rebuild_job(id)?;
        }
        self.invalidate_snapshot();
        Ok(())
    }

    /// Verbindet zwei Sektoren in beide Richtungen über ein Segment im System von `a`.
    ///
    /// Das Gegenstück in `b` ergibt sich aus den Transformationen; die Innenseite zeigt
    /// jeweils zum Zentrum des Sektors.
    pub fn connect_sectors(&mut self, a: SectorId, b: SectorId, segment_in_a: DoubleLineSegment2) -> NavResult<()> {
        let sector_a = self.sector(a)?.clone();
        let sector_b = self.sector(b)?.clone();
        let to_b = |p: Point2D| sector_b.world_to_local(sector_a.local_to_world(p));
        let (start, end) = (to_b(segment_in_a.a), to_b(segment_in_a.b));
        let tolerance = self.config.sector_plane_tolerance;
        if start.z.abs() > tolerance || end.z.abs() > tolerance {
            return Err(NavmeshError::GeometricFailure {
                operation: format!("segment of {a} does not lie in the plane of {b}"),
            });
        }
        let segment_in_b = DoubleLineSegment2::new(start.truncate(), end.truncate());

        let edge = SectorEdgeDescription {
            source: a,
            destination: b,
            segments: vec![CrossoverSegmentPair {
                source: CrossoverSegment::facing_into(segment_in_a, &sector_a.metadata.local_boundary),
                destination: CrossoverSegment::facing_into(segment_in_b, &sector_b.metadata.local_boundary),
            }],
        };
        let reversed = edge.reversed();
        self.add_sector_edge(edge)?;
        self.add_sector_edge(reversed)
    }

    /// Legt ein Loch an; es wirkt erst nach [`Self::add_temporary_hole`].
    pub fn create_hole(&mut self, shape: HoleShape, world_transform: DAffine3) -> HoleId {
        let id = HoleId(self.next_hole_id);
        self.next_hole_id += 1;
        self.holes
            .insert(id, DynamicTerrainHoleDescription::new(id, shape, world_transform));
        id
    }

    pub fn set_hole_transform(&mut self, id: HoleId, world_transform: DAffine3) -> NavResult<Version> {
        let hole = self.holes.get_mut(&id).ok_or(NavmeshError::UnknownHole(id.0))?;
        let before = hole.world_bounds();
        let version = hole.set_world_transform(world_transform);
        let after = hole.world_bounds();
        if self.active_holes.contains(&id) {
            for sector in self.sectors_touching(&[before, after]) {
                self.rebuild_job(sector)?;
            }
            self.invalidate_snapshot();
        }
        debug!("{id} moved, now {version}");
        Ok(version)
    }

    pub fn add_temporary_hole(&mut self, id: HoleId) -> NavResult<()> {
        let bounds = self.hole(id)?.world_bounds();
        if self.active_holes.insert(id) {
            for sector in self.sectors_touching(&[bounds]) {
                self.rebuild_job(sector)?;
            }
            self.invalidate_snapshot();
            debug!("{id} activated");
        }
        Ok(())
    }

    pub fn remove_temporary_hole(&mut self, id: HoleId) -> NavResult<()> {
        let bounds = self.hole(id)?.world_bounds();
        if self.active_holes.remove(&id) {
            for sector in self.sectors_touching(&[bounds]) {
                self.rebuild_job(sector)?;
            }
            self.invalidate_snapshot();
            debug!("{id} deactivated");
        }
        Ok(())
    }

    /// Liefert den gecachten Snapshot, solange sich nichts geändert hat.
    pub fn compile_snapshot(&mut self) -> Arc<TerrainSnapshot> {
        if let Some(snapshot) = &self.snapshot {
            return snapshot.clone();
        }
        let version = self.snapshot_version.bump();
        let view_managers = self
            .sectors
            .iter()
            .map(|(id, entry)| (*id, entry.view_manager.clone()))
            .collect();
        let manager = TerrainOverlayNetworkManager::new(view_managers, self.edges.clone(), self.config.clone());
        let snapshot = Arc::new(TerrainSnapshot {
            version,
            sectors: self.sectors.values().map(|e| e.description.clone()).collect(),
            edges: self.edges.clone(),
            overlay_network_manager: Arc::new(manager),
        });
        info!(
            "Compiled terrain snapshot {version}: {} sectors, {} edges, {} active holes",
            snapshot.sectors.len(),
            snapshot.edges.len(),
            self.active_holes.len()
        );
        self.snapshot = Some(snapshot.clone());
        snapshot
    }

    fn invalidate_snapshot(&mut self) {
        self.snapshot = None;
    }

    fn register_crossover(&mut self, sector: SectorId, crossover: CrossoverSegment) {
        if let Some(entry) = self.sectors.get_mut(&sector) {
            if !entry.crossover_segments.contains(&crossover) {
                entry.crossover_segments.push(crossover);
            }
        }
    }

    fn sectors_touching(&self, bounds: &[Bounds3D]) -> Vec<SectorId> {
        let tolerance = self.config.hole_projection_tolerance;
        self.sectors
            .iter()
            .filter(|(_, entry)| {
                let sector_bounds = entry.description.world_bounds.expand(tolerance);
                bounds.iter().any(|b| b.intersects(&sector_bounds))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn build_job(&self, sector: &Arc<SectorNodeDescription>, crossover_segments: Vec<CrossoverSegment>) -> Arc<LocalGeometryJob> {
        let sector_bounds = sector.world_bounds.expand(self.config.hole_projection_tolerance);
        let holes = self
            .active_holes
            .iter()
            .filter_map(|id| self.holes.get(id))
            .filter(|hole| hole.world_bounds().intersects(&sector_bounds))
            .cloned()
            .collect();
        Arc::new(LocalGeometryJob {
            sector: sector.clone(),
            crossover_segments,
            holes,
            version: self.job_versions.next(),
            config: self.config.clone(),
        })
    }

    /// Ersetzt den Job eines Sektors; der neue Manager übernimmt ausgewertete Sichten als Vorschau.
    fn rebuild_job(&mut self, id: SectorId) -> NavResult<()> {
        let entry = self.sectors.get(&id).ok_or(NavmeshError::UnknownSector(id.0))?;
        let job = self.build_job(&entry.description, entry.crossover_segments.clone());
        debug!("{id}: new geometry job {} with {} holes", job.version, job.holes.len());
        let successor = Arc::new(entry.view_manager.successor(job));
        if let Some(entry) = self.sectors.get_mut(&id) {
            entry.view_manager = successor;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navmesh::pathfinder::Pathfinder;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    const RADIUS: f64 = 15.0;
    /// Rasterung der Konturen
    const WALL_TOLERANCE: f64 = 0.75;
    /// Rasterung plus Sehnen der Kreisnäherung
    const HOLE_TOLERANCE: f64 = 2.5;

    fn boundary() -> IntRect {
        IntRect::new(IVec2::ZERO, IVec2::splat(1000))
    }

    /// Sektor A am Ursprung, B um +1000 in x, verbunden über die Ostkante von A.
    fn two_sector_service(config: NavmeshConfig) -> (TerrainService, SectorId, SectorId) {
        let mut service = TerrainService::new(config).unwrap();
        let a = service
            .add_sector(TerrainStaticMetadata::rectangle(boundary()), DAffine3::IDENTITY)
            .unwrap();
        let b = service
            .add_sector(
                TerrainStaticMetadata::rectangle(boundary()),
                DAffine3::from_translation(DVec3::new(1000.0, 0.0, 0.0)),
            )
            .unwrap();
        service
            .connect_sectors(
                a,
                b,
                DoubleLineSegment2::new(Point2D::new(1000.0, 0.0), Point2D::new(1000.0, 1000.0)),
            )
            .unwrap();
        (service, a, b)
    }

    fn sphere_at(x: f64, y: f64) -> DAffine3 {
        DAffine3::from_translation(DVec3::new(x, y, 0.0))
    }

    /// Abstand eines lokalen Punkts zu den festen Wänden des Sektors, also dem Rand ohne Übergänge.
    fn distance_to_solid_walls(service: &TerrainService, sector: SectorId, point: Point2D) -> f64 {
        let entry = &service.sectors[&sector];
        let corners = entry.description.metadata.local_boundary.to_bounds().corners();
        let on_crossover = |p: Point2D| {
            entry
                .crossover_segments
                .iter()
                .any(|c| c.segment.distance_squared_to_point(p) < 1e-9)
        };
        (0..4)
            .map(|i| DoubleLineSegment2::new(corners[i], corners[(i + 1) % 4]))
            .filter(|wall| !(on_crossover(wall.a) && on_crossover(wall.b)))
            .map(|wall| wall.distance_squared_to_point(point).sqrt())
            .fold(f64::INFINITY, f64::min)
    }

    /// Abstand eines Weltpunkts zur Oberfläche des nächsten aktiven Kugel-Lochs.
    fn distance_to_active_holes(service: &TerrainService, world: Point3D) -> f64 {
        service
            .active_holes
            .iter()
            .filter_map(|id| service.holes.get(id))
            .filter_map(|hole| match &hole.shape {
                HoleShape::Sphere { radius } => Some(world.distance(hole.world_transform().translation) - radius),
                _ => None,
            })
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_rejects_invalid_input_loudly() {
        let mut service = TerrainService::default();
        let singular = DAffine3::from_scale(DVec3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            service.add_sector(TerrainStaticMetadata::rectangle(boundary()), singular),
            Err(NavmeshError::NonInvertibleTransform { .. })
        ));
        assert!(service.add_sector_edge(SectorEdgeDescription {
            source: SectorId(3),
            destination: SectorId(4),
            segments: Vec::new(),
        })
        .is_err());
        assert_eq!(service.add_temporary_hole(HoleId(9)), Err(NavmeshError::UnknownHole(9)));
        assert!(TerrainService::new(NavmeshConfig::default().with_barrier(1.0, 2.0)).is_err());
    }

    #[test]
    fn test_path_across_two_sectors() {
        let (mut service, a, b) = two_sector_service(NavmeshConfig::default());
        let snapshot = service.compile_snapshot();
        let network = snapshot
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap();

        let roadmap = Pathfinder::new()
            .try_find_path_world(&network, DVec3::new(500.0, 500.0, 0.0), DVec3::new(1500.0, 500.0, 0.0))
            .unwrap();
        assert_abs_diff_eq!(roadmap.total_distance, 1000.0, epsilon = 1e-6);
        assert_eq!(roadmap.sectors(), vec![a, b]);
        assert_abs_diff_eq!(roadmap.world_length(), 1000.0, epsilon = 1e-6);

        let from_node = network.nodes_of_sector(a).next().unwrap();
        let diagnostics = from_node.crossover_points.diagnostics();
        assert!(diagnostics.invocations >= 1);
        assert!(diagnostics.hull_fast_path_hits >= 1);
    }

    #[test]
    fn test_route_keeps_radius_from_walls_near_crossover_ends() {
        let (mut service, a, b) = two_sector_service(NavmeshConfig::default());
        let network = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap();
        let roadmap = Pathfinder::new()
            .try_find_path_world(&network, DVec3::new(500.0, 20.0, 0.0), DVec3::new(1500.0, 20.0, 0.0))
            .unwrap();
        assert_eq!(roadmap.sectors(), vec![a, b]);
        for step in &roadmap.steps {
            let clearance = distance_to_solid_walls(&service, step.sector, step.local);
            assert!(clearance >= RADIUS, "{} only {clearance} from a wall", step.world);
        }
        // Übergang bei y = 30, einen Radius hinter dem Ende der Landbrücke
        assert_abs_diff_eq!(roadmap.total_distance, 2.0 * 500f64.hypot(10.0), epsilon = 1e-6);
    }

    #[test]
    fn test_unchanged_sector_reuses_waypoint_visibility() {
        let (mut service, a, b) = two_sector_service(NavmeshConfig::default());
        let first = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap();
        assert_eq!(first.summary().nodes, 2);

        let hole = service.create_hole(HoleShape::Sphere { radius: 40.0 }, sphere_at(1500.0, 500.0));
        service.add_temporary_hole(hole).unwrap();
        let second = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        let (old_a, new_a) = (first.nodes_of_sector(a).next().unwrap(), second.nodes_of_sector(a).next().unwrap());
        assert!(Arc::ptr_eq(old_a.crossover_points.land(), new_a.crossover_points.land()));
        assert!(new_a.crossover_points.land_node().is_waypoint_visibility_evaluated());

        let (old_b, new_b) = (first.nodes_of_sector(b).next().unwrap(), second.nodes_of_sector(b).next().unwrap());
        assert!(!Arc::ptr_eq(old_b.crossover_points.land(), new_b.crossover_points.land()));
        assert!(!new_b.crossover_points.land_node().is_waypoint_visibility_evaluated());
    }

    #[test]
    fn test_snapshot_cached_until_change() {
        let (mut service, _, _) = two_sector_service(NavmeshConfig::default());
        let first = service.compile_snapshot();
        let again = service.compile_snapshot();
        assert!(Arc::ptr_eq(&first, &again));

        let hole = service.create_hole(HoleShape::Sphere { radius: 50.0 }, sphere_at(500.0, 500.0));
        // Inaktive Löcher ändern nichts
        assert!(Arc::ptr_eq(&first, &service.compile_snapshot()));

        service.add_temporary_hole(hole).unwrap();
        let second = service.compile_snapshot();
        assert!(second.version() > first.version());

        service.set_hole_transform(hole, sphere_at(400.0, 400.0)).unwrap();
        assert!(service.compile_snapshot().version() > second.version());
        assert_eq!(service.hole(hole).unwrap().version(), Version(1));
    }

    #[test]
    fn test_hole_outside_sector_keeps_its_job() {
        let (mut service, a, b) = two_sector_service(NavmeshConfig::default());
        let job_a = service.view_manager(a).unwrap().job().version;
        let job_b = service.view_manager(b).unwrap().job().version;

        let hole = service.create_hole(HoleShape::Sphere { radius: 40.0 }, sphere_at(1500.0, 500.0));
        service.add_temporary_hole(hole).unwrap();
        assert_eq!(service.view_manager(a).unwrap().job().version, job_a);
        assert!(service.view_manager(b).unwrap().job().version > job_b);
        assert_eq!(service.view_manager(b).unwrap().job().holes.len(), 1);
    }

    #[test]
    fn test_add_then_remove_hole_restores_network() {
        let (mut service, _, _) = two_sector_service(NavmeshConfig::default());
        let before = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap()
            .summary();

        let hole = service.create_hole(
            HoleShape::Rectangle {
                half_extents: Point2D::new(30.0, 200.0),
            },
            sphere_at(1000.0, 500.0),
        );
        service.add_temporary_hole(hole).unwrap();
        let blocked = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap()
            .summary();
        assert_ne!(blocked, before);

        service.remove_temporary_hole(hole).unwrap();
        let after = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap()
            .summary();
        assert_eq!(after.nodes, before.nodes);
        assert_eq!(after.edge_groups, before.edge_groups);
        assert_eq!(after.links, before.links);
        assert_eq!(after.crossovers, before.crossovers);
        assert_abs_diff_eq!(after.total_edge_cost, before.total_edge_cost, epsilon = 1e-6);
    }

    #[test]
    fn test_preview_views_serve_until_evaluated() {
        let (mut service, a, _) = two_sector_service(NavmeshConfig::default().with_preview_views(true));
        let network = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap();
        let old_job = service.view_manager(a).unwrap().job().version;
        let before = network.summary();

        let hole = service.create_hole(HoleShape::Sphere { radius: 60.0 }, sphere_at(500.0, 500.0));
        service.add_temporary_hole(hole).unwrap();
        let snapshot = service.compile_snapshot();
        let network = snapshot
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap();

        let node = network.nodes_of_sector(a).next().unwrap();
        assert_eq!(node.view.job().version, old_job);
        assert_eq!(network.summary(), before);
        assert!(!service.view_manager(a).unwrap().is_punched_land_evaluated(RADIUS));

        // Die eigene Sicht kennt das Loch bereits
        let own = service.view_manager(a).unwrap().get_view(RADIUS);
        let land = own.punched_land().unwrap();
        assert!(land.find_land_node(Point2D::new(500.0, 500.0)).is_none());
    }

    #[test]
    fn test_seeded_hole_churn_is_reversible() {
        let (mut service, _, _) = two_sector_service(NavmeshConfig::default());
        let baseline = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap()
            .summary();

        let mut rng = StdRng::seed_from_u64(7);
        let holes: Vec<HoleId> = (0..6)
            .map(|_| {
                let radius = rng.random_range(20.0..80.0);
                let position = sphere_at(rng.random_range(100.0..1900.0), rng.random_range(100.0..900.0));
                service.create_hole(HoleShape::Sphere { radius }, position)
            })
            .collect();

        let pathfinder = Pathfinder::new();
        for _ in 0..12 {
            let hole = holes[rng.random_range(0..holes.len())];
            match rng.random_range(0..3) {
                0 => service.add_temporary_hole(hole).unwrap(),
                1 => service.remove_temporary_hole(hole).unwrap(),
                _ => {
                    let position = sphere_at(rng.random_range(100.0..1900.0), rng.random_range(100.0..900.0));
                    service.set_hole_transform(hole, position).unwrap();
                }
            }
            let network = service
                .compile_snapshot()
                .overlay_network_manager()
                .compile_terrain_overlay_network(RADIUS)
                .unwrap();
            if let Some(roadmap) =
                pathfinder.try_find_path_world(&network, DVec3::new(20.0, 20.0, 0.0), DVec3::new(1980.0, 980.0, 0.0))
            {
                assert!(roadmap.total_distance >= DVec2::new(1960.0, 960.0).length() - 1e-6);
                // Start und Ziel sind Eingaben; alle Zwischenpunkte halten den Radius ein
                for step in &roadmap.steps[1..roadmap.steps.len() - 1] {
                    let walls = distance_to_solid_walls(&service, step.sector, step.local);
                    assert!(walls >= RADIUS - WALL_TOLERANCE, "{} only {walls} from a wall", step.world);
                    let holes = distance_to_active_holes(&service, step.world);
                    assert!(holes >= RADIUS - HOLE_TOLERANCE, "{} only {holes} from a hole", step.world);
                }
            }
        }

        for hole in holes {
            service.remove_temporary_hole(hole).unwrap();
        }
        let restored = service
            .compile_snapshot()
            .overlay_network_manager()
            .compile_terrain_overlay_network(RADIUS)
            .unwrap()
            .summary();
        assert_eq!(restored.links, baseline.links);
        assert_eq!(restored.crossovers, baseline.crossovers);
        assert_abs_diff_eq!(restored.total_edge_cost, baseline.total_edge_cost, epsilon = 1e-6);
    }
}
