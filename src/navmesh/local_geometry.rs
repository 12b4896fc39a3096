// src/navmesh/local_geometry.rs

use super::{
    config::NavmeshConfig,
    holes::DynamicTerrainHoleDescription,
    ids::*,
    sector::{CrossoverSegment, SectorNodeDescription},
    triangulation::{self, Triangulation},
    visibility::{self, SectorVisibilityGraph, VisibilityPolygon},
};
use crate::math::{
    error::*,
    geometry::{
        PolyNodeId, Polygon, PolygonTree,
        polygon::{
            PointClassification,
            operations::{ClipRegion, PolygonOffset, punch_regions},
            properties,
        },
    },
    spatial::SegmentBvh,
    types::*,
};
use bevy::log::{debug, error};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Unveränderlicher Arbeitsauftrag für einen Sektor: Metadaten, Übergänge und der
/// Lochbestand zum Zeitpunkt der Erstellung.
#[derive(Debug, Clone)]
pub struct LocalGeometryJob {
    pub sector: Arc<SectorNodeDescription>,
    pub crossover_segments: Vec<CrossoverSegment>,
    pub holes: Vec<DynamicTerrainHoleDescription>,
    pub version: Version,
    pub config: Arc<NavmeshConfig>,
}

impl LocalGeometryJob {
    /// Projiziert alle relevanten dynamischen Löcher in die Sektorebene.
    ///
    /// Löcher, deren Welt-AABB die des Sektors verfehlt, werden übersprungen.
    pub fn project_holes(&self) -> Vec<Polygon> {
        let sector_bounds = self
            .sector
            .world_bounds
            .expand(self.config.hole_projection_tolerance);
        let mut skipped = 0usize;
        let projected: Vec<Polygon> = self
            .holes
            .iter()
            .filter(|hole| {
                let relevant = hole.world_bounds().intersects(&sector_bounds);
                if !relevant {
                    skipped += 1;
                }
                relevant
            })
            .filter_map(|hole| {
                hole.try_project_onto(
                    &self.sector,
                    self.config.hole_projection_tolerance,
                    self.config.hole_arc_segments,
                )
            })
            .collect();
        debug!(
            "{}: projected {} of {} dynamic holes ({} outside sector bounds)",
            self.sector.id,
            projected.len(),
            self.holes.len(),
            skipped
        );
        projected
    }
}

/// Rückverweis von Landknoten auf die erzeugende Sicht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalGeometryViewContext {
    pub sector: SectorId,
    pub radius: AgentRadiusKey,
    pub job_version: Version,
}

/// Sichtbarkeitspolygone und Sichtbarkeitsgraph über die Wegpunkte eines Landknotens.
#[derive(Debug, Clone)]
pub struct WaypointVisibility {
    pub polygons: Vec<VisibilityPolygon>,
    pub graph: SectorVisibilityGraph,
}

/// Ein begehbarer Landknoten samt vorberechneter Sichtlinien-Geometrie.
#[derive(Debug, Clone)]
pub struct PunchedLandNode {
    pub tree_node: PolyNodeId,
    pub context: LocalGeometryViewContext,
    pub bounds: Bounds2D,
    pub region: geo::Polygon<f64>,
    /// Kanten der Kontur und der direkten Löcher
    pub edge_bvh: SegmentBvh,
    pub waypoints: Vec<Point2D>,
    pub barriers: SegmentBvh,
    waypoint_visibility: OnceLock<WaypointVisibility>,
}

impl PunchedLandNode {
    fn build(tree: &PolygonTree, id: PolyNodeId, context: LocalGeometryViewContext, config: &NavmeshConfig) -> Self {
        let node = tree.node(id);
        let bounds = Bounds2D::from_points_iter(node.contour.iter().map(|p| p.as_dvec2()))
            .unwrap_or(Bounds2D::empty());

        let holes = tree.child_contours(id);
        let contour_edges = |contour: &[IVec2]| -> Vec<DoubleLineSegment2> {
            let n = contour.len();
            (0..n)
                .map(|i| DoubleLineSegment2::new(contour[i].as_dvec2(), contour[(i + 1) % n].as_dvec2()))
                .collect()
        };
        let mut edges = contour_edges(&node.contour);
        let mut waypoints = visibility::find_contour_waypoints(&node.contour);
        for hole in &holes {
            edges.extend(contour_edges(hole));
            waypoints.extend(visibility::find_contour_waypoints(hole));
        }

        let barriers = visibility::find_contour_and_child_hole_barriers(
            tree,
            id,
            config.barrier_dilation,
            config.barrier_expansion,
        );

        Self {
            tree_node: id,
            context,
            bounds,
            region: properties::region_polygon(&node.contour, &holes),
            edge_bvh: SegmentBvh::from_segments(edges, config.bvh_leaf_size),
            waypoints,
            barriers: SegmentBvh::from_segments(barriers, config.bvh_leaf_size),
            waypoint_visibility: OnceLock::new(),
        }
    }

    /// Wird einmal je Sicht berechnet und von allen Netzen geteilt, die diese Sicht verwenden.
    pub fn waypoint_visibility(&self) -> &WaypointVisibility {
        self.waypoint_visibility.get_or_init(|| {
            let polygons = visibility::compute_waypoint_visibility_polygons(&self.waypoints, &self.barriers);
            let graph = visibility::compute_visibility_graph(&self.waypoints, &polygons, &self.barriers);
            debug!(
                "{}: waypoint visibility graph with {} vertices / {} edges",
                self.context.sector,
                self.waypoints.len(),
                graph.edge_count()
            );
            WaypointVisibility { polygons, graph }
        })
    }

    pub fn is_waypoint_visibility_evaluated(&self) -> bool {
        self.waypoint_visibility.get().is_some()
    }

    /// Punkt im Inneren oder auf dem Rand der Landfläche
    pub fn contains_point(&self, point: Point2D) -> bool {
        self.bounds.contains_point(point)
            && properties::classify_point(&self.region, point) != PointClassification::Outside
    }
}

/// Endgültige begehbare Fläche eines Sektors für einen Agentenradius.
#[derive(Debug, Clone)]
pub struct PunchedLand {
    pub tree: PolygonTree,
    /// Ein Eintrag je Landknoten des Baums
    pub nodes: Vec<PunchedLandNode>,
}

impl PunchedLand {
    pub fn find_land_node(&self, point: Point2D) -> Option<usize> {
        self.nodes.iter().position(|n| n.contains_point(point))
    }

    pub fn node_for(&self, tree_node: PolyNodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.tree_node == tree_node)
    }

    pub fn contour(&self, index: usize) -> &[IVec2] {
        &self.tree.node(self.nodes[index].tree_node).contour
    }

    pub fn hole_contours(&self, index: usize) -> Vec<&[IVec2]> {
        self.tree.child_contours(self.nodes[index].tree_node)
    }
}

fn memoize<T>(cell: &OnceLock<T>, compute: impl FnOnce() -> NavResult<T>) -> NavResult<&T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = compute()?;
    Ok(cell.get_or_init(|| value))
}

/// Sicht eines Jobs für einen Agentenradius. Alle Größen werden beim ersten Zugriff
/// berechnet und danach nie verändert; bei Änderungen wird die ganze Sicht ersetzt.
#[derive(Debug)]
pub struct LocalGeometryView {
    job: Arc<LocalGeometryJob>,
    radius: f64,
    context: LocalGeometryViewContext,
    dilated_holes: OnceLock<PolygonTree>,
    eroded_outer: OnceLock<PolygonTree>,
    crossover_land: OnceLock<Vec<[Point2D; 4]>>,
    punched_land: OnceLock<Arc<PunchedLand>>,
    triangulation: OnceLock<Arc<Triangulation>>,
}

impl LocalGeometryView {
    pub fn new(job: Arc<LocalGeometryJob>, radius: f64) -> Self {
        let context = LocalGeometryViewContext {
            sector: job.sector.id,
            radius: AgentRadiusKey::new(radius),
            job_version: job.version,
        };
        Self {
            job,
            radius,
            context,
            dilated_holes: OnceLock::new(),
            eroded_outer: OnceLock::new(),
            crossover_land: OnceLock::new(),
            punched_land: OnceLock::new(),
            triangulation: OnceLock::new(),
        }
    }

    pub fn job(&self) -> &Arc<LocalGeometryJob> {
        &self.job
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn context(&self) -> LocalGeometryViewContext {
        self.context
    }

    fn offset_builder(&self) -> PolygonOffset {
        PolygonOffset::new().with_arc_segments(self.job.config.offset_arc_segments)
    }

    /// Statische und projizierte dynamische Löcher, um den Radius vergrößert.
    pub fn dilated_holes_union(&self) -> NavResult<&PolygonTree> {
        memoize(&self.dilated_holes, || {
            let mut holes = self.job.sector.metadata.excluded_contours.clone();
            holes.extend(self.job.project_holes());
            self.offset_builder().include(&holes)?.dilate(self.radius).execute()
        })
    }

    /// Begehbare Außenflächen, um den Radius verkleinert.
    pub fn compute_eroded_outer_contour(&self) -> NavResult<&PolygonTree> {
        memoize(&self.eroded_outer, || {
            self.offset_builder()
                .include(&self.job.sector.metadata.included_contours)?
                .erode(self.radius)
                .execute()
        })
    }

    /// Landbrücken über die Übergangssegmente, die die Erosion am Rand wieder öffnen.
    ///
    /// An Enden, an denen kein weiteres Übergangssegment anschließt, wird die Brücke entlang
    /// des Segments um den Radius gekürzt; dort grenzt eine feste Wand an.
    pub fn compute_crossover_land_polys(&self) -> &[[Point2D; 4]] {
        self.crossover_land.get_or_init(|| {
            let config = &self.job.config;
            let slack = config.crossover_dilation_slack;
            let tolerance_sq = config.crossover_dedup_distance * config.crossover_dedup_distance;
            let segments = &self.job.crossover_segments;
            // Ein Ende gilt als fortgesetzt, wenn ein Übergang hinter ihm in gleicher Richtung weiterläuft
            let reach = self.radius.max(config.crossover_dedup_distance);
            let continued = |beyond: Point2D| {
                segments
                    .iter()
                    .any(|c| c.segment.distance_squared_to_point(beyond) < tolerance_sq)
            };

            segments
                .iter()
                .filter(|c| !c.segment.is_degenerate())
                .filter_map(|c| {
                    let direction = c.segment.direction();
                    let along = direction * self.radius;
                    let a = if continued(c.segment.a - direction * reach) {
                        c.segment.a
                    } else {
                        c.segment.a + along
                    };
                    let b = if continued(c.segment.b + direction * reach) {
                        c.segment.b
                    } else {
                        c.segment.b - along
                    };
                    if (b - a).dot(c.segment.b - c.segment.a) <= 0.0 {
                        debug!(
                            "{}: crossover {:?} shorter than two agent radii, no bridge",
                            self.job.sector.id, c.segment
                        );
                        return None;
                    }
                    let inward = c.inward_normal();
                    let inner = inward * (self.radius + slack);
                    let outer = -inward * slack;
                    Some([a + outer, b + outer, b + inner, a + inner])
                })
                .collect()
        })
    }

    pub fn is_punched_land_evaluated(&self) -> bool {
        self.punched_land.get().is_some()
    }

    /// `Punch(outer ∪ Brücken, dilatierte Löcher)`, bereinigt, danach Kleinstflächen entfernen.
    pub fn punched_land(&self) -> NavResult<Arc<PunchedLand>> {
        memoize(&self.punched_land, || {
            self.compute_punched_land().map(Arc::new).inspect_err(|e| {
                error!(
                    "{}: punched land for radius {} failed: {e}",
                    self.job.sector.id, self.radius
                );
            })
        })
        .cloned()
    }

    fn compute_punched_land(&self) -> NavResult<PunchedLand> {
        let mut include = ClipRegion::from_tree(self.compute_eroded_outer_contour()?);
        for bridge in self.compute_crossover_land_polys() {
            include.add_filled_contour(bridge.to_vec());
        }
        let exclude = ClipRegion::from_tree(self.dilated_holes_union()?);
        let tree = punch_regions(&include, &exclude)
            .cleanup()
            .prune(self.radius.max(1.0));

        let config = &self.job.config;
        let nodes: Vec<PunchedLandNode> = tree
            .land_nodes()
            .map(|id| PunchedLandNode::build(&tree, id, self.context, config))
            .collect();
        debug!(
            "{} r={}: {} land nodes, {} waypoints, {} barriers",
            self.job.sector.id,
            self.radius,
            nodes.len(),
            nodes.iter().map(|n| n.waypoints.len()).sum::<usize>(),
            nodes.iter().map(|n| n.barriers.len()).sum::<usize>()
        );
        Ok(PunchedLand { tree, nodes })
    }

    pub fn triangulation(&self) -> NavResult<Arc<Triangulation>> {
        memoize(&self.triangulation, || {
            let land = self.punched_land()?;
            triangulation::triangulate_root(&land.tree, &self.job.config).map(Arc::new)
        })
        .cloned()
    }
}

/// Verwaltet die Sichten eines Jobs, eine je Agentenradius.
#[derive(Debug)]
pub struct LocalGeometryViewManager {
    job: Arc<LocalGeometryJob>,
    views: Mutex<HashMap<AgentRadiusKey, Arc<LocalGeometryView>>>,
    /// Ausgewertete Sichten des Vorgänger-Jobs
    previews: HashMap<AgentRadiusKey, Arc<LocalGeometryView>>,
}

impl LocalGeometryViewManager {
    pub fn new(job: Arc<LocalGeometryJob>) -> Self {
        Self {
            job,
            views: Mutex::new(HashMap::new()),
            previews: HashMap::new(),
        }
    }

    /// Nachfolger für einen neuen Job; bereits ausgewertete Sichten bleiben als Vorschau.
    pub fn successor(&self, job: Arc<LocalGeometryJob>) -> Self {
        let mut previews: HashMap<AgentRadiusKey, Arc<LocalGeometryView>> = self
            .lock_views()
            .iter()
            .filter(|(_, view)| view.is_punched_land_evaluated())
            .map(|(key, view)| (*key, view.clone()))
            .collect();
        for (key, view) in &self.previews {
            previews.entry(*key).or_insert_with(|| view.clone());
        }
        Self {
            job,
            views: Mutex::new(HashMap::new()),
            previews,
        }
    }

    fn lock_views(&self) -> MutexGuard<'_, HashMap<AgentRadiusKey, Arc<LocalGeometryView>>> {
        self.views.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn job(&self) -> &Arc<LocalGeometryJob> {
        &self.job
    }

    pub fn get_view(&self, radius: f64) -> Arc<LocalGeometryView> {
        self.lock_views()
            .entry(AgentRadiusKey::new(radius))
            .or_insert_with(|| Arc::new(LocalGeometryView::new(self.job.clone(), radius)))
            .clone()
    }

    /// Liefert die Vorschau des Vorgängers, solange die eigene Sicht noch nicht ausgewertet ist.
    pub fn get_view_or_preview(&self, radius: f64) -> Arc<LocalGeometryView> {
        let key = AgentRadiusKey::new(radius);
        if self.job.config.use_preview_views {
            let own_evaluated = self
                .lock_views()
                .get(&key)
                .is_some_and(|v| v.is_punched_land_evaluated());
            if !own_evaluated {
                if let Some(preview) = self.previews.get(&key) {
                    debug!(
                        "{}: using preview view of {} for radius {}",
                        self.job.sector.id,
                        preview.job().version,
                        radius
                    );
                    return preview.clone();
                }
            }
        }
        self.get_view(radius)
    }

    pub fn is_punched_land_evaluated(&self, radius: f64) -> bool {
        self.lock_views()
            .get(&AgentRadiusKey::new(radius))
            .is_some_and(|v| v.is_punched_land_evaluated())
    }

    /// Verwirft alle Sichten; sie werden beim nächsten Zugriff neu berechnet.
    pub fn invalidate(&self) {
        self.lock_views().clear();
    }
}
