// src/math/geometry/polygon/operations/boolean.rs

use super::super::{
    Polygon,
    properties::{self, PointClassification},
    tree::{PolyNodeId, PolygonTree, simplify_contour},
};
use crate::math::{error::*, types::*};
use bevy::log::debug;
use i_overlay::core::{fill_rule::FillRule, overlay_rule::OverlayRule};
use i_overlay::float::single::SingleFloatOverlay;

/// Kontur im i_overlay-Format
pub type OverlayPath = Vec<[f64; 2]>;

/// Fläche als Menge orientierter Konturen (NonZero-Regel).
///
/// Gefüllte Flächen laufen im Uhrzeigersinn, Aussparungen gegen den Uhrzeigersinn, genau
/// wie die Konturen eines [`PolygonTree`].
#[derive(Debug, Clone, Default)]
pub struct ClipRegion {
    paths: Vec<OverlayPath>,
}

impl ClipRegion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alle Polygone als gefüllte Flächen.
    pub fn from_polygons(polygons: &[Polygon]) -> NavResult<Self> {
        let mut region = Self::new();
        for polygon in polygons {
            region.add_polygon(polygon)?;
        }
        Ok(region)
    }

    pub fn from_tree(tree: &PolygonTree) -> Self {
        let mut region = Self::new();
        region.add_tree(tree);
        region
    }

    /// Fügt ein Polygon als gefüllte Fläche hinzu.
    pub fn add_polygon(&mut self, polygon: &Polygon) -> NavResult<()> {
        polygon.require_closed("boolean operation")?;
        let points = properties::oriented(polygon.points.clone(), Clockness::Clockwise);
        self.paths
            .push(points.iter().map(|p| [p.x as f64, p.y as f64]).collect());
        Ok(())
    }

    /// Fügt eine Float-Kontur als gefüllte Fläche hinzu; entartete Konturen fallen weg.
    pub fn add_filled_contour(&mut self, mut points: Vec<Point2D>) {
        let area = properties::signed_area_f64(&points);
        if area == 0.0 || points.len() < 3 {
            return;
        }
        if area > 0.0 {
            points.reverse();
        }
        self.paths.push(points.iter().map(|p| [p.x, p.y]).collect());
    }

    /// Übernimmt alle Konturen eines Baums mit ihrem gespeicherten Drehsinn.
    pub fn add_tree(&mut self, tree: &PolygonTree) {
        for (_, contour) in tree.contours() {
            self.paths
                .push(contour.iter().map(|p| [p.x as f64, p.y as f64]).collect());
        }
    }

    pub fn extend(&mut self, other: &ClipRegion) {
        self.paths.extend(other.paths.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

/// Vereinigung aller Flächen der Region.
pub fn union(region: &ClipRegion) -> PolygonTree {
    if region.is_empty() {
        return PolygonTree::new();
    }
    let empty: Vec<OverlayPath> = Vec::new();
    let shapes = region
        .paths
        .overlay(&empty, OverlayRule::Union, FillRule::NonZero);
    shapes_to_tree(shapes)
}

/// Stanzt `exclude` aus `include` aus.
pub fn punch_regions(include: &ClipRegion, exclude: &ClipRegion) -> PolygonTree {
    if include.is_empty() {
        return PolygonTree::new();
    }
    if exclude.is_empty() {
        return union(include);
    }
    let shapes = include
        .paths
        .overlay(&exclude.paths, OverlayRule::Difference, FillRule::NonZero);
    let tree = shapes_to_tree(shapes);
    debug!(
        "Punch: {} include / {} exclude contours -> {} tree nodes",
        include.len(),
        exclude.len(),
        tree.len()
    );
    tree
}

/// `Punch(include, exclude)`: Vereinigung der Landkonturen abzüglich der Lochkonturen.
pub fn punch(include: &[Polygon], exclude: &[Polygon]) -> NavResult<PolygonTree> {
    let include = ClipRegion::from_polygons(include)?;
    let exclude = ClipRegion::from_polygons(exclude)?;
    Ok(punch_regions(&include, &exclude))
}

struct Island {
    outer: Vec<IVec2>,
    holes: Vec<Vec<IVec2>>,
    area: f64,
}

fn round_contour(path: &[[f64; 2]]) -> Option<Vec<IVec2>> {
    let rounded: Vec<IVec2> = path
        .iter()
        .map(|p| round_to_grid(Point2D::new(p[0], p[1])))
        .collect();
    let simplified = simplify_contour(&rounded);
    (simplified.len() >= 3 && properties::signed_area_doubled(&simplified) != 0)
        .then_some(simplified)
}

/// Baut aus den i_overlay-Shapes (Außenkontur + Löcher) einen Baum.
///
/// Inseln, die in einem Loch einer anderen Shape liegen, werden in das kleinste
/// enthaltende Loch gehängt.
fn shapes_to_tree(shapes: Vec<Vec<OverlayPath>>) -> PolygonTree {
    let mut islands: Vec<Island> = shapes
        .iter()
        .filter_map(|shape| {
            let (outer, holes) = shape.split_first()?;
            let outer = round_contour(outer)?;
            let area = properties::signed_area(&outer).abs();
            Some(Island {
                outer,
                holes: holes.iter().filter_map(|h| round_contour(h)).collect(),
                area,
            })
        })
        .collect();
    islands.sort_by(|a, b| b.area.total_cmp(&a.area));

    let mut tree = PolygonTree::new();
    // (Knoten, Fläche, geo-Kontur) aller bereits eingefügten Löcher
    let mut hole_nodes: Vec<(PolyNodeId, f64, geo::Polygon<f64>)> = Vec::new();

    for island in islands {
        let container = hole_nodes
            .iter()
            .filter(|(_, _, region)| contour_inside(&island.outer, region))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _, _)| *id)
            .unwrap_or(PolygonTree::ROOT);

        let land = tree.add_child(container, island.outer);
        for hole in island.holes {
            let area = properties::signed_area(&hole).abs();
            let region = properties::region_polygon(&hole, &[]);
            let id = tree.add_child(land, hole);
            hole_nodes.push((id, area, region));
        }
    }
    tree
}

/// Entscheidet über den ersten Vertex, der nicht auf dem Rand liegt.
fn contour_inside(contour: &[IVec2], region: &geo::Polygon<f64>) -> bool {
    contour
        .iter()
        .map(|p| properties::classify_point(region, p.as_dvec2()))
        .find(|c| *c != PointClassification::OnBoundary)
        .is_some_and(|c| c == PointClassification::Inside)
}
