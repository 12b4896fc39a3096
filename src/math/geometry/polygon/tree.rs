// src/math/geometry/polygon/tree.rs

use super::properties::{self, PointClassification};
use crate::math::types::*;

/// Index eines Knotens im Arena-Baum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolyNodeId(pub usize);

/// Markierung eines Baumknotens. `Land` ist gefüllte Fläche, `Hole` ist Aussparung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolyNodeTag {
    Land,
    Hole,
}

impl PolyNodeTag {
    pub fn opposite(self) -> Self {
        match self {
            Self::Land => Self::Hole,
            Self::Hole => Self::Land,
        }
    }

    /// Gespeicherter Drehsinn: Land liegt immer rechts jeder Kante.
    pub fn clockness(self) -> Clockness {
        match self {
            Self::Land => Clockness::Clockwise,
            Self::Hole => Clockness::CounterClockwise,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolyNode {
    pub tag: PolyNodeTag,
    pub contour: Vec<IVec2>,
    pub parent: Option<PolyNodeId>,
    pub children: Vec<PolyNodeId>,
}

/// Polygon-Baum mit strikt alternierenden Land/Loch-Knoten.
///
/// Die Wurzel (`PolygonTree::ROOT`) ist ein Loch ohne Kontur; ihre Kinder sind die
/// äußersten Landflächen. Knoten werden nie einzeln verändert, Nachbearbeitungen wie
/// [`PolygonTree::prune`] erzeugen einen neuen Baum.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonTree {
    nodes: Vec<PolyNode>,
}

impl Default for PolygonTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonTree {
    pub const ROOT: PolyNodeId = PolyNodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![PolyNode {
                tag: PolyNodeTag::Hole,
                contour: Vec::new(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> &PolyNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: PolyNodeId) -> &PolyNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Nur die Wurzel vorhanden
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (PolyNodeId, &PolyNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (PolyNodeId(i), n))
    }

    /// Hängt einen Kindknoten an. Tag und Drehsinn ergeben sich aus dem Elternknoten.
    pub fn add_child(&mut self, parent: PolyNodeId, contour: Vec<IVec2>) -> PolyNodeId {
        let tag = self.nodes[parent.0].tag.opposite();
        let id = PolyNodeId(self.nodes.len());
        self.nodes.push(PolyNode {
            tag,
            contour: properties::oriented(contour, tag.clockness()),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn land_nodes(&self) -> impl Iterator<Item = PolyNodeId> + '_ {
        self.iter()
            .filter(|(_, n)| n.tag == PolyNodeTag::Land)
            .map(|(id, _)| id)
    }

    /// Konturen der direkten Kinder (bei Landknoten: die Löcher).
    pub fn child_contours(&self, id: PolyNodeId) -> Vec<&[IVec2]> {
        self.nodes[id.0]
            .children
            .iter()
            .map(|c| self.nodes[c.0].contour.as_slice())
            .collect()
    }

    /// Alle nicht-leeren Konturen, jeweils im gespeicherten Drehsinn.
    pub fn contours(&self) -> impl Iterator<Item = (PolyNodeTag, &[IVec2])> {
        self.nodes
            .iter()
            .filter(|n| !n.contour.is_empty())
            .map(|n| (n.tag, n.contour.as_slice()))
    }

    pub fn depth(&self, id: PolyNodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[id.0].parent;
        while let Some(p) = current {
            depth += 1;
            current = self.nodes[p.0].parent;
        }
        depth
    }

    /// Prüft die Land/Loch-Alternierung über alle Tiefen.
    pub fn is_tag_alternation_valid(&self) -> bool {
        self.root().tag == PolyNodeTag::Hole
            && self.iter().all(|(_, node)| {
                node.children
                    .iter()
                    .all(|c| self.nodes[c.0].tag == node.tag.opposite())
            })
    }

    /// Fläche eines Landknotens abzüglich seiner direkten Löcher als geo-Polygon.
    pub fn region(&self, id: PolyNodeId) -> geo::Polygon<f64> {
        let holes = self.child_contours(id);
        properties::region_polygon(&self.nodes[id.0].contour, &holes)
    }

    /// Sucht den Landknoten, dessen Fläche den Punkt enthält.
    pub fn find_land_node(&self, point: Point2D) -> Option<PolyNodeId> {
        self.land_nodes().find(|id| {
            properties::classify_point(&self.region(*id), point) != PointClassification::Outside
        })
    }

    /// Gesamte Landfläche (Land positiv, Löcher negativ).
    pub fn land_area(&self) -> f64 {
        self.contours()
            .map(|(tag, c)| match tag {
                PolyNodeTag::Land => properties::signed_area(c).abs(),
                PolyNodeTag::Hole => -properties::signed_area(c).abs(),
            })
            .sum()
    }

    /// Entfernt alle Knoten (samt Teilbaum), deren Fläche kleiner als `min_feature²` ist.
    pub fn prune(&self, min_feature: f64) -> PolygonTree {
        let threshold = min_feature * min_feature;
        self.rebuild(|node| {
            (properties::signed_area(&node.contour).abs() >= threshold).then(|| node.contour.clone())
        })
    }

    /// Entfernt doppelte und kollineare Punkte; entartete Konturen fallen samt Teilbaum weg.
    pub fn cleanup(&self) -> PolygonTree {
        self.rebuild(|node| {
            let contour = simplify_contour(&node.contour);
            (contour.len() >= 3 && properties::signed_area_doubled(&contour) != 0).then_some(contour)
        })
    }

    fn rebuild<F>(&self, mut keep: F) -> PolygonTree
    where
        F: FnMut(&PolyNode) -> Option<Vec<IVec2>>,
    {
        let mut result = PolygonTree::new();
        let mut stack: Vec<(PolyNodeId, PolyNodeId)> = self
            .root()
            .children
            .iter()
            .rev()
            .map(|c| (*c, PolygonTree::ROOT))
            .collect();

        while let Some((old_id, new_parent)) = stack.pop() {
            let node = &self.nodes[old_id.0];
            let Some(contour) = keep(node) else {
                continue;
            };
            let new_id = result.add_child(new_parent, contour);
            stack.extend(node.children.iter().rev().map(|c| (*c, new_id)));
        }
        result
    }
}

/// Doppelte Punkte und Punkte ohne Richtungsänderung entfernen, bis nichts mehr wegfällt.
pub fn simplify_contour(contour: &[IVec2]) -> Vec<IVec2> {
    let mut points: Vec<IVec2> = contour.to_vec();
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    loop {
        let n = points.len();
        if n < 3 {
            return points;
        }
        let kept: Vec<IVec2> = (0..n)
            .filter(|&i| {
                let prev = points[(i + n - 1) % n];
                let next = points[(i + 1) % n];
                prev != points[i] && properties::turn(prev, points[i], next) != 0
            })
            .map(|i| points[i])
            .collect();
        if kept.len() == n {
            return kept;
        }
        points = kept;
    }
}
