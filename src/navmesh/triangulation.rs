// src/navmesh/triangulation.rs

use super::config::NavmeshConfig;
use crate::math::{
    error::*,
    geometry::{PolyNodeId, PolygonTree, polygon::{PointClassification, properties}},
    spatial::QuadTree,
    types::*,
    utils::simple_geometry,
};
use bevy::log::{debug, warn};
use spade::{ConstrainedDelaunayTriangulation, Triangulation as SpadeTriangulation};
use std::collections::{HashMap, VecDeque};

/// Kein Nachbar über dieser Kante
pub const NO_NEIGHBOR: i32 = -1;

/// Dreieck einer Insel. `neighbors[k]` liegt gegenüber von `points[k]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangulationTriangle {
    pub points: [Point2D; 3],
    pub centroid: Point2D,
    pub neighbors: [i32; 3],
    pub aabb: IntRect,
}

impl TriangulationTriangle {
    pub fn area(&self) -> f64 {
        simple_geometry::triangle_signed_area(self.points[0], self.points[1], self.points[2])
    }

    pub fn contains_point(&self, point: Point2D) -> bool {
        simple_geometry::point_in_triangle(point, self.points[0], self.points[1], self.points[2], 1e-9)
    }
}

/// Zusammenhängende Dreiecksmenge mit Quad-Tree für Punktabfragen.
#[derive(Debug, Clone)]
pub struct TriangulationIsland {
    pub land_node: PolyNodeId,
    pub triangles: Vec<TriangulationTriangle>,
    quadtree: QuadTree,
}

impl TriangulationIsland {
    fn new(land_node: PolyNodeId, triangles: Vec<TriangulationTriangle>, config: &NavmeshConfig) -> Self {
        let rects: Vec<IntRect> = triangles.iter().map(|t| t.aabb).collect();
        let quadtree = QuadTree::from_rects(&rects, config.quadtree_max_items, config.quadtree_max_depth);
        Self {
            land_node,
            triangles,
            quadtree,
        }
    }

    pub fn area(&self) -> f64 {
        self.triangles.iter().map(|t| t.area()).sum()
    }

    pub fn find_triangle(&self, point: Point2D) -> Option<usize> {
        let key = IVec2::new(point.x.floor() as i32, point.y.floor() as i32);
        self.quadtree
            .query_point(key)
            .into_iter()
            .filter(|&i| self.triangles[i].contains_point(point))
            .min()
    }

    /// CCW-Dreiecke und gegenseitige Nachbarverweise.
    pub fn is_consistent(&self) -> bool {
        self.triangles.iter().enumerate().all(|(index, triangle)| {
            triangle.area() > 0.0
                && triangle.neighbors.iter().enumerate().all(|(k, &neighbor)| {
                    if neighbor == NO_NEIGHBOR {
                        return true;
                    }
                    let Some(other) = self.triangles.get(neighbor as usize) else {
                        return false;
                    };
                    let edge = [triangle.points[(k + 1) % 3], triangle.points[(k + 2) % 3]];
                    other.neighbors.iter().enumerate().any(|(j, &back)| {
                        back == index as i32
                            && other.points[(j + 1) % 3] == edge[1]
                            && other.points[(j + 2) % 3] == edge[0]
                    })
                })
        })
    }
}

/// Triangulierung aller Landknoten eines Baums.
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    pub islands: Vec<TriangulationIsland>,
}

impl Triangulation {
    pub fn triangle_count(&self) -> usize {
        self.islands.iter().map(|i| i.triangles.len()).sum()
    }

    /// `(Insel, Dreieck)` am Punkt, falls vorhanden.
    pub fn try_intersect(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let point = Point2D::new(x, y);
        self.islands
            .iter()
            .enumerate()
            .find_map(|(island, data)| data.find_triangle(point).map(|t| (island, t)))
    }
}

/// Trianguliert alle Landknoten, inklusive Inseln innerhalb von Löchern.
pub fn triangulate_root(tree: &PolygonTree, config: &NavmeshConfig) -> NavResult<Triangulation> {
    let mut triangulation = Triangulation::default();
    for land in tree.land_nodes() {
        triangulation.islands.extend(triangulate_land_node(tree, land, config)?);
    }
    debug!(
        "Triangulated {} land nodes into {} islands / {} triangles",
        tree.land_nodes().count(),
        triangulation.islands.len(),
        triangulation.triangle_count()
    );
    Ok(triangulation)
}

/// CDT eines Landknotens mit seinen direkten Löchern als Randbedingungen.
pub fn triangulate_land_node(
    tree: &PolygonTree,
    land: PolyNodeId,
    config: &NavmeshConfig,
) -> NavResult<Vec<TriangulationIsland>> {
    let mut cdt: ConstrainedDelaunayTriangulation<SpadePoint> = ConstrainedDelaunayTriangulation::new();
    let mut contours: Vec<&[IVec2]> = vec![tree.node(land).contour.as_slice()];
    contours.extend(tree.child_contours(land));

    let mut skipped_constraints = 0usize;
    for contour in contours {
        let mut handles = Vec::with_capacity(contour.len());
        for point in contour {
            let handle = cdt
                .insert(to_spade(point.as_dvec2()))
                .map_err(|e| NavmeshError::TriangulationFailed {
                    reason: format!("insert {point}: {e:?}"),
                })?;
            handles.push(handle);
        }
        for i in 0..handles.len() {
            let (from, to) = (handles[i], handles[(i + 1) % handles.len()]);
            if from == to {
                continue;
            }
            if cdt.can_add_constraint(from, to) {
                cdt.add_constraint(from, to);
            } else {
                skipped_constraints += 1;
            }
        }
    }
    if skipped_constraints > 0 {
        warn!("{skipped_constraints} contour edges could not be constrained in land node {land:?}");
    }

    let region = tree.region(land);
    let mut triangles = Vec::new();
    let mut vertex_triangles: Vec<[usize; 3]> = Vec::new();
    for face in cdt.inner_faces() {
        let vertices = face.vertices();
        let points = vertices.map(|v| from_spade(v.position()));
        let centroid = (points[0] + points[1] + points[2]) / 3.0;
        if properties::classify_point(&region, centroid) != PointClassification::Inside {
            continue;
        }
        let bounds = Bounds2D::from_points_iter(points).unwrap_or(Bounds2D::empty());
        triangles.push(TriangulationTriangle {
            points,
            centroid,
            neighbors: [NO_NEIGHBOR; 3],
            aabb: IntRect::enclosing(&bounds, config.triangle_aabb_padding),
        });
        vertex_triangles.push(vertices.map(|v| v.fix().index()));
    }

    link_neighbors(&mut triangles, &vertex_triangles);
    Ok(split_islands(land, triangles, config))
}

fn link_neighbors(triangles: &mut [TriangulationTriangle], vertices: &[[usize; 3]]) {
    let mut edges: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
    for (t, ids) in vertices.iter().enumerate() {
        for k in 0..3 {
            let a = ids[(k + 1) % 3];
            let b = ids[(k + 2) % 3];
            let key = (a.min(b), a.max(b));
            if let Some((other, j)) = edges.remove(&key) {
                triangles[t].neighbors[k] = other as i32;
                triangles[other].neighbors[j] = t as i32;
            } else {
                edges.insert(key, (t, k));
            }
        }
    }
}

fn split_islands(
    land: PolyNodeId,
    triangles: Vec<TriangulationTriangle>,
    config: &NavmeshConfig,
) -> Vec<TriangulationIsland> {
    let mut component = vec![usize::MAX; triangles.len()];
    let mut count = 0;
    for start in 0..triangles.len() {
        if component[start] != usize::MAX {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        component[start] = count;
        while let Some(t) = queue.pop_front() {
            for &n in &triangles[t].neighbors {
                if n != NO_NEIGHBOR && component[n as usize] == usize::MAX {
                    component[n as usize] = count;
                    queue.push_back(n as usize);
                }
            }
        }
        count += 1;
    }

    // Indizes je Insel neu vergeben
    let mut local_index = vec![0i32; triangles.len()];
    let mut buckets: Vec<Vec<TriangulationTriangle>> = vec![Vec::new(); count];
    for (t, triangle) in triangles.iter().enumerate() {
        local_index[t] = buckets[component[t]].len() as i32;
        buckets[component[t]].push(*triangle);
    }
    for bucket in &mut buckets {
        for triangle in bucket.iter_mut() {
            for n in triangle.neighbors.iter_mut() {
                if *n != NO_NEIGHBOR {
                    *n = local_index[*n as usize];
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|bucket| {
            let island = TriangulationIsland::new(land, bucket, config);
            debug_assert!(island.is_consistent(), "inconsistent triangulation island");
            island
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::geometry::{Polygon, polygon::operations::punch};
    use approx::assert_relative_eq;

    fn config() -> NavmeshConfig {
        NavmeshConfig::default()
    }

    #[test]
    fn test_area_conservation_without_holes() {
        let l_shape = Polygon::closed(vec![
            IVec2::new(0, 0),
            IVec2::new(60, 0),
            IVec2::new(60, 20),
            IVec2::new(20, 20),
            IVec2::new(20, 50),
            IVec2::new(0, 50),
        ])
        .unwrap();
        let tree = punch(&[l_shape.clone()], &[]).unwrap();
        let triangulation = triangulate_root(&tree, &config()).unwrap();
        assert_eq!(triangulation.islands.len(), 1);
        assert_relative_eq!(triangulation.islands[0].area(), l_shape.area(), epsilon = 1e-6);
        assert!(triangulation.islands[0].is_consistent());
    }

    #[test]
    fn test_holes_are_excluded_and_islands_found() {
        let outer = Polygon::rectangle(IntRect::new(IVec2::ZERO, IVec2::splat(100)));
        let hole = Polygon::rectangle(IntRect::new(IVec2::splat(20), IVec2::splat(80)));
        let mut tree = punch(&[outer], &[hole]).unwrap();
        // Insel im Loch
        let hole_id = tree.node(tree.land_nodes().next().unwrap()).children[0];
        tree.add_child(hole_id, IntRect::new(IVec2::splat(40), IVec2::splat(60)).clockwise_corners().to_vec());

        let triangulation = triangulate_root(&tree, &config()).unwrap();
        assert_eq!(triangulation.islands.len(), 2);
        let total: f64 = triangulation.islands.iter().map(|i| i.area()).sum();
        assert_relative_eq!(total, 100.0 * 100.0 - 60.0 * 60.0 + 20.0 * 20.0, epsilon = 1e-6);

        for island in &triangulation.islands {
            assert!(island.is_consistent());
            assert!(island.triangles.iter().any(|t| t.neighbors.contains(&NO_NEIGHBOR)));
        }

        let (ring, tri) = triangulation.try_intersect(10.0, 50.0).unwrap();
        assert!(triangulation.islands[ring].triangles[tri].contains_point(Point2D::new(10.0, 50.0)));
        assert!(triangulation.try_intersect(30.0, 30.0).is_none());
        let (island, _) = triangulation.try_intersect(50.0, 50.0).unwrap();
        assert_ne!(island, ring);
        assert!(triangulation.try_intersect(150.0, 50.0).is_none());
    }
}
