// src/math/spatial/quadtree.rs

use crate::math::types::*;

#[derive(Debug, Clone)]
struct QuadNode {
    bounds: IntRect,
    /// (Element-Index, Rechteck); Elemente, die in kein Kind passen, bleiben hier.
    items: Vec<(usize, IntRect)>,
    children: Option<[usize; 4]>,
    depth: usize,
}

/// Quad-Tree über ganzzahlige Rechtecke für Punktabfragen.
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    max_items: usize,
    max_depth: usize,
}

impl QuadTree {
    pub fn new(bounds: IntRect, max_items: usize, max_depth: usize) -> Self {
        Self {
            nodes: vec![QuadNode {
                bounds,
                items: Vec::new(),
                children: None,
                depth: 0,
            }],
            max_items: max_items.max(1),
            max_depth,
        }
    }

    /// Baut den Baum über alle Rechtecke; der Index entspricht der Position.
    pub fn from_rects(rects: &[IntRect], max_items: usize, max_depth: usize) -> Self {
        let bounds = rects
            .iter()
            .copied()
            .reduce(|a, b| IntRect::new(a.min.min(b.min), a.max.max(b.max)))
            .unwrap_or(IntRect::new(IVec2::ZERO, IVec2::ZERO));
        let mut tree = Self::new(bounds, max_items, max_depth);
        for (index, rect) in rects.iter().enumerate() {
            tree.insert(index, *rect);
        }
        tree
    }

    pub fn insert(&mut self, index: usize, rect: IntRect) {
        let mut current = 0;
        loop {
            if let Some(children) = self.nodes[current].children {
                if let Some(child) = children
                    .into_iter()
                    .find(|c| self.nodes[*c].bounds.contains_rect(&rect))
                {
                    current = child;
                    continue;
                }
                self.nodes[current].items.push((index, rect));
                return;
            }

            self.nodes[current].items.push((index, rect));
            let node = &self.nodes[current];
            if node.items.len() > self.max_items
                && node.depth < self.max_depth
                && node.bounds.width() >= 2
                && node.bounds.height() >= 2
            {
                self.split(current);
            }
            return;
        }
    }

    fn split(&mut self, node_index: usize) {
        let bounds = self.nodes[node_index].bounds;
        let depth = self.nodes[node_index].depth + 1;
        let mid = (bounds.min + bounds.max) / 2;
        let quadrants = [
            IntRect::new(bounds.min, mid),
            IntRect::new(IVec2::new(mid.x, bounds.min.y), IVec2::new(bounds.max.x, mid.y)),
            IntRect::new(IVec2::new(bounds.min.x, mid.y), IVec2::new(mid.x, bounds.max.y)),
            IntRect::new(mid, bounds.max),
        ];

        let first_child = self.nodes.len();
        for quadrant in quadrants {
            self.nodes.push(QuadNode {
                bounds: quadrant,
                items: Vec::new(),
                children: None,
                depth,
            });
        }
        let children = [first_child, first_child + 1, first_child + 2, first_child + 3];
        self.nodes[node_index].children = Some(children);

        // Einträge neu verteilen
        let items = std::mem::take(&mut self.nodes[node_index].items);
        for (index, rect) in items {
            match children
                .into_iter()
                .find(|c| self.nodes[*c].bounds.contains_rect(&rect))
            {
                Some(child) => self.nodes[child].items.push((index, rect)),
                None => self.nodes[node_index].items.push((index, rect)),
            }
        }
    }

    /// Indizes aller Rechtecke, die den Punkt enthalten.
    pub fn query_point(&self, point: IVec2) -> Vec<usize> {
        let mut result = Vec::new();
        let mut stack = vec![0usize];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            if !node.bounds.contains_point(point) {
                continue;
            }
            result.extend(
                node.items
                    .iter()
                    .filter(|(_, rect)| rect.contains_point(point))
                    .map(|(index, _)| *index),
            );
            if let Some(children) = node.children {
                stack.extend(children);
            }
        }
        result
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_point_matches_brute_force() {
        let rects: Vec<IntRect> = (0..100)
            .map(|i| {
                let x = (i % 10) * 10;
                let y = (i / 10) * 10;
                IntRect::new(IVec2::new(x, y), IVec2::new(x + 12, y + 12))
            })
            .collect();
        let tree = QuadTree::from_rects(&rects, 4, 6);
        assert!(tree.node_count() > 1);

        for point in [IVec2::new(5, 5), IVec2::new(11, 11), IVec2::new(95, 3), IVec2::new(200, 200)] {
            let mut hits = tree.query_point(point);
            hits.sort();
            let expected: Vec<usize> = rects
                .iter()
                .enumerate()
                .filter(|(_, r)| r.contains_point(point))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(hits, expected);
        }
    }
}
