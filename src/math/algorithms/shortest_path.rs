// src/math/algorithms/shortest_path.rs

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Graph, auf dem [`Dijkstra`] sucht. Knoten sind dichte Indizes `0..node_count()`.
pub trait SearchGraph {
    fn node_count(&self) -> usize;

    /// Ruft `visit(nachbar, kosten)` für jede ausgehende Kante auf.
    fn for_each_neighbor(&self, node: usize, visit: &mut dyn FnMut(usize, f64));
}

/// Reihenfolge bei Kostengleichstand in der Prioritätswarteschlange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Früher eingefügt wird zuerst entnommen
    #[default]
    InsertionOrder,
    /// Später eingefügt wird zuerst entnommen
    ReverseInsertionOrder,
}

/// Zustand eines Knotens während der Suche
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unvisited,
    /// In der Warteschlange, Kosten noch nicht endgültig
    Frontier,
    /// Einmal entnommen, Kosten fixiert
    Finalized,
}

#[derive(Debug, Clone, Copy)]
struct HeapNode {
    cost: f64,
    /// Einfügereihenfolge, je nach TieBreak negiert
    sequence: i64,
    node: usize,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Umgekehrt für einen Min-Heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Ergebnis einer Dijkstra-Suche: Kosten und Vorgänger je Knoten.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    pub distances: Vec<f64>,
    pub predecessors: Vec<Option<usize>>,
    pub states: Vec<NodeState>,
}

impl ShortestPathTree {
    pub fn distance(&self, node: usize) -> Option<f64> {
        (self.states.get(node) == Some(&NodeState::Finalized)).then(|| self.distances[node])
    }

    pub fn is_finalized(&self, node: usize) -> bool {
        self.states.get(node) == Some(&NodeState::Finalized)
    }

    /// Knotenfolge von der Quelle bis `target` (inklusive).
    pub fn path_to(&self, target: usize) -> Option<Vec<usize>> {
        if !self.is_finalized(target) {
            return None;
        }
        let mut path = vec![target];
        let mut current = target;
        while let Some(previous) = self.predecessors[current] {
            path.push(previous);
            current = previous;
        }
        path.reverse();
        Some(path)
    }
}

/// Dijkstra mit binärem Heap und verzögertem Verwerfen veralteter Einträge.
#[derive(Debug, Clone, Default)]
pub struct Dijkstra {
    tie_break: TieBreak,
    terminals: Option<Vec<usize>>,
}

impl Dijkstra {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Suche endet, sobald alle Terminale fixiert sind.
    pub fn with_terminals(mut self, terminals: Vec<usize>) -> Self {
        self.terminals = Some(terminals);
        self
    }

    pub fn run<G: SearchGraph + ?Sized>(&self, graph: &G, sources: &[(usize, f64)]) -> ShortestPathTree {
        let n = graph.node_count();
        let mut tree = ShortestPathTree {
            distances: vec![f64::INFINITY; n],
            predecessors: vec![None; n],
            states: vec![NodeState::Unvisited; n],
        };
        let mut heap = BinaryHeap::new();
        let mut sequence: i64 = 0;
        let mut push = |heap: &mut BinaryHeap<HeapNode>, node: usize, cost: f64| {
            sequence += 1;
            let sequence = match self.tie_break {
                TieBreak::InsertionOrder => sequence,
                TieBreak::ReverseInsertionOrder => -sequence,
            };
            heap.push(HeapNode { cost, sequence, node });
        };

        for &(source, cost) in sources {
            if source < n && cost < tree.distances[source] {
                tree.distances[source] = cost;
                tree.predecessors[source] = None;
                tree.states[source] = NodeState::Frontier;
                push(&mut heap, source, cost);
            }
        }

        let mut remaining_terminals = self
            .terminals
            .as_ref()
            .map(|t| t.iter().filter(|&&x| x < n).count());

        while let Some(HeapNode { cost, node, .. }) = heap.pop() {
            if tree.states[node] == NodeState::Finalized || cost > tree.distances[node] {
                continue;
            }
            tree.states[node] = NodeState::Finalized;

            if let (Some(terminals), Some(remaining)) = (&self.terminals, remaining_terminals.as_mut()) {
                if terminals.contains(&node) {
                    *remaining -= 1;
                    if *remaining == 0 {
                        break;
                    }
                }
            }

            graph.for_each_neighbor(node, &mut |neighbor, edge_cost| {
                if neighbor >= n || !edge_cost.is_finite() || tree.states[neighbor] == NodeState::Finalized {
                    return;
                }
                let candidate = cost + edge_cost;
                if candidate < tree.distances[neighbor] {
                    tree.distances[neighbor] = candidate;
                    tree.predecessors[neighbor] = Some(node);
                    tree.states[neighbor] = NodeState::Frontier;
                    push(&mut heap, neighbor, candidate);
                }
            });
        }
        tree
    }
}

/// Einfacher Adjazenzlisten-Graph.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    pub edges: Vec<Vec<(usize, f64)>>,
}

impl AdjacencyGraph {
    pub fn with_nodes(count: usize) -> Self {
        Self {
            edges: vec![Vec::new(); count],
        }
    }

    pub fn add_edge(&mut self, from: usize, to: usize, cost: f64) {
        self.edges[from].push((to, cost));
    }

    pub fn add_undirected_edge(&mut self, a: usize, b: usize, cost: f64) {
        self.add_edge(a, b, cost);
        self.add_edge(b, a, cost);
    }
}

impl SearchGraph for AdjacencyGraph {
    fn node_count(&self) -> usize {
        self.edges.len()
    }

    fn for_each_neighbor(&self, node: usize, visit: &mut dyn FnMut(usize, f64)) {
        for &(neighbor, cost) in &self.edges[node] {
            visit(neighbor, cost);
        }
    }
}

/// Basisgraph plus virtuelle Quelle (`n`) und virtuelles Ziel (`n + 1`).
///
/// Die Quelle ist mit `source_links` verbunden, jeder Knoten mit endlichen
/// `target_costs` mit dem Ziel. Optional gibt es eine direkte Kante Quelle -> Ziel.
pub struct AugmentedGraph<'a, G: SearchGraph + ?Sized> {
    base: &'a G,
    source_links: Vec<(usize, f64)>,
    target_costs: Vec<f64>,
    direct: Option<f64>,
}

impl<'a, G: SearchGraph + ?Sized> AugmentedGraph<'a, G> {
    pub fn new(
        base: &'a G,
        source_links: Vec<(usize, f64)>,
        target_links: impl IntoIterator<Item = (usize, f64)>,
    ) -> Self {
        let mut target_costs = vec![f64::INFINITY; base.node_count()];
        for (node, cost) in target_links {
            if let Some(slot) = target_costs.get_mut(node) {
                *slot = slot.min(cost);
            }
        }
        Self {
            base,
            source_links,
            target_costs,
            direct: None,
        }
    }

    pub fn with_direct_edge(mut self, cost: Option<f64>) -> Self {
        self.direct = cost;
        self
    }

    pub fn source(&self) -> usize {
        self.base.node_count()
    }

    pub fn target(&self) -> usize {
        self.base.node_count() + 1
    }
}

impl<G: SearchGraph + ?Sized> SearchGraph for AugmentedGraph<'_, G> {
    fn node_count(&self) -> usize {
        self.base.node_count() + 2
    }

    fn for_each_neighbor(&self, node: usize, visit: &mut dyn FnMut(usize, f64)) {
        let n = self.base.node_count();
        if node == n {
            for &(v, cost) in &self.source_links {
                visit(v, cost);
            }
            if let Some(cost) = self.direct {
                visit(n + 1, cost);
            }
        } else if node < n {
            self.base.for_each_neighbor(node, visit);
            if self.target_costs[node].is_finite() {
                visit(n + 1, self.target_costs[node]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Fünf Wegpunkte um ein Hindernis; zwei gleich lange Umwege.
    fn five_node_graph() -> AdjacencyGraph {
        let mut graph = AdjacencyGraph::with_nodes(5);
        let diag = 200f64.sqrt();
        graph.add_undirected_edge(0, 1, diag);
        graph.add_undirected_edge(0, 2, diag);
        graph.add_undirected_edge(1, 3, 20.0);
        graph.add_undirected_edge(2, 4, 20.0);
        graph.add_undirected_edge(3, 4, 40.0);
        graph
    }

    #[test]
    fn test_dijkstra_optimal_cost() {
        let graph = five_node_graph();
        let tree = Dijkstra::new().run(&graph, &[(0, 0.0)]);
        assert_abs_diff_eq!(tree.distance(3).unwrap(), 20.0 + 200f64.sqrt(), epsilon = 1e-9);
        assert_eq!(tree.path_to(3).unwrap(), vec![0, 1, 3]);
        assert_abs_diff_eq!(tree.distance(4).unwrap(), 20.0 + 200f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_tie_break_does_not_change_cost() {
        let mut graph = five_node_graph();
        // Ziel 5 von beiden Seiten gleich weit
        graph.edges.push(Vec::new());
        graph.add_undirected_edge(3, 5, 5.0);
        graph.add_undirected_edge(4, 5, 5.0);

        let a = Dijkstra::new().with_tie_break(TieBreak::InsertionOrder).run(&graph, &[(0, 0.0)]);
        let b = Dijkstra::new()
            .with_tie_break(TieBreak::ReverseInsertionOrder)
            .run(&graph, &[(0, 0.0)]);
        assert_abs_diff_eq!(a.distance(5).unwrap(), b.distance(5).unwrap(), epsilon = 1e-12);
        assert_eq!(a.path_to(5).map(|p| p.len()), Some(4));
    }

    #[test]
    fn test_terminal_short_circuit_and_unreachable() {
        let mut graph = five_node_graph();
        graph.edges.push(Vec::new()); // isolierter Knoten 5
        let tree = Dijkstra::new().with_terminals(vec![1]).run(&graph, &[(0, 0.0)]);
        assert!(tree.is_finalized(1));
        assert!(!tree.is_finalized(4));

        let full = Dijkstra::new().run(&graph, &[(0, 0.0)]);
        assert_eq!(full.distance(5), None);
        assert_eq!(full.states[5], NodeState::Unvisited);
        assert!(full.path_to(5).is_none());
    }

    #[test]
    fn test_augmented_graph_prefers_cheaper_route() {
        let graph = five_node_graph();
        let augmented = AugmentedGraph::new(&graph, vec![(0, 1.0)], vec![(3, 1.0)]);
        let (source, target) = (augmented.source(), augmented.target());
        let tree = Dijkstra::new().with_terminals(vec![target]).run(&augmented, &[(source, 0.0)]);
        assert_abs_diff_eq!(tree.distance(target).unwrap(), 2.0 + 20.0 + 200f64.sqrt(), epsilon = 1e-9);
        assert_eq!(tree.path_to(target).unwrap(), vec![source, 0, 1, 3, target]);

        let shortcut = AugmentedGraph::new(&graph, vec![(0, 1.0)], vec![(3, 1.0)]).with_direct_edge(Some(5.0));
        let tree = Dijkstra::new().run(&shortcut, &[(source, 0.0)]);
        assert_eq!(tree.path_to(target).unwrap(), vec![source, target]);
    }
}
