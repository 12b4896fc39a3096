// src/math/algorithms/mod.rs

pub mod shortest_path;

pub use self::shortest_path::{
    AdjacencyGraph, AugmentedGraph, Dijkstra, NodeState, SearchGraph, ShortestPathTree, TieBreak,
};
