// Layout Engine
// Layered top-to-bottom layout: longest-path ranks, stable in-rank order, fixed geometry

use super::models::{Edge, Node, Position};
use crate::config::LayoutConfig;

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// Where a single node ended up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rank: usize,
    /// Index within the rank, following node list order
    pub order: usize,
    pub position: Position,
}

/// Result of one layout pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    placements: HashMap<String, Placement>,
    /// Node ids per rank in cross-axis order
    pub ranks: Vec<Vec<String>>,
    /// Nodes that no structural path from the root reaches
    pub unplaced: Vec<String>,
}

impl Layout {
    pub fn placement(&self, id: &str) -> Option<&Placement> {
        self.placements.get(id)
    }

    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.placements.get(id).map(|p| p.rank)
    }

    /// Write ranks and positions into the node list. Unplaced nodes keep
    /// whatever position they already had.
    pub fn apply(&self, nodes: &mut [Node]) {
        for node in nodes {
            match self.placements.get(&node.id) {
                Some(placement) => {
                    node.rank = Some(placement.rank);
                    node.position = placement.position;
                }
                None => node.rank = None,
            }
        }
    }
}

/// Hierarchical layout over the structural subgraph
#[derive(Debug, Clone, Copy)]
pub struct LayoutEngine {
    geometry: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(geometry: LayoutConfig) -> Self {
        Self { geometry }
    }

    /// Compute ranks and coordinates.
    ///
    /// Only structural edges between listed nodes are considered; ephemeral
    /// edges never influence ranks. The result depends on nothing but the
    /// inputs and their order.
    pub fn compute(&self, nodes: &[Node], edges: &[Edge], root_id: &str) -> Layout {
        let ranks_by_id = longest_path_ranks(nodes, edges, root_id);

        let mut ranks: Vec<Vec<String>> = Vec::new();
        let mut unplaced = Vec::new();
        for node in nodes {
            match ranks_by_id.get(node.id.as_str()) {
                Some(&rank) => {
                    if rank >= ranks.len() {
                        ranks.resize(rank + 1, Vec::new());
                    }
                    ranks[rank].push(node.id.clone());
                }
                None => unplaced.push(node.id.clone()),
            }
        }

        if !unplaced.is_empty() {
            warn!(
                count = unplaced.len(),
                nodes = ?unplaced,
                "nodes unreachable from root keep their previous position"
            );
        }

        let mut placements = HashMap::with_capacity(nodes.len());
        for (rank, members) in ranks.iter().enumerate() {
            for (order, id) in members.iter().enumerate() {
                let position = self.position_for(rank, order, members.len());
                placements.insert(
                    id.clone(),
                    Placement {
                        rank,
                        order,
                        position,
                    },
                );
            }
        }

        Layout {
            placements,
            ranks,
            unplaced,
        }
    }

    /// Center-anchored slot of (rank, order), converted to the top-left anchor
    fn position_for(&self, rank: usize, order: usize, rank_width: usize) -> Position {
        let g = &self.geometry;
        let column_pitch = g.node_width + g.node_spacing;
        let row_pitch = g.node_height + g.rank_spacing;

        // Each rank is centered on x = 0
        let offset = order as f64 - (rank_width.saturating_sub(1)) as f64 / 2.0;
        let center_x = offset * column_pitch;
        let center_y = rank as f64 * row_pitch + g.node_height / 2.0;

        Position::new(center_x - g.node_width / 2.0, center_y - g.node_height / 2.0)
    }
}

/// Longest path from the root along structural edges (Kahn's algorithm over
/// the part of the graph reachable from the root). Nodes on a cycle or not
/// reachable get no rank.
fn longest_path_ranks<'a>(
    nodes: &'a [Node],
    edges: &'a [Edge],
    root_id: &str,
) -> HashMap<&'a str, usize> {
    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut ranks: HashMap<&'a str, usize> = HashMap::new();

    let Some(root) = nodes.iter().find(|n| n.id == root_id) else {
        return ranks;
    };
    let root = root.id.as_str();

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges.iter().filter(|e| e.is_structural()) {
        let (source, target) = (edge.source.as_str(), edge.target.as_str());
        if known.contains(source) && known.contains(target) && source != target {
            adjacency.entry(source).or_default().push(target);
        }
    }

    // Restrict to what the root can reach so unrelated sources don't hold
    // back in-degrees
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([root]);
    reachable.insert(root);
    while let Some(current) = queue.pop_front() {
        for &next in adjacency.get(current).into_iter().flatten() {
            if reachable.insert(next) {
                queue.push_back(next);
            }
        }
    }

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for &source in &reachable {
        for &target in adjacency.get(source).into_iter().flatten() {
            *in_degree.entry(target).or_insert(0) += 1;
        }
    }

    ranks.insert(root, 0);
    if in_degree.get(root).copied().unwrap_or(0) > 0 {
        // Root sits on a cycle; only the root itself is placeable
        return ranks;
    }

    let mut ready: VecDeque<&str> = VecDeque::from([root]);
    while let Some(current) = ready.pop_front() {
        let current_rank = ranks[current];
        for &next in adjacency.get(current).into_iter().flatten() {
            let candidate = current_rank + 1;
            let rank = ranks.entry(next).or_insert(candidate);
            if *rank < candidate {
                *rank = candidate;
            }

            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(next);
                }
            }
        }
    }

    // Anything still holding in-degree sits on (or behind) a cycle
    ranks.retain(|id, _| in_degree.get(id).map_or(true, |&degree| degree == 0));
    ranks
}
