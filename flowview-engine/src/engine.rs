// Graph Engine
// Sole owner of the node/edge set; mutated only by rebuilds and incoming events

use crate::config::EngineConfig;
use crate::graph::{Edge, GraphBuilder, GraphDescription, LayoutEngine, Node};
use crate::model::StepSnapshot;
use crate::overlay::{Clock, DashboardEvent, OverlayManager, OverlayOutcome, TokioClock};

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Read-only view handed to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub nodes: Vec<Node>,
    /// Structural edges first, then ephemeral edges in insertion order
    pub edges: Vec<Edge>,
}

impl RenderSnapshot {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Same snapshot as last time; nothing recomputed
    Unchanged,
    Rebuilt {
        nodes: usize,
        structural_edges: usize,
        /// Ephemeral edges dropped because an endpoint disappeared
        dropped_ephemeral: Vec<String>,
    },
}

impl RebuildOutcome {
    pub fn is_rebuilt(&self) -> bool {
        matches!(self, RebuildOutcome::Rebuilt { .. })
    }
}

/// The workflow graph engine.
///
/// Structural state is fully recomputed whenever a snapshot with a new
/// identity arrives. Ephemeral edges are layered on top and survive
/// rebuilds as long as both endpoints still exist.
#[derive(Debug)]
pub struct GraphEngine {
    config: EngineConfig,
    layout: LayoutEngine,
    snapshot: Option<StepSnapshot>,
    graph: GraphDescription,
    overlay: OverlayManager,
}

impl GraphEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let layout = LayoutEngine::new(config.layout);
        let overlay = OverlayManager::new(config.overlay.ttl(), clock);

        let mut graph = GraphBuilder::new(&config).build(&[]);
        layout
            .compute(&graph.nodes, &graph.edges, &config.root_id)
            .apply(&mut graph.nodes);

        Self {
            config,
            layout,
            snapshot: None,
            graph,
            overlay,
        }
    }

    /// Rebuild nodes and structural edges from a snapshot.
    ///
    /// A snapshot identical (by identity) to the current one is a no-op.
    pub fn rebuild(&mut self, snapshot: &StepSnapshot) -> RebuildOutcome {
        if let Some(current) = &self.snapshot {
            if current.is_same(snapshot) {
                return RebuildOutcome::Unchanged;
            }
        }

        let mut graph = GraphBuilder::new(&self.config).build(snapshot.steps());

        // Nodes the layout cannot place stay where they were last drawn
        let previous: HashMap<&str, _> = self
            .graph
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), node.position))
            .collect();
        for node in &mut graph.nodes {
            if let Some(position) = previous.get(node.id.as_str()) {
                node.position = *position;
            }
        }

        self.layout
            .compute(&graph.nodes, &graph.edges, &self.config.root_id)
            .apply(&mut graph.nodes);

        let live: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        let dropped_ephemeral = self.overlay.retain_endpoints(|id| live.contains(id));

        let outcome = RebuildOutcome::Rebuilt {
            nodes: graph.nodes.len(),
            structural_edges: graph.edges.len(),
            dropped_ephemeral,
        };
        debug!(
            steps = snapshot.len(),
            groups = graph.group_count,
            ?outcome,
            "graph rebuilt"
        );

        self.graph = graph;
        self.snapshot = Some(snapshot.clone());
        outcome
    }

    /// Feed one event from the live stream
    pub fn handle_event(&mut self, event: &DashboardEvent) -> OverlayOutcome {
        self.overlay.handle_event(event, &self.graph.names)
    }

    /// Remove every ephemeral edge whose TTL has elapsed
    pub fn expire(&mut self) -> Vec<String> {
        self.overlay.sweep()
    }

    /// Remove one ephemeral edge ahead of its deadline. Idempotent.
    pub fn remove_ephemeral(&mut self, edge_id: &str) -> bool {
        self.overlay.remove_edge(edge_id)
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.overlay.next_expiry()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.graph.nodes
    }

    pub fn structural_edges(&self) -> &[Edge] {
        &self.graph.edges
    }

    pub fn ephemeral_edges(&self) -> impl Iterator<Item = &Edge> {
        self.overlay.edges()
    }

    pub fn render_snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            nodes: self.graph.nodes.clone(),
            edges: self
                .graph
                .edges
                .iter()
                .chain(self.overlay.edges())
                .cloned()
                .collect(),
        }
    }
}
