// Graph Builder
// Turns a step snapshot into root + step nodes and group-boundary structural edges

use super::groups::resolve_groups;
use super::models::{Edge, Node, NodeKind, NodeLabel, NodeStyle, Position};
use super::names::NameIndex;
use crate::config::EngineConfig;
use crate::model::Step;

use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::warn;

/// Nodes, structural edges and the name index for one snapshot
#[derive(Debug, Clone)]
pub struct GraphDescription {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub names: NameIndex,
    /// Number of execution groups the steps resolved into
    pub group_count: usize,
}

impl GraphDescription {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Builds the structural graph.
///
/// The root connects to every step of the first group and every step of a
/// group connects to every step of the next one. Per-step dependencies are
/// not tracked, only group boundaries.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'a> {
    root_id: &'a str,
    root_label: &'a str,
    root_alias: &'a str,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            root_id: &config.root_id,
            root_label: &config.root_label,
            root_alias: &config.root_alias,
        }
    }

    pub fn build(&self, steps: &[Step]) -> GraphDescription {
        let mut names = NameIndex::new(self.root_alias, self.root_id);
        let mut nodes = Vec::with_capacity(steps.len() + 1);

        let root_label = NodeLabel::title(self.root_label);
        names.register_label(root_label.text(), self.root_id);
        nodes.push(Node {
            id: self.root_id.to_string(),
            kind: NodeKind::Root,
            label: root_label,
            rank: None,
            position: Position::default(),
            style: NodeStyle::root(),
        });

        let accepted = self.accepted_steps(steps);
        for step in &accepted {
            let label = NodeLabel::title(&step.name).with_subtitle(&step.agent);
            names.register_label(label.text(), &step.id);
            nodes.push(Node {
                id: step.id.clone(),
                kind: NodeKind::Step,
                label,
                rank: None,
                position: Position::default(),
                style: NodeStyle::for_status(&step.status),
            });
        }
        // Step names are the last resort, so they go in after every label
        for step in &accepted {
            names.register_step_name(&step.name, &step.id);
        }

        let groups = resolve_groups(accepted.iter().copied());
        let mut edges: IndexMap<String, Edge> = IndexMap::new();

        if let Some(first) = groups.first() {
            for step in &first.steps {
                insert_edge(&mut edges, Edge::structural(self.root_id, &step.id));
            }
        }

        for pair in groups.windows(2) {
            for source in &pair[0].steps {
                for target in &pair[1].steps {
                    insert_edge(&mut edges, Edge::structural(&source.id, &target.id));
                }
            }
        }

        GraphDescription {
            nodes,
            edges: edges.into_values().collect(),
            names,
            group_count: groups.len(),
        }
    }

    /// Steps whose id is free. Repeated ids and ids colliding with the root
    /// are skipped so node ids stay unique.
    fn accepted_steps<'s>(&self, steps: &'s [Step]) -> Vec<&'s Step> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(steps.len() + 1);
        seen.insert(self.root_id);

        steps
            .iter()
            .filter(|step| {
                let fresh = seen.insert(step.id.as_str());
                if !fresh {
                    warn!(step_id = %step.id, "skipping step with duplicate node id");
                }
                fresh
            })
            .collect()
    }
}

fn insert_edge(edges: &mut IndexMap<String, Edge>, edge: Edge) {
    if let Some(previous) = edges.insert(edge.id.clone(), edge) {
        warn!(edge_id = %previous.id, "duplicate structural edge id, keeping the latest");
    }
}
