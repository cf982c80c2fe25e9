// Graph Data Models
// Nodes, edges and presentation attributes handed to the renderer

use crate::model::StepStatus;

use serde::Serialize;

/// Top-left anchored coordinates on the rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Step,
}

/// Two-line node label: step name over its agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeLabel {
    pub title: String,
    pub subtitle: Option<String>,
}

impl NodeLabel {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        let subtitle = subtitle.into();
        self.subtitle = (!subtitle.is_empty()).then_some(subtitle);
        self
    }

    /// Full text content of the label, lines joined with '\n'
    pub fn text(&self) -> String {
        match &self.subtitle {
            Some(subtitle) => format!("{}\n{}", self.title, subtitle),
            None => self.title.clone(),
        }
    }
}

/// Visual style derived from step status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStyle {
    pub border_color: &'static str,
    pub glow: Option<&'static str>,
}

impl NodeStyle {
    const FALLBACK_BORDER: &'static str = "#555";

    pub fn for_status(status: &StepStatus) -> Self {
        let (border_color, glow) = match status {
            StepStatus::Pending => ("#facc15", Some("0 0 15px rgba(250, 204, 21, 0.6)")),
            StepStatus::Running => ("#60a5fa", Some("0 0 20px rgba(96, 165, 250, 0.8)")),
            StepStatus::Failed => ("#ef4444", Some("0 0 20px rgba(239, 68, 68, 0.8)")),
            StepStatus::Done => ("#4ade80", Some("0 0 15px rgba(74, 222, 128, 0.6)")),
            StepStatus::Unknown(_) => (Self::FALLBACK_BORDER, None),
        };
        Self { border_color, glow }
    }

    pub fn root() -> Self {
        Self {
            border_color: "#a78bfa",
            glow: Some("0 0 20px rgba(167, 139, 250, 0.8)"),
        }
    }
}

/// A rendered node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub label: NodeLabel,
    /// Longest-path distance from the root; `None` until placed
    pub rank: Option<usize>,
    pub position: Position,
    pub style: NodeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Group-boundary dependency derived on every rebuild
    Structural,
    /// Short-lived communication edge owned by the overlay
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    /// Structural edge with an id derived from its endpoints
    pub fn structural(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: structural_edge_id(&source, &target),
            source,
            target,
            kind: EdgeKind::Structural,
            label: None,
        }
    }

    pub fn ephemeral(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Ephemeral,
            label: Some(label.into()),
        }
    }

    pub fn is_structural(&self) -> bool {
        self.kind == EdgeKind::Structural
    }
}

/// Edge id for a structural edge; identical endpoints always give the same id.
///
/// The source length prefix keeps ids distinct even when node ids contain
/// the `->` separator.
pub fn structural_edge_id(source: &str, target: &str) -> String {
    format!("{}:{}->{}", source.len(), source, target)
}
