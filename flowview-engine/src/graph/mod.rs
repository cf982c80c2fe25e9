// Graph Module
// Group resolution, structural graph construction and layered layout

pub mod builder;
pub mod groups;
pub mod layout;
pub mod models;
pub mod names;

pub use builder::{GraphBuilder, GraphDescription};
pub use groups::{resolve_groups, StepGroup};
pub use layout::{Layout, LayoutEngine, Placement};
pub use models::{
    structural_edge_id, Edge, EdgeKind, Node, NodeKind, NodeLabel, NodeStyle, Position,
};
pub use names::{NameIndex, NameMatch};
