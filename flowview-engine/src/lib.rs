// Flowview Engine Library
// Workflow graph engine: step grouping, layered layout and live event overlays

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod model;
pub mod overlay;
pub mod runtime;

// Re-export commonly used types
pub use config::{EngineConfig, LayoutConfig, OverlayConfig};
pub use engine::{GraphEngine, RebuildOutcome, RenderSnapshot};
pub use error::{EngineError, EngineResult};

// Re-export model and graph types
pub use graph::{
    resolve_groups, Edge, EdgeKind, GraphBuilder, GraphDescription, Layout, LayoutEngine,
    NameIndex, Node, NodeKind, NodeLabel, NodeStyle, Position, StepGroup,
};
pub use model::{ProjectStatus, Step, StepSnapshot, StepStatus};

// Re-export overlay and runtime types
pub use overlay::{
    Clock, DashboardEvent, DropReason, ManualClock, OverlayManager, OverlayOutcome, TokioClock,
};
pub use runtime::{spawn_engine, EngineHandle, EventSender, RenderReceiver, SnapshotSender};
