// Engine Runtime
// Drives a GraphEngine on a single tokio task: snapshots, events and expiry timers

use crate::engine::{GraphEngine, RenderSnapshot};
use crate::model::StepSnapshot;
use crate::overlay::{DashboardEvent, OverlayOutcome};

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

/// Sender for step snapshots published by the orchestrator
pub type SnapshotSender = mpsc::UnboundedSender<StepSnapshot>;

/// Sender for the live event stream
pub type EventSender = mpsc::UnboundedSender<DashboardEvent>;

/// Receiver of read-only render snapshots
pub type RenderReceiver = watch::Receiver<RenderSnapshot>;

/// Handle to a running engine task.
///
/// Dropping both senders (via [`EngineHandle::shutdown`]) lets the task
/// finish once every scheduled removal has fired.
#[derive(Debug)]
pub struct EngineHandle {
    snapshots: SnapshotSender,
    events: EventSender,
    render: RenderReceiver,
    task: JoinHandle<GraphEngine>,
}

impl EngineHandle {
    /// Publish a new step snapshot. Returns false if the engine has stopped.
    pub fn publish_steps(&self, snapshot: StepSnapshot) -> bool {
        self.snapshots.send(snapshot).is_ok()
    }

    /// Forward one event. Returns false if the engine has stopped.
    pub fn send_event(&self, event: DashboardEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Subscribe to render snapshots; the current one is available immediately
    pub fn subscribe(&self) -> RenderReceiver {
        self.render.clone()
    }

    /// Close the inbound channels and wait for pending expiries to drain
    pub async fn shutdown(self) -> Option<GraphEngine> {
        let EngineHandle {
            snapshots,
            events,
            render,
            task,
        } = self;
        drop(snapshots);
        drop(events);
        drop(render);
        task.await.ok()
    }
}

/// Spawn the engine onto its own task.
///
/// All mutations happen on that task, so a rebuild and an expiry can never
/// interleave mid-operation.
pub fn spawn_engine(engine: GraphEngine) -> EngineHandle {
    let (snapshots, snapshots_rx) = mpsc::unbounded_channel();
    let (events, events_rx) = mpsc::unbounded_channel();
    let (render_tx, render) = watch::channel(engine.render_snapshot());

    let task = tokio::spawn(run_engine(engine, snapshots_rx, events_rx, render_tx));

    EngineHandle {
        snapshots,
        events,
        render,
        task,
    }
}

async fn run_engine(
    mut engine: GraphEngine,
    mut snapshots: mpsc::UnboundedReceiver<StepSnapshot>,
    mut events: mpsc::UnboundedReceiver<DashboardEvent>,
    render: watch::Sender<RenderSnapshot>,
) -> GraphEngine {
    let mut snapshots_open = true;
    let mut events_open = true;

    debug!("graph engine started");

    loop {
        let deadline = engine.next_expiry().map(Instant::from_std);
        if !snapshots_open && !events_open && deadline.is_none() {
            break;
        }
        // Only polled when a deadline exists
        let wake_at = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        // Snapshots first, so events resolve against the newest names
        let changed = tokio::select! {
            biased;

            snapshot = snapshots.recv(), if snapshots_open => match snapshot {
                Some(snapshot) => engine.rebuild(&snapshot).is_rebuilt(),
                None => {
                    snapshots_open = false;
                    false
                }
            },
            event = events.recv(), if events_open => match event {
                Some(event) => {
                    let outcome = engine.handle_event(&event);
                    trace!(kind = event.kind(), ?outcome, "event handled");
                    matches!(outcome, OverlayOutcome::Inserted { .. })
                }
                None => {
                    events_open = false;
                    false
                }
            },
            _ = sleep_until(wake_at), if deadline.is_some() => {
                !engine.expire().is_empty()
            }
            else => break,
        };

        if changed {
            render.send_replace(engine.render_snapshot());
        }
    }

    debug!("graph engine stopped");
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::graph::EdgeKind;
    use crate::model::Step;

    fn scenario_a() -> StepSnapshot {
        StepSnapshot::new(vec![
            Step::new("s1", "Plan", "ceo"),
            Step::new("s2", "Code", "dev"),
        ])
    }

    fn ephemeral_count(snapshot: &RenderSnapshot) -> usize {
        snapshot
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Ephemeral)
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebuild_publishes_render_snapshot() {
        let handle = spawn_engine(GraphEngine::new(EngineConfig::default()));
        let mut render = handle.subscribe();
        assert_eq!(render.borrow().nodes.len(), 1);

        assert!(handle.publish_steps(scenario_a()));
        render.changed().await.unwrap();
        assert_eq!(render.borrow_and_update().nodes.len(), 3);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_edge_expires_on_timer() {
        let handle = spawn_engine(GraphEngine::new(EngineConfig::default()));
        let mut render = handle.subscribe();

        handle.publish_steps(scenario_a());
        render.changed().await.unwrap();
        render.borrow_and_update();

        handle.send_event(DashboardEvent::communication("ceo", "Code", "go"));
        render.changed().await.unwrap();
        let start = Instant::now();
        assert_eq!(ephemeral_count(&render.borrow_and_update()), 1);

        render.changed().await.unwrap();
        assert_eq!(ephemeral_count(&render.borrow_and_update()), 0);
        assert!(start.elapsed() >= Duration::from_millis(3000));

        let engine = handle.shutdown().await.unwrap();
        assert_eq!(engine.structural_edges().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_event_publishes_nothing() {
        let handle = spawn_engine(GraphEngine::new(EngineConfig::default()));
        let mut render = handle.subscribe();

        handle.publish_steps(scenario_a());
        render.changed().await.unwrap();
        let before = render.borrow_and_update().clone();

        handle.send_event(DashboardEvent::communication("ghost", "Code", "boo"));
        handle.send_event(DashboardEvent::log("developer", "info", "thinking"));

        let engine = handle.shutdown().await.unwrap();
        assert_eq!(*render.borrow(), before);
        assert_eq!(engine.ephemeral_edges().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_pending_expiry() {
        let handle = spawn_engine(GraphEngine::new(EngineConfig::default()));
        handle.publish_steps(scenario_a());
        handle.send_event(DashboardEvent::communication("Plan", "Code", "handoff"));

        let start = Instant::now();
        let engine = handle.shutdown().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert_eq!(engine.ephemeral_edges().count(), 0);
        assert_eq!(engine.next_expiry(), None);
    }
}
