// Event Overlay Manager
// Turns communication events into ephemeral edges and removes them after a fixed TTL

use super::clock::Clock;
use super::events::DashboardEvent;
use crate::graph::{Edge, NameIndex};

use indexmap::IndexMap;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// An ephemeral edge that is currently visible
#[derive(Debug, Clone, PartialEq)]
pub struct EphemeralEdge {
    pub edge: Edge,
    pub expires_at: Instant,
}

/// What happened to an incoming event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// A new edge is visible
    Inserted { edge_id: String },
    /// Communication event whose endpoints did not resolve
    Dropped(DropReason),
    /// Not a communication event
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    UnknownSource(String),
    UnknownTarget(String),
}

/// Scheduled-removal record; ordered by deadline, then insertion
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledRemoval {
    expires_at: Instant,
    seq: u64,
    edge_id: String,
}

impl Ord for ScheduledRemoval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expires_at
            .cmp(&other.expires_at)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScheduledRemoval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns every ephemeral edge.
///
/// Each edge goes created -> visible -> removed, nothing else. Every insert
/// schedules exactly one removal of that edge id; removal is idempotent, so
/// an edge already dropped by a rebuild or by hand is simply skipped when
/// its deadline comes up.
#[derive(Debug)]
pub struct OverlayManager {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    epoch: Instant,
    edges: IndexMap<String, EphemeralEdge>,
    schedule: BinaryHeap<Reverse<ScheduledRemoval>>,
    counter: u64,
}

impl OverlayManager {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let epoch = clock.now();
        Self {
            ttl,
            clock,
            epoch,
            edges: IndexMap::new(),
            schedule: BinaryHeap::new(),
            counter: 0,
        }
    }

    /// Resolve a communication event against the current names and insert
    /// an edge for it. Unresolvable events are dropped silently.
    pub fn handle_event(&mut self, event: &DashboardEvent, names: &NameIndex) -> OverlayOutcome {
        let Some(communication) = event.as_communication() else {
            return OverlayOutcome::Ignored;
        };

        let Some(source) = names.resolve(&communication.source) else {
            debug!(source = %communication.source, "dropping communication: unknown source");
            return OverlayOutcome::Dropped(DropReason::UnknownSource(
                communication.source.clone(),
            ));
        };
        let Some(target) = names.resolve(&communication.target) else {
            debug!(target = %communication.target, "dropping communication: unknown target");
            return OverlayOutcome::Dropped(DropReason::UnknownTarget(
                communication.target.clone(),
            ));
        };

        let edge_id = self.insert(source, target, &communication.message);
        OverlayOutcome::Inserted { edge_id }
    }

    /// Insert an edge between two resolved node ids and schedule its removal
    pub fn insert(&mut self, source: &str, target: &str, message: &str) -> String {
        let now = self.clock.now();
        let edge_id = self.next_edge_id(now);
        let expires_at = now + self.ttl;

        self.edges.insert(
            edge_id.clone(),
            EphemeralEdge {
                edge: Edge::ephemeral(&edge_id, source, target, message),
                expires_at,
            },
        );
        self.schedule.push(Reverse(ScheduledRemoval {
            expires_at,
            seq: self.counter,
            edge_id: edge_id.clone(),
        }));

        debug!(%edge_id, source, target, "ephemeral edge inserted");
        edge_id
    }

    /// Time-derived id plus a counter so bursts within the same
    /// millisecond never collide
    fn next_edge_id(&mut self, now: Instant) -> String {
        self.counter += 1;
        let millis = now.saturating_duration_since(self.epoch).as_millis();
        format!("comm-{}-{}", millis, self.counter)
    }

    /// Remove one edge by id. Returns false if it was already gone.
    pub fn remove_edge(&mut self, edge_id: &str) -> bool {
        self.edges.shift_remove(edge_id).is_some()
    }

    /// Remove every edge whose deadline has passed on the manager's clock
    pub fn sweep(&mut self) -> Vec<String> {
        let now = self.clock.now();
        self.sweep_at(now)
    }

    fn sweep_at(&mut self, now: Instant) -> Vec<String> {
        let mut removed = Vec::new();

        while let Some(Reverse(next)) = self.schedule.peek() {
            if next.expires_at > now {
                break;
            }
            let Some(Reverse(due)) = self.schedule.pop() else {
                break;
            };
            if self.remove_edge(&due.edge_id) {
                debug!(edge_id = %due.edge_id, "ephemeral edge expired");
                removed.push(due.edge_id);
            }
        }

        removed
    }

    /// Earliest pending deadline, if any removal is still scheduled
    pub fn next_expiry(&self) -> Option<Instant> {
        self.schedule.peek().map(|Reverse(next)| next.expires_at)
    }

    /// Drop edges whose endpoints no longer exist. Returns the removed ids.
    pub fn retain_endpoints(&mut self, mut is_live: impl FnMut(&str) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.edges.retain(|id, ephemeral| {
            let keep = is_live(&ephemeral.edge.source) && is_live(&ephemeral.edge.target);
            if !keep {
                removed.push(id.clone());
            }
            keep
        });
        removed
    }

    pub fn get(&self, edge_id: &str) -> Option<&EphemeralEdge> {
        self.edges.get(edge_id)
    }

    pub fn contains(&self, edge_id: &str) -> bool {
        self.edges.contains_key(edge_id)
    }

    /// Visible edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().map(|ephemeral| &ephemeral.edge)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;
    use crate::overlay::clock::ManualClock;

    const TTL: Duration = Duration::from_millis(3000);

    fn names() -> NameIndex {
        let mut names = NameIndex::new("ceo", "root");
        names.register_label("Plan\nceo", "s1");
        names.register_label("Code\ndev", "s2");
        names.register_step_name("Plan", "s1");
        names.register_step_name("Code", "s2");
        names
    }

    fn manager() -> (OverlayManager, ManualClock) {
        let clock = ManualClock::new();
        let manager = OverlayManager::new(TTL, Arc::new(clock.clone()));
        (manager, clock)
    }

    fn inserted_id(outcome: OverlayOutcome) -> String {
        match outcome {
            OverlayOutcome::Inserted { edge_id } => edge_id,
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_communication_creates_labelled_edge() {
        let (mut overlay, _clock) = manager();
        let event = DashboardEvent::communication("ceo", "Code", "go");

        let id = inserted_id(overlay.handle_event(&event, &names()));

        let edge = &overlay.get(&id).unwrap().edge;
        assert_eq!(edge.source, "root");
        assert_eq!(edge.target, "s2");
        assert_eq!(edge.kind, EdgeKind::Ephemeral);
        assert_eq!(edge.label.as_deref(), Some("go"));
        assert_eq!(overlay.len(), 1);
    }

    #[test]
    fn test_edge_expires_after_ttl() {
        let (mut overlay, clock) = manager();
        let id = inserted_id(
            overlay.handle_event(&DashboardEvent::communication("ceo", "Code", "go"), &names()),
        );

        let expires_at = overlay.get(&id).map(|ephemeral| ephemeral.expires_at);
        assert_eq!(expires_at, overlay.next_expiry());

        clock.advance(TTL - Duration::from_millis(1));
        assert!(overlay.sweep().is_empty());
        assert!(overlay.contains(&id));

        clock.advance(Duration::from_millis(1));
        assert_eq!(overlay.sweep(), vec![id]);
        assert!(overlay.is_empty());
        assert_eq!(overlay.next_expiry(), None);
    }

    #[test]
    fn test_unknown_endpoints_are_dropped() {
        let (mut overlay, _clock) = manager();

        let outcome =
            overlay.handle_event(&DashboardEvent::communication("nobody", "Code", "hi"), &names());
        assert_eq!(
            outcome,
            OverlayOutcome::Dropped(DropReason::UnknownSource("nobody".into()))
        );

        let outcome =
            overlay.handle_event(&DashboardEvent::communication("ceo", "Deploy", "hi"), &names());
        assert_eq!(
            outcome,
            OverlayOutcome::Dropped(DropReason::UnknownTarget("Deploy".into()))
        );

        assert!(overlay.is_empty());
        assert_eq!(overlay.next_expiry(), None);
    }

    #[test]
    fn test_non_communication_events_are_ignored() {
        let (mut overlay, _clock) = manager();
        let outcome = overlay.handle_event(&DashboardEvent::log("developer", "info", "hi"), &names());
        assert_eq!(outcome, OverlayOutcome::Ignored);
        assert_eq!(
            overlay.handle_event(&DashboardEvent::Unknown, &names()),
            OverlayOutcome::Ignored
        );
    }

    #[test]
    fn test_same_pair_edges_have_independent_lifecycles() {
        let (mut overlay, clock) = manager();
        let event = DashboardEvent::communication("Plan", "Code", "first");

        let first = inserted_id(overlay.handle_event(&event, &names()));
        clock.advance(Duration::from_millis(1000));
        let second = inserted_id(overlay.handle_event(&event, &names()));
        assert_ne!(first, second);

        clock.advance(Duration::from_millis(2000));
        assert_eq!(overlay.sweep(), vec![first.clone()]);
        assert!(overlay.contains(&second));

        clock.advance(Duration::from_millis(1000));
        assert_eq!(overlay.sweep(), vec![second]);
    }

    #[test]
    fn test_burst_ids_are_unique() {
        let (mut overlay, _clock) = manager();
        let event = DashboardEvent::communication("ceo", "Plan", "burst");

        let ids: Vec<String> = (0..50)
            .map(|_| inserted_id(overlay.handle_event(&event, &names())))
            .collect();

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 50);
        assert_eq!(overlay.len(), 50);
    }

    #[test]
    fn test_manual_removal_is_idempotent() {
        let (mut overlay, clock) = manager();
        let a = overlay.insert("root", "s1", "a");
        let b = overlay.insert("root", "s1", "b");

        assert!(overlay.remove_edge(&a));
        assert!(!overlay.remove_edge(&a));
        assert!(overlay.contains(&b));

        // The scheduled removal of `a` is a no-op; `b` still expires on time
        clock.advance(TTL);
        assert_eq!(overlay.sweep(), vec![b]);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_retain_endpoints_drops_stale_edges() {
        let (mut overlay, _clock) = manager();
        let keep = overlay.insert("root", "s1", "keep");
        let stale = overlay.insert("s1", "s9", "stale");

        let removed = overlay.retain_endpoints(|id| id != "s9");
        assert_eq!(removed, vec![stale.clone()]);
        assert!(overlay.contains(&keep));
        assert!(!overlay.contains(&stale));
    }

    #[test]
    fn test_edge_ids_carry_elapsed_time() {
        let (mut overlay, clock) = manager();
        clock.advance(Duration::from_millis(1234));
        let id = overlay.insert("root", "s1", "hi");
        assert_eq!(id, "comm-1234-1");
    }
}
