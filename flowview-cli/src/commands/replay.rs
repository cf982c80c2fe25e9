use crate::output;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use tokio::time::Instant;

use flowview_engine::{
    spawn_engine, DashboardEvent, Edge, EdgeKind, EngineConfig, GraphEngine, RenderReceiver,
    RenderSnapshot, StepSnapshot,
};

/// Replay a recorded event stream and report ephemeral edges
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Step list (JSON array or project status document)
    pub steps: PathBuf,

    /// Recorded events, one JSON payload per line
    pub events: PathBuf,

    /// Pause between consecutive events
    #[arg(long, default_value_t = 250, value_name = "MS")]
    pub delay_ms: u64,

    /// Override the ephemeral edge lifetime
    #[arg(long, value_name = "MS")]
    pub ttl_ms: Option<u64>,
}

/// Totals reported once the replay has drained
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub shown: usize,
    pub expired: usize,
}

pub async fn execute(args: ReplayArgs, mut config: EngineConfig) -> Result<()> {
    if let Some(ttl_ms) = args.ttl_ms {
        config.overlay.ttl_ms = ttl_ms;
        config.validate()?;
    }

    let snapshot = StepSnapshot::load(&args.steps)
        .wrap_err_with(|| format!("Failed to load steps from {}", args.steps.display()))?;
    let events = read_events(&args.events)?;

    output::status(
        "Replaying",
        &format!("{} event(s) against {} step(s)", events.len(), snapshot.len()),
    );

    let summary = replay(snapshot, events, config, Duration::from_millis(args.delay_ms)).await?;

    println!();
    output::success(&format!(
        "{} event(s) replayed, {} edge(s) shown, {} expired",
        summary.events, summary.shown, summary.expired
    ));

    Ok(())
}

/// Drive a fresh engine with one snapshot and a sequence of events, then
/// wait until every ephemeral edge has expired.
pub async fn replay(
    snapshot: StepSnapshot,
    events: Vec<(usize, DashboardEvent)>,
    config: EngineConfig,
    delay: Duration,
) -> Result<ReplaySummary> {
    let handle = spawn_engine(GraphEngine::new(config));
    let watcher = tokio::spawn(watch_overlay(handle.subscribe(), Instant::now()));

    handle.publish_steps(snapshot);

    let total = events.len();
    for (line, event) in events {
        if !handle.send_event(event) {
            return Err(eyre!("engine stopped before line {}", line));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    output::dim("  waiting for pending edges to expire");
    handle
        .shutdown()
        .await
        .ok_or_else(|| eyre!("engine task terminated abnormally"))?;

    let mut summary = watcher.await?;
    summary.events = total;
    Ok(summary)
}

fn read_events(path: &Path) -> Result<Vec<(usize, DashboardEvent)>> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read events from {}", path.display()))?;
    Ok(parse_events(&content))
}

/// Parse JSON lines, skipping blank lines and warning on malformed ones
fn parse_events(content: &str) -> Vec<(usize, DashboardEvent)> {
    let mut events = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match DashboardEvent::from_json(line) {
            Ok(event) => events.push((line_no, event)),
            Err(e) => output::warning(&format!("line {}: {}", line_no, e)),
        }
    }

    events
}

async fn watch_overlay(mut render: RenderReceiver, started: Instant) -> ReplaySummary {
    let mut tracker = OverlayTracker::default();

    while render.changed().await.is_ok() {
        let snapshot = render.borrow_and_update().clone();
        let elapsed = started.elapsed().as_millis();
        for change in tracker.observe(&snapshot) {
            match change {
                OverlayChange::Shown(edge) => println!(
                    "[{:>6}ms] + {} -> {}  {}",
                    elapsed,
                    edge.source,
                    edge.target,
                    edge.label.as_deref().unwrap_or("")
                ),
                OverlayChange::Expired(edge) => {
                    println!("[{:>6}ms] - {} -> {}", elapsed, edge.source, edge.target)
                }
            }
        }
    }

    tracker.summary()
}

#[derive(Debug, Clone, PartialEq)]
enum OverlayChange {
    Shown(Edge),
    Expired(Edge),
}

/// Diffs consecutive render snapshots by ephemeral edge id
#[derive(Debug, Default)]
struct OverlayTracker {
    live: Vec<Edge>,
    shown: usize,
    expired: usize,
}

impl OverlayTracker {
    fn observe(&mut self, snapshot: &RenderSnapshot) -> Vec<OverlayChange> {
        let current: Vec<Edge> = snapshot
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Ephemeral)
            .cloned()
            .collect();

        let mut changes = Vec::new();
        for edge in &self.live {
            if !current.iter().any(|e| e.id == edge.id) {
                changes.push(OverlayChange::Expired(edge.clone()));
            }
        }
        for edge in &current {
            if !self.live.iter().any(|e| e.id == edge.id) {
                changes.push(OverlayChange::Shown(edge.clone()));
            }
        }

        for change in &changes {
            match change {
                OverlayChange::Shown(_) => self.shown += 1,
                OverlayChange::Expired(_) => self.expired += 1,
            }
        }
        self.live = current;
        changes
    }

    fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            events: 0,
            shown: self.shown,
            expired: self.expired,
        }
    }
}
