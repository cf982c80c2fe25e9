use crate::output;

use std::fmt::Write;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use flowview_engine::{EdgeKind, EngineConfig, GraphEngine, Node, RenderSnapshot, StepSnapshot};

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutFormat {
    /// Human-readable rank listing
    #[default]
    Text,
    /// Render snapshot as JSON
    Json,
}

/// Build the graph and print node ranks and positions
#[derive(Args, Debug)]
pub struct LayoutArgs {
    /// Step list (JSON array or project status document)
    pub steps: PathBuf,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = LayoutFormat::Text)]
    pub format: LayoutFormat,
}

pub fn execute(args: LayoutArgs, config: EngineConfig) -> Result<()> {
    let snapshot = StepSnapshot::load(&args.steps)
        .wrap_err_with(|| format!("Failed to load steps from {}", args.steps.display()))?;

    let mut engine = GraphEngine::new(config);
    engine.rebuild(&snapshot);
    let render = engine.render_snapshot();

    match args.format {
        LayoutFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&render)?);
        }
        LayoutFormat::Text => {
            output::status("Layout", &format!("{}", args.steps.display()));
            print!("{}", render_text(&render));

            let unplaced = render.nodes.iter().filter(|n| n.rank.is_none()).count();
            if unplaced > 0 {
                output::warning(&format!(
                    "{} node(s) unreachable from the root or on a cycle",
                    unplaced
                ));
            }
        }
    }

    Ok(())
}

fn render_text(render: &RenderSnapshot) -> String {
    let mut nodes: Vec<_> = render.nodes.iter().collect();
    // Unplaced nodes sort last
    nodes.sort_by(|a, b| {
        let rank = |n: &Node| n.rank.unwrap_or(usize::MAX);
        rank(a)
            .cmp(&rank(b))
            .then(a.position.x.total_cmp(&b.position.x))
    });

    let mut out = String::new();
    for node in nodes {
        let rank = match node.rank {
            Some(rank) => format!("rank {}", rank),
            None => "unplaced".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<9} {:<12} {:<24} ({:.1}, {:.1}) {}",
            rank,
            node.id,
            node.label.text().replace('\n', " / "),
            node.position.x,
            node.position.y,
            node.style.border_color
        );
    }

    let structural: Vec<_> = render
        .edges
        .iter()
        .filter(|e| e.kind == EdgeKind::Structural)
        .collect();
    if !structural.is_empty() {
        out.push('\n');
        for edge in structural {
            let _ = writeln!(out, "  {} -> {}", edge.source, edge.target);
        }
    }

    out
}
