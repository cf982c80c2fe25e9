use crate::output;

use std::fmt::Write;
use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use flowview_engine::{resolve_groups, StepGroup, StepSnapshot};

/// Show how steps are grouped into execution stages
#[derive(Args, Debug)]
pub struct GroupsArgs {
    /// Step list (JSON array or project status document)
    pub steps: PathBuf,
}

pub fn execute(args: GroupsArgs) -> Result<()> {
    let snapshot = StepSnapshot::load(&args.steps)
        .wrap_err_with(|| format!("Failed to load steps from {}", args.steps.display()))?;

    output::status("Resolving", &format!("{}", args.steps.display()));

    let groups = resolve_groups(snapshot.iter());
    if groups.is_empty() {
        output::dim("  No steps");
        return Ok(());
    }

    print!("{}", render_groups(&groups));
    println!();
    output::success(&format!(
        "{} step(s) in {} group(s)",
        snapshot.len(),
        groups.len()
    ));

    Ok(())
}

fn render_groups(groups: &[StepGroup<'_>]) -> String {
    let mut out = String::new();

    for (index, group) in groups.iter().enumerate() {
        let kind = if group.len() > 1 { "parallel" } else { "single" };
        let _ = writeln!(out, "{:>3}. {} ({})", index + 1, group.key, kind);
        for step in &group.steps {
            let _ = writeln!(
                out,
                "       {:<10} {} @{} [{}]",
                step.id, step.name, step.agent, step.status
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowview_engine::{Step, StepStatus};

    #[test]
    fn test_render_groups_lists_members_in_order() {
        let steps = vec![
            Step::new("s1", "Plan", "ceo").with_status(StepStatus::Done),
            Step::new("s2", "API", "dev").with_group("g1"),
            Step::new("s3", "UI", "dev").with_group("g1"),
        ];
        let groups = resolve_groups(&steps);
        let text = render_groups(&groups);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("1. s1 (single)"));
        assert!(lines[1].contains("Plan @ceo [done]"));
        assert!(lines[2].contains("2. g1 (parallel)"));
        assert!(lines[3].contains("API"));
        assert!(lines[4].contains("UI"));
    }

    #[test]
    fn test_execute_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = GroupsArgs {
            steps: dir.path().join("steps.json"),
        };
        assert!(execute(args).is_err());
    }
}
