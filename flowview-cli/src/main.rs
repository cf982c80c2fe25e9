// Flowview CLI
// Inspect step groups, compute layouts and replay event streams against the engine

mod commands;
mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use flowview_engine::EngineConfig;

use commands::groups::GroupsArgs;
use commands::layout::LayoutArgs;
use commands::replay::ReplayArgs;

/// Workflow graph inspector
#[derive(Parser, Debug)]
#[command(name = "flowview", version, about)]
struct Cli {
    /// Engine config file (default: $FLOWVIEW_CONFIG, then the user config dir)
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show how steps are grouped into execution stages
    Groups(GroupsArgs),

    /// Build the graph and print node ranks and positions
    Layout(LayoutArgs),

    /// Replay a recorded event stream and report ephemeral edges
    Replay(ReplayArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flowview=info,flowview_engine=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Groups(args) => commands::groups::execute(args),
        Command::Layout(args) => commands::layout::execute(args, config),
        Command::Replay(args) => commands::replay::execute(args, config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .wrap_err_with(|| format!("Failed to load config {}", path.display())),
        None => EngineConfig::discover().wrap_err("Failed to load engine config"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_layout_with_global_config() {
        let cli = Cli::try_parse_from([
            "flowview", "layout", "steps.json", "--format", "json", "-c", "cfg.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cfg.yaml")));
        assert!(matches!(cli.command, Command::Layout(_)));
    }

    #[test]
    fn test_load_config_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "root_alias: boss\noverlay:\n  ttl_ms: 500").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.root_alias, "boss");
        assert_eq!(config.overlay.ttl_ms, 500);
    }

    #[test]
    fn test_load_config_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.yaml"))).is_err());
    }
}
