use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "phaseguard")]
#[command(version, about = "Phase-gated workflow core for AI coding agents")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base directory for configuration and relative output paths
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Artifact output directory. Overrides PHASEGUARD_OUTPUT_DIR and phaseguard.toml.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve workflow tools over stdio, one JSON request per line
    Serve,
    /// Create .phaseguard/ with a default configuration
    Init,
    /// List workflow presets with their phases and iteration limits
    Presets,
    /// Suggest a workflow type for a task description
    Detect {
        #[arg(required = true)]
        task: Vec<String>,
    },
    /// List every phase with its order prefix
    Phases,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default phaseguard.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    phaseguard::logging::init(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Serve => cmd::cmd_serve(&cli, project_dir).await?,
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Presets => cmd::cmd_presets(),
        Commands::Detect { task } => cmd::cmd_detect(&task.join(" ")),
        Commands::Phases => cmd::cmd_phases(),
        Commands::Config { command } => cmd::cmd_config(&cli, &project_dir, command.clone())?,
    }

    Ok(())
}
