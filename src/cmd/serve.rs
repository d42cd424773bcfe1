//! Stdio tool server command.

use anyhow::Result;
use std::path::PathBuf;

use super::super::Cli;

pub async fn cmd_serve(cli: &Cli, project_dir: PathBuf) -> Result<()> {
    use phaseguard::config::Config;
    use phaseguard::orchestrator::Orchestrator;

    let config = Config::new(project_dir, cli.output_dir.clone(), cli.verbose)?;
    for warning in config.settings().validate() {
        tracing::warn!("{}", warning);
    }
    // Fail before the first request rather than on start_session.
    config.ensure_output_dir()?;
    tracing::info!(output_dir = %config.output_dir.display(), "Starting phaseguard");

    phaseguard::server::serve_stdio(Orchestrator::new(config)).await
}
