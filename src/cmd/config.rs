//! Configuration view and validation commands for `phaseguard config`.

use anyhow::{Context, Result};

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(
    cli: &Cli,
    project_dir: &std::path::Path,
    command: Option<ConfigCommands>,
) -> Result<()> {
    use phaseguard::config::Config;
    use phaseguard::init::get_config_dir;
    use phaseguard::settings::{CONFIG_FILE, PhaseguardToml};

    let config_dir = get_config_dir(project_dir);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", console::style("phaseguard configuration").bold().cyan());
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No phaseguard.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let config = Config::new(project_dir.to_path_buf(), cli.output_dir.clone(), cli.verbose)?;
            let rendered = toml::to_string_pretty(&config.settings().toml)
                .context("Failed to render configuration")?;
            for line in rendered.lines() {
                println!("  {}", line);
            }
            println!();

            println!("Effective values (with env/CLI overrides):");
            println!("  output_dir = \"{}\"", config.output_dir.display());
            println!("  guidance_mode = \"{}\"", config.settings().guidance_mode());
            println!();

            if !config_path.exists() {
                println!("Run 'phaseguard config init' to create a phaseguard.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No phaseguard.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = PhaseguardToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("{}", console::style("Configuration warnings:").yellow());
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("phaseguard.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config_dir).with_context(|| {
                format!("Failed to create directory: {}", config_dir.display())
            })?;
            PhaseguardToml::default().save(&config_path)?;

            println!("Created phaseguard.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [defaults] workflow, guidance_mode");
            println!("  - [output] dir, formats, date_stamp, require_expected_files");
            println!("  - [escalation] on_iteration_limit, on_errors, checkpoint_phases");
            println!("  - [limits] per-phase iteration limits, e.g. TEST = 4");
            println!("  - [safety] read_actions, modify_actions");
            println!();
        }
    }

    Ok(())
}
