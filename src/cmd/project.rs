//! Project initialization command.

use anyhow::Result;

pub fn cmd_init(project_dir: &std::path::Path) -> Result<()> {
    use phaseguard::init::{init_project, is_initialized};

    let was_initialized = is_initialized(project_dir);
    let result = init_project(project_dir)?;

    if was_initialized {
        println!(
            "phaseguard already initialized at {}",
            result.config_dir.display()
        );
        println!("Existing phaseguard.toml left unchanged.");
    } else if result.created {
        println!(
            "Initialized phaseguard at {}",
            result.config_dir.display()
        );
        println!();
        println!("Created:");
        println!("  .phaseguard/");
        println!("  └── phaseguard.toml   # Workflow, output, escalation and safety settings");
        println!();
        println!("Next steps:");
        println!("  1. Adjust phaseguard.toml (`phaseguard config show`)");
        println!("  2. Run `phaseguard serve` from your agent's tool bridge");
    } else {
        println!("Wrote default config to {}", result.config_file.display());
    }

    Ok(())
}
