//! Preset, detection and phase listing commands.

use phaseguard::phase::Phase;
use phaseguard::presets::{all_presets, detect_workflow_type, resolve};

pub fn cmd_presets() {
    println!();
    for preset in all_presets() {
        println!(
            "{}  {}",
            console::style(preset.workflow_type).bold().cyan(),
            console::style(&preset.description).dim()
        );
        if preset.phases.is_empty() {
            println!("    (phases supplied by the caller)");
        }
        for phase in &preset.phases {
            match preset.iteration_limits.get(phase) {
                Some(limit) => println!("    {:<22} limit {}", phase.as_str(), limit),
                None => println!("    {}", phase),
            }
        }
        println!();
    }
}

pub fn cmd_detect(task: &str) {
    match detect_workflow_type(task) {
        Some(workflow_type) => {
            println!("{}", console::style(workflow_type).bold());
            let preset = resolve(workflow_type);
            let names: Vec<&str> = preset.phases.iter().map(|p| p.as_str()).collect();
            println!("  {}", names.join(" → "));
        }
        None => {
            println!(
                "{} (no keywords matched, default)",
                console::style(phaseguard::presets::WorkflowType::default()).bold()
            );
        }
    }
}

pub fn cmd_phases() {
    println!();
    println!("{:<6} {:<22} Title", "Order", "Phase");
    println!("{:<6} {:<22} -----", "-----", "-----");
    for phase in Phase::all() {
        println!("{:<6} {:<22} {}", format!("{:02}", phase.order()), phase.as_str(), phase.title());
    }
    println!();
}
