//! phaseguard: a phase-gated workflow core for AI coding agents.
//!
//! An agent works a task through an ordered list of phases. Guidance about
//! which phase comes next is advisory; completing a phase is gated by
//! evidence validation, bounded retries and explicit human escalation.
//! Modifying a file that was never read is always refused.

pub mod artifacts;
pub mod audit;
pub mod config;
pub mod errors;
pub mod escalation;
pub mod guidance;
pub mod init;
pub mod logging;
pub mod orchestrator;
pub mod phase;
pub mod presets;
pub mod safety;
pub mod server;
pub mod session;
pub mod settings;
pub mod tools;
pub mod transition;
pub mod validation;
pub mod workflow_config;
