//! CLI command implementations.
//!
//! | Module    | Commands handled               |
//! |-----------|--------------------------------|
//! | `serve`   | `Serve`                        |
//! | `project` | `Init`                         |
//! | `phase`   | `Presets`, `Detect`, `Phases`  |
//! | `config`  | `Config`                       |

pub mod config;
pub mod phase;
pub mod project;
pub mod serve;

pub use config::cmd_config;
pub use phase::{cmd_detect, cmd_phases, cmd_presets};
pub use project::cmd_init;
pub use serve::cmd_serve;
