//! File configuration for phaseguard.
//!
//! Settings are read from `.phaseguard/phaseguard.toml` and layered
//! file → environment → CLI. Every field has a default, so a missing file or
//! a partial file is fine.
//!
//! # Configuration File Format
//!
//! ```toml
//! [defaults]
//! workflow = "refactor"
//! guidance_mode = "directive"
//!
//! [output]
//! dir = "phaseguard-output"
//! formats = ["markdown", "json", "text"]
//! date_stamp = true
//! require_expected_files = false
//!
//! [escalation]
//! on_iteration_limit = true
//! on_errors = true
//! checkpoint_phases = ["COMPARE_ANALYZE"]
//!
//! [limits]
//! TEST = 4
//! LINT = 2
//!
//! [safety]
//! read_actions = ["read", "view"]
//! modify_actions = ["write", "edit"]
//!
//! [validation]
//! min_content_length = 20
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::phase::Phase;
use crate::presets::WorkflowType;
use crate::safety::ToolNameClassifier;
use crate::workflow_config::{
    DEFAULT_MIN_CONTENT_LENGTH, EscalationTriggers, GuidanceMode, OutputFormat,
};

/// Directory holding phaseguard's own files inside a project.
pub const CONFIG_DIR: &str = ".phaseguard";
/// Configuration file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "phaseguard.toml";

pub const ENV_OUTPUT_DIR: &str = "PHASEGUARD_OUTPUT_DIR";
pub const ENV_GUIDANCE_MODE: &str = "PHASEGUARD_GUIDANCE_MODE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsSection {
    /// Workflow used when `start_session` names none and detection finds nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowType>,
    #[serde(default)]
    pub guidance_mode: GuidanceMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Artifact directory, relative to the project directory unless absolute
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    #[serde(default = "default_true")]
    pub date_stamp: bool,
    #[serde(default)]
    pub require_expected_files: bool,
}

fn default_output_dir() -> String {
    "phaseguard-output".to_string()
}

fn default_formats() -> Vec<OutputFormat> {
    OutputFormat::all().to_vec()
}

fn default_true() -> bool {
    true
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            formats: default_formats(),
            date_stamp: true,
            require_expected_files: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationSection {
    #[serde(default = "default_true")]
    pub on_iteration_limit: bool,
    #[serde(default = "default_true")]
    pub on_errors: bool,
    /// Phases that need a human sign-off after completing
    #[serde(default)]
    pub checkpoint_phases: Vec<String>,
}

impl Default for EscalationSection {
    fn default() -> Self {
        Self {
            on_iteration_limit: true,
            on_errors: true,
            checkpoint_phases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetySection {
    #[serde(default = "ToolNameClassifier::default_read_actions")]
    pub read_actions: Vec<String>,
    #[serde(default = "ToolNameClassifier::default_modify_actions")]
    pub modify_actions: Vec<String>,
}

impl Default for SafetySection {
    fn default() -> Self {
        Self {
            read_actions: ToolNameClassifier::default_read_actions(),
            modify_actions: ToolNameClassifier::default_modify_actions(),
        }
    }
}

impl SafetySection {
    pub fn classifier(&self) -> ToolNameClassifier {
        ToolNameClassifier::new(&self.read_actions, &self.modify_actions)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,
}

fn default_min_content_length() -> usize {
    DEFAULT_MIN_CONTENT_LENGTH
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
        }
    }
}

/// The complete phaseguard.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseguardToml {
    #[serde(default)]
    pub defaults: DefaultsSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub escalation: EscalationSection,
    /// Per-phase iteration limits, keyed by phase name, applied over preset limits
    #[serde(default)]
    pub limits: BTreeMap<String, u32>,
    #[serde(default)]
    pub safety: SafetySection,
    #[serde(default)]
    pub validation: ValidationSection,
}

impl PhaseguardToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse phaseguard.toml")
    }

    /// Load `phaseguard.toml` from `config_dir`, or defaults when it does not exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize phaseguard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Limits from `[limits]` with valid phase names and positive values.
    pub fn limit_overrides(&self) -> BTreeMap<Phase, u32> {
        self.limits
            .iter()
            .filter(|(_, limit)| **limit > 0)
            .filter_map(|(name, limit)| name.parse::<Phase>().ok().map(|p| (p, *limit)))
            .collect()
    }

    pub fn escalation_triggers(&self) -> EscalationTriggers {
        EscalationTriggers {
            escalate_on_iteration_limit: self.escalation.on_iteration_limit,
            escalate_on_errors: self.escalation.on_errors,
            checkpoint_phases: self
                .escalation
                .checkpoint_phases
                .iter()
                .filter_map(|name| name.parse().ok())
                .collect(),
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, limit) in &self.limits {
            if name.parse::<Phase>().is_err() {
                warnings.push(format!("Unknown phase '{}' in [limits]", name));
            } else if *limit == 0 {
                warnings.push(format!(
                    "Limit for '{}' is 0; iteration limits must be positive",
                    name
                ));
            }
        }

        for name in &self.escalation.checkpoint_phases {
            if name.parse::<Phase>().is_err() {
                warnings.push(format!(
                    "Unknown phase '{}' in escalation.checkpoint_phases",
                    name
                ));
            }
        }

        if self.output.formats.is_empty() {
            warnings.push("output.formats is empty; every artifact would be rejected".to_string());
        }

        if self.output.dir.trim().is_empty() {
            warnings.push("output.dir is empty".to_string());
        }

        if self.validation.min_content_length == 0 {
            warnings.push(
                "validation.min_content_length is 0; empty artifacts would be accepted".to_string(),
            );
        }

        warnings
    }
}

/// Serializes tests that touch the process environment.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Layered settings: file → environment → CLI.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: PhaseguardToml,
    /// CLI override for the output directory
    pub cli_output_dir: Option<PathBuf>,
}

impl Settings {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = project_dir.join(CONFIG_DIR);
        let toml = PhaseguardToml::load_or_default(&config_dir)?;

        Ok(Self {
            project_dir,
            config_dir,
            toml,
            cli_output_dir: None,
        })
    }

    pub fn with_cli_args(project_dir: PathBuf, output_dir: Option<PathBuf>) -> Result<Self> {
        let mut settings = Self::new(project_dir)?;
        settings.cli_output_dir = output_dir;
        Ok(settings)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Output directory as configured (CLI → env → file), possibly relative.
    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cli_output_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR)
            && !dir.trim().is_empty()
        {
            return PathBuf::from(dir);
        }
        PathBuf::from(&self.toml.output.dir)
    }

    /// Guidance mode (env → file). An unparsable env value is ignored.
    pub fn guidance_mode(&self) -> GuidanceMode {
        if let Ok(value) = std::env::var(ENV_GUIDANCE_MODE) {
            match value.parse() {
                Ok(mode) => return mode,
                Err(e) => warn!("Ignoring {}: {}", ENV_GUIDANCE_MODE, e),
            }
        }
        self.toml.defaults.guidance_mode
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_gives_defaults() {
        let toml = PhaseguardToml::parse("").unwrap();
        assert!(toml.defaults.workflow.is_none());
        assert_eq!(toml.defaults.guidance_mode, GuidanceMode::Suggestive);
        assert_eq!(toml.output.dir, "phaseguard-output");
        assert_eq!(toml.output.formats.len(), 3);
        assert!(toml.output.date_stamp);
        assert!(toml.escalation.on_iteration_limit);
        assert_eq!(toml.validation.min_content_length, 20);
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_parse_full_file() {
        let content = r#"
[defaults]
workflow = "tdd"
guidance_mode = "directive"

[output]
dir = "out"
formats = ["markdown", "md"]
require_expected_files = true

[escalation]
on_errors = false
checkpoint_phases = ["compare_analyze"]

[limits]
TEST = 4
lint = 1

[validation]
min_content_length = 40
"#;
        let toml = PhaseguardToml::parse(content).unwrap();
        assert_eq!(toml.defaults.workflow, Some(WorkflowType::Tdd));
        assert_eq!(toml.defaults.guidance_mode, GuidanceMode::Directive);
        assert_eq!(toml.output.formats, vec![OutputFormat::Markdown, OutputFormat::Markdown]);
        assert!(toml.output.require_expected_files);

        let triggers = toml.escalation_triggers();
        assert!(triggers.escalate_on_iteration_limit);
        assert!(!triggers.escalate_on_errors);
        assert_eq!(triggers.checkpoint_phases, vec![Phase::CompareAnalyze]);

        let limits = toml.limit_overrides();
        assert_eq!(limits.get(&Phase::Test), Some(&4));
        assert_eq!(limits.get(&Phase::Lint), Some(&1));
        assert_eq!(toml.validation.min_content_length, 40);
    }

    #[test]
    fn test_validate_warns() {
        let content = r#"
[output]
formats = []

[escalation]
checkpoint_phases = ["DEPLOY"]

[limits]
BUILD = 3
TEST = 0
"#;
        let toml = PhaseguardToml::parse(content).unwrap();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 4, "{:?}", warnings);
        assert!(warnings.iter().any(|w| w.contains("Unknown phase 'BUILD'")));
        assert!(warnings.iter().any(|w| w.contains("'TEST' is 0")));
        assert!(warnings.iter().any(|w| w.contains("DEPLOY")));
        assert!(warnings.iter().any(|w| w.contains("formats is empty")));
        assert!(toml.limit_overrides().is_empty());
    }

    #[test]
    fn test_invalid_workflow_is_parse_error() {
        let content = "[defaults]\nworkflow = \"deploy\"\n";
        assert!(PhaseguardToml::parse(content).is_err());
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = PhaseguardToml::default();
        toml.limits.insert("TEST".into(), 7);
        toml.output.dir = "artifacts".into();
        toml.save(&path).unwrap();

        let loaded = PhaseguardToml::load(&path).unwrap();
        assert_eq!(loaded.limits.get("TEST"), Some(&7));
        assert_eq!(loaded.output.dir, "artifacts");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = PhaseguardToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.output.dir, "phaseguard-output");
    }

    #[test]
    fn test_output_dir_layering() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved = std::env::var(ENV_OUTPUT_DIR).ok();
        unsafe { std::env::remove_var(ENV_OUTPUT_DIR) };

        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join(CONFIG_FILE), "[output]\ndir = \"from-file\"\n").unwrap();

        let settings = Settings::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(settings.output_dir(), PathBuf::from("from-file"));

        unsafe { std::env::set_var(ENV_OUTPUT_DIR, "from-env") };
        assert_eq!(settings.output_dir(), PathBuf::from("from-env"));

        let settings =
            Settings::with_cli_args(dir.path().to_path_buf(), Some(PathBuf::from("from-cli")))
                .unwrap();
        assert_eq!(settings.output_dir(), PathBuf::from("from-cli"));

        unsafe { std::env::remove_var(ENV_OUTPUT_DIR) };
        if let Some(val) = saved {
            unsafe { std::env::set_var(ENV_OUTPUT_DIR, val) };
        }
    }

    #[test]
    fn test_guidance_mode_env_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved = std::env::var(ENV_GUIDANCE_MODE).ok();

        let dir = tempdir().unwrap();
        let settings = Settings::new(dir.path().to_path_buf()).unwrap();

        unsafe { std::env::set_var(ENV_GUIDANCE_MODE, "directive") };
        assert_eq!(settings.guidance_mode(), GuidanceMode::Directive);
        unsafe { std::env::set_var(ENV_GUIDANCE_MODE, "loud") };
        assert_eq!(settings.guidance_mode(), GuidanceMode::Suggestive);

        unsafe { std::env::remove_var(ENV_GUIDANCE_MODE) };
        if let Some(val) = saved {
            unsafe { std::env::set_var(ENV_GUIDANCE_MODE, val) };
        }
    }

    #[test]
    fn test_safety_section_classifier() {
        let toml = PhaseguardToml::parse("[safety]\nmodify_actions = [\"patch\"]\n").unwrap();
        use crate::safety::{ActionClassifier, ActionKind};
        let c = toml.safety.classifier();
        assert_eq!(c.classify("patch"), ActionKind::Modify);
        assert_eq!(c.classify("edit"), ActionKind::Other);
        assert_eq!(c.classify("read"), ActionKind::Read);
    }
}
