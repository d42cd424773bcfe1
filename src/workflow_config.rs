//! Per-session workflow configuration.
//!
//! A `WorkflowConfiguration` is chosen once when a session starts and never
//! changes afterwards. It carries the ordered phase sequence, the iteration
//! caps, output preferences, escalation triggers and the guidance mode.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::errors::WorkflowError;
use crate::phase::Phase;
use crate::presets::{self, WorkflowType};

/// Default minimum length (trimmed chars) of an artifact's content.
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 20;

/// How guidance is phrased to the agent.
///
/// Selected once at configuration time. Neither mode blocks a transition;
/// completion is always gated by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceMode {
    /// Requirements are reported as recommendations
    #[default]
    Suggestive,
    /// Requirements are reported as mandatory and out-of-order requests are flagged
    Directive,
}

impl std::fmt::Display for GuidanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuidanceMode::Suggestive => write!(f, "suggestive"),
            GuidanceMode::Directive => write!(f, "directive"),
        }
    }
}

impl std::str::FromStr for GuidanceMode {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "suggestive" => Ok(GuidanceMode::Suggestive),
            "directive" => Ok(GuidanceMode::Directive),
            _ => Err(WorkflowError::InvalidParams(format!(
                "Invalid guidance mode '{}'. Valid values: suggestive, directive",
                s
            ))),
        }
    }
}

/// Format of a submitted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(alias = "md")]
    Markdown,
    Json,
    #[serde(alias = "txt")]
    Text,
}

impl OutputFormat {
    pub fn all() -> &'static [OutputFormat] {
        &[OutputFormat::Markdown, OutputFormat::Json, OutputFormat::Text]
    }

    /// File extension used when the artifact is written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

/// Where and how validated artifacts are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPreferences {
    /// Absolute artifact directory (resolved by [`crate::config::Config`])
    pub artifact_dir: PathBuf,
    /// Formats an artifact may declare
    pub formats: Vec<OutputFormat>,
    /// Append a `YYYYMMDD` stamp to artifact file names
    pub date_stamp: bool,
    /// Enforce each phase's expected output-file identifier
    pub require_expected_files: bool,
}

impl OutputPreferences {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            formats: OutputFormat::all().to_vec(),
            date_stamp: true,
            require_expected_files: false,
        }
    }

    pub fn allows(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }
}

/// Which conditions may raise an escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationTriggers {
    pub escalate_on_iteration_limit: bool,
    pub escalate_on_errors: bool,
    /// Phases whose successful completion requires a human sign-off
    #[serde(default)]
    pub checkpoint_phases: Vec<Phase>,
}

impl Default for EscalationTriggers {
    fn default() -> Self {
        Self {
            escalate_on_iteration_limit: true,
            escalate_on_errors: true,
            checkpoint_phases: Vec::new(),
        }
    }
}

/// Immutable per-session workflow configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfiguration {
    pub workflow_type: WorkflowType,
    pub selected_phases: Vec<Phase>,
    pub iteration_limits: BTreeMap<Phase, u32>,
    pub output_preferences: OutputPreferences,
    pub escalation_triggers: EscalationTriggers,
    pub guidance_mode: GuidanceMode,
    pub min_content_length: usize,
}

impl WorkflowConfiguration {
    /// Build and validate a configuration.
    ///
    /// Fails when the phase list is empty or has duplicates, or when a limit is
    /// zero.
    pub fn new(
        workflow_type: WorkflowType,
        selected_phases: Vec<Phase>,
        iteration_limits: BTreeMap<Phase, u32>,
        output_preferences: OutputPreferences,
    ) -> Result<Self, WorkflowError> {
        if selected_phases.is_empty() {
            return Err(WorkflowError::InvalidWorkflow(
                "selected phases must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for phase in &selected_phases {
            if !seen.insert(*phase) {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "phase {} appears more than once",
                    phase
                )));
            }
        }

        if let Some((phase, _)) = iteration_limits.iter().find(|(_, limit)| **limit == 0) {
            return Err(WorkflowError::InvalidWorkflow(format!(
                "iteration limit for {} must be positive",
                phase
            )));
        }

        Ok(Self {
            workflow_type,
            selected_phases,
            iteration_limits,
            output_preferences,
            escalation_triggers: EscalationTriggers::default(),
            guidance_mode: GuidanceMode::default(),
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
        })
    }

    /// Build a configuration straight from a preset's phases and limits.
    pub fn from_preset(
        workflow_type: WorkflowType,
        output_preferences: OutputPreferences,
    ) -> Result<Self, WorkflowError> {
        let preset = presets::resolve(workflow_type);
        Self::new(
            workflow_type,
            preset.phases,
            preset.iteration_limits,
            output_preferences,
        )
    }

    pub fn with_escalation_triggers(mut self, triggers: EscalationTriggers) -> Self {
        self.escalation_triggers = triggers;
        self
    }

    pub fn with_guidance_mode(mut self, mode: GuidanceMode) -> Self {
        self.guidance_mode = mode;
        self
    }

    pub fn with_min_content_length(mut self, len: usize) -> Self {
        self.min_content_length = len;
        self
    }

    /// Apply extra limits on top of the existing ones (later wins).
    pub fn with_limit_overrides(
        mut self,
        overrides: &BTreeMap<Phase, u32>,
    ) -> Result<Self, WorkflowError> {
        for (phase, limit) in overrides {
            if *limit == 0 {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "iteration limit for {} must be positive",
                    phase
                )));
            }
            self.iteration_limits.insert(*phase, *limit);
        }
        Ok(self)
    }

    pub fn iteration_limit(&self, phase: Phase) -> Option<u32> {
        self.iteration_limits.get(&phase).copied()
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.selected_phases.contains(&phase)
    }

    pub fn position(&self, phase: Phase) -> Option<usize> {
        self.selected_phases.iter().position(|p| *p == phase)
    }

    pub fn first_phase(&self) -> Phase {
        // Non-empty by construction.
        self.selected_phases[0]
    }

    pub fn is_checkpoint(&self, phase: Phase) -> bool {
        self.escalation_triggers.checkpoint_phases.contains(&phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> OutputPreferences {
        OutputPreferences::new("/tmp/artifacts")
    }

    #[test]
    fn test_rejects_empty_phase_list() {
        let err = WorkflowConfiguration::new(WorkflowType::Custom, vec![], BTreeMap::new(), prefs())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidWorkflow(_)));
    }

    #[test]
    fn test_rejects_duplicate_phases() {
        let err = WorkflowConfiguration::new(
            WorkflowType::Custom,
            vec![Phase::Test, Phase::Lint, Phase::Test],
            BTreeMap::new(),
            prefs(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("TEST"));
    }

    #[test]
    fn test_rejects_zero_limit() {
        let limits = BTreeMap::from([(Phase::Lint, 0)]);
        let result =
            WorkflowConfiguration::new(WorkflowType::Custom, vec![Phase::Lint], limits, prefs());
        assert!(result.is_err());
    }

    #[test]
    fn test_limit_overrides_replace_preset_values() {
        let config = WorkflowConfiguration::from_preset(WorkflowType::Refactor, prefs())
            .unwrap()
            .with_limit_overrides(&BTreeMap::from([(Phase::Lint, 7)]))
            .unwrap();
        assert_eq!(config.iteration_limit(Phase::Lint), Some(7));
    }

    #[test]
    fn test_custom_preset_has_no_phases() {
        let result = WorkflowConfiguration::from_preset(WorkflowType::Custom, prefs());
        assert!(result.is_err());
    }

    #[test]
    fn test_output_format_aliases() {
        let f: OutputFormat = serde_json::from_str("\"md\"").unwrap();
        assert_eq!(f, OutputFormat::Markdown);
        let f: OutputFormat = serde_json::from_str("\"txt\"").unwrap();
        assert_eq!(f, OutputFormat::Text);
        assert_eq!(OutputFormat::Json.extension(), "json");
    }

    #[test]
    fn test_guidance_mode_parse() {
        assert_eq!("Directive".parse::<GuidanceMode>().unwrap(), GuidanceMode::Directive);
        assert!("loud".parse::<GuidanceMode>().is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let config = WorkflowConfiguration::from_preset(WorkflowType::Test, prefs()).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("selectedPhases").is_some());
        assert!(json["iterationLimits"].get("TEST").is_some());
        assert_eq!(json["workflowType"], "test");
    }
}
