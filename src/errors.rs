//! Typed error hierarchy for phaseguard.
//!
//! `WorkflowError` covers every failure the core can report:
//! - safety violations (modification before read)
//! - validation failures (submitted evidence does not meet phase criteria)
//! - escalations (retry budget exhausted, human decision required)
//! - configuration errors (unusable output directory, malformed artifacts)
//!
//! Errors never cross the tool boundary as panics or `Err`s: `ToolError` is the
//! structured `{error, message, resolution?}` object every failure path
//! normalizes to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::escalation::EscalationContext;
use crate::phase::Phase;

/// Errors from the workflow core.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Safety violation on {path}: {reason}")]
    SafetyViolation { path: String, reason: String },

    #[error("Validation failed for phase {phase} ({} issue(s))", failures.len())]
    ValidationFailed {
        phase: Phase,
        failures: Vec<String>,
        next_steps: Vec<String>,
        /// Failing attempts left before escalation, if the phase is capped
        remaining_iterations: Option<u32>,
    },

    #[error("Escalation required for phase {} ({})", .0.phase, .0.trigger)]
    EscalationRequired(Box<EscalationContext>),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Artifact {path} is not valid JSON: {message}")]
    InvalidJson { path: String, message: String },

    #[error("Invalid workflow configuration: {0}")]
    InvalidWorkflow(String),

    #[error("Unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("Phase {phase} is not part of this workflow")]
    PhaseNotInWorkflow { phase: Phase },

    #[error("No escalation is pending")]
    NoPendingEscalation,

    #[error("Decision '{decision}' is not one of the offered resolution options")]
    InvalidDecision { decision: String },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    /// Stable machine-readable code used as the `error` field at the boundary.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NoActiveSession => "no_active_session",
            WorkflowError::SafetyViolation { .. } => "safety_violation",
            WorkflowError::ValidationFailed { .. } => "validation_failed",
            WorkflowError::EscalationRequired(_) => "escalation_required",
            WorkflowError::Configuration(_) => "configuration_error",
            WorkflowError::InvalidJson { .. } => "configuration_error",
            WorkflowError::InvalidWorkflow(_) => "invalid_workflow",
            WorkflowError::UnknownPhase(_) => "unknown_phase",
            WorkflowError::PhaseNotInWorkflow { .. } => "phase_not_in_workflow",
            WorkflowError::NoPendingEscalation => "no_pending_escalation",
            WorkflowError::InvalidDecision { .. } => "invalid_decision",
            WorkflowError::InvalidParams(_) => "invalid_params",
            WorkflowError::UnknownTool(_) => "unknown_tool",
            WorkflowError::Other(_) => "internal_error",
        }
    }

    /// Actionable hint for the caller, when one exists.
    pub fn resolution(&self) -> Option<String> {
        match self {
            WorkflowError::NoActiveSession => {
                Some("Call start_session with a task description first".to_string())
            }
            WorkflowError::SafetyViolation { path, .. } => Some(format!(
                "Read {} before modifying it (record_file_read)",
                path
            )),
            WorkflowError::ValidationFailed { .. } => {
                Some("Address the listed failures and resubmit the phase".to_string())
            }
            WorkflowError::EscalationRequired(_) => Some(
                "Present the escalation options to the user and call resolve_escalation"
                    .to_string(),
            ),
            WorkflowError::Configuration(_) => {
                Some("Check the output directory setting and its permissions".to_string())
            }
            WorkflowError::InvalidJson { .. } => {
                Some("Submit syntactically valid JSON or change the artifact format".to_string())
            }
            WorkflowError::UnknownPhase(_) => Some(format!(
                "Valid phases: {}",
                Phase::all()
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            WorkflowError::PhaseNotInWorkflow { .. } => {
                Some("Use get_status to see the phases selected for this session".to_string())
            }
            WorkflowError::NoPendingEscalation | WorkflowError::InvalidDecision { .. } => {
                Some("Use get_status to see the pending escalation and its options".to_string())
            }
            WorkflowError::UnknownTool(_) => Some("Use one of the documented tool names".to_string()),
            WorkflowError::InvalidWorkflow(_)
            | WorkflowError::InvalidParams(_)
            | WorkflowError::Other(_) => None,
        }
    }
}

/// Structured error returned across the tool boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Extra machine-readable payload (validation errors, escalation context).
    #[serde(flatten)]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ToolError {
    /// Attach a JSON object whose fields are merged into the error object.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = details {
            self.details = Some(map);
        }
        self
    }
}

impl From<WorkflowError> for ToolError {
    fn from(err: WorkflowError) -> Self {
        let details = match &err {
            WorkflowError::EscalationRequired(ctx) => serde_json::to_value(ctx.as_ref())
                .ok()
                .map(|v| serde_json::json!({ "escalation": v })),
            WorkflowError::ValidationFailed {
                phase,
                failures,
                next_steps,
                remaining_iterations,
            } => Some(serde_json::json!({
                "phase": phase,
                "validationErrors": failures,
                "nextSteps": next_steps,
                "remainingIterations": remaining_iterations,
            })),
            _ => None,
        };
        let tool_error = ToolError {
            error: err.code().to_string(),
            message: err.to_string(),
            resolution: err.resolution(),
            details: None,
        };
        match details {
            Some(d) => tool_error.with_details(d),
            None => tool_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_violation_carries_path() {
        let err = WorkflowError::SafetyViolation {
            path: "a.txt".into(),
            reason: "read before write".into(),
        };
        assert_eq!(err.code(), "safety_violation");
        assert!(err.to_string().contains("a.txt"));
        assert!(err.resolution().unwrap().contains("a.txt"));
    }

    #[test]
    fn validation_failed_reports_count() {
        let err = WorkflowError::ValidationFailed {
            phase: Phase::Test,
            failures: vec!["one".into(), "two".into()],
            next_steps: vec![],
            remaining_iterations: None,
        };
        assert!(err.to_string().contains("2 issue(s)"));
    }

    #[test]
    fn tool_error_from_validation_failure_includes_list() {
        let err = WorkflowError::ValidationFailed {
            phase: Phase::Lint,
            failures: vec!["lint not clean".into()],
            next_steps: vec!["Report lintClean".into()],
            remaining_iterations: Some(1),
        };
        let tool: ToolError = err.into();
        assert_eq!(tool.error, "validation_failed");
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["validationErrors"][0], "lint not clean");
        assert_eq!(json["nextSteps"][0], "Report lintClean");
        assert_eq!(json["remainingIterations"], 1);
        assert_eq!(json["phase"], "LINT");
        assert!(json["resolution"].is_string());
    }

    #[test]
    fn tool_error_skips_empty_optional_fields() {
        let tool: ToolError = WorkflowError::InvalidParams("missing task".into()).into();
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["error"], "invalid_params");
        assert!(json.get("resolution").is_none());
    }

    #[test]
    fn invalid_json_is_a_configuration_error() {
        let err = WorkflowError::InvalidJson {
            path: "report.json".into(),
            message: "expected value".into(),
        };
        assert_eq!(err.code(), "configuration_error");
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&WorkflowError::NoActiveSession);
        assert_std_error(&WorkflowError::Configuration("x".into()));
    }
}
