//! Response payloads returned by the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::artifacts::{ArtifactFailure, ArtifactRecord};
use crate::escalation::{EscalationContext, EscalationTrigger};
use crate::phase::Phase;
use crate::presets::WorkflowType;
use crate::session::Session;
use crate::transition::{self, TransitionKind};
use crate::workflow_config::GuidanceMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: Uuid,
    pub task: String,
    pub workflow_type: WorkflowType,
    /// Workflow suggested by the task text, for information only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_workflow: Option<WorkflowType>,
    pub phases: Vec<Phase>,
    pub iteration_limits: BTreeMap<Phase, u32>,
    pub current_phase: Phase,
    pub guidance_mode: GuidanceMode,
    pub artifact_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Completed,
    Skipped,
    Current,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStatus {
    pub phase: Phase,
    pub state: PhaseState,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_iterations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub task: String,
    pub workflow_type: WorkflowType,
    pub guidance_mode: GuidanceMode,
    pub current_phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_phase: Option<Phase>,
    pub completed_phases: Vec<Phase>,
    pub skipped_phases: Vec<Phase>,
    pub remaining_phases: Vec<Phase>,
    pub phases: Vec<PhaseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_escalation: Option<EscalationContext>,
    pub files_read: usize,
    pub files_modified: usize,
    pub elapsed_seconds: i64,
    pub artifact_dir: String,
    pub workflow_complete: bool,
}

impl SessionStatus {
    pub fn of(session: &Session) -> Self {
        let config = session.workflow_config();
        let phases = config
            .selected_phases
            .iter()
            .map(|phase| {
                let phase = *phase;
                let state = if session.is_completed(phase) {
                    PhaseState::Completed
                } else if session.is_skipped(phase) {
                    PhaseState::Skipped
                } else if session.current_phase() == phase {
                    PhaseState::Current
                } else {
                    PhaseState::Pending
                };
                PhaseStatus {
                    phase,
                    state,
                    attempts: session.iteration_count(phase),
                    iteration_limit: session.effective_iteration_limit(phase),
                    remaining_iterations: session.remaining_iterations(phase),
                }
            })
            .collect();

        let history = session.file_history();
        Self {
            session_id: session.id(),
            task: session.task().to_string(),
            workflow_type: config.workflow_type,
            guidance_mode: config.guidance_mode,
            current_phase: session.current_phase(),
            next_phase: transition::next_phase(session),
            completed_phases: session.completed_phases().to_vec(),
            skipped_phases: session.skipped_phases().to_vec(),
            remaining_phases: session.remaining_phases(),
            phases,
            pending_escalation: session.pending_escalation().cloned(),
            files_read: history.values().filter(|r| r.has_been_read).count(),
            files_modified: history.values().filter(|r| r.modified).count(),
            elapsed_seconds: session.elapsed().num_seconds(),
            artifact_dir: config.output_preferences.artifact_dir.display().to_string(),
            workflow_complete: session.is_workflow_complete(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub previous_phase: Phase,
    pub current_phase: Phase,
    pub transition: TransitionKind,
    pub in_order: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_phase: Option<Phase>,
    pub warnings: Vec<String>,
}

/// Result of an accepted phase completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub recorded: bool,
    pub phase: Phase,
    pub attempt: u32,
    pub artifacts_saved: usize,
    pub artifacts_failed: usize,
    pub artifacts: Vec<ArtifactRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ArtifactFailure>,
    pub passed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_phase: Option<Phase>,
    pub workflow_complete: bool,
    /// Sign-off required before further completions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<EscalationContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub task: String,
    pub workflow_type: WorkflowType,
    pub completed_phases: Vec<Phase>,
    pub skipped_phases: Vec<Phase>,
    pub remaining_phases: Vec<Phase>,
    pub total_attempts: u32,
    pub artifacts_recorded: usize,
    pub files_modified: usize,
    pub duration_seconds: i64,
    pub workflow_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_file: Option<String>,
}

impl SessionSummary {
    pub fn of(session: &Session, audit_file: Option<String>) -> Self {
        Self {
            session_id: session.id(),
            task: session.task().to_string(),
            workflow_type: session.workflow_config().workflow_type,
            completed_phases: session.completed_phases().to_vec(),
            skipped_phases: session.skipped_phases().to_vec(),
            remaining_phases: session.remaining_phases(),
            total_attempts: session.iteration_counts().values().sum(),
            artifacts_recorded: session
                .phase_outputs()
                .values()
                .map(|o| o.artifacts.len())
                .sum(),
            files_modified: session.file_history().values().filter(|r| r.modified).count(),
            duration_seconds: session.elapsed().num_seconds(),
            workflow_complete: session.is_workflow_complete(),
            audit_file,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResponse {
    pub phase: Phase,
    pub trigger: EscalationTrigger,
    pub decision: String,
    pub session_ended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waived_requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
}
