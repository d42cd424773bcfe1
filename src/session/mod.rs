//! The session aggregate.
//!
//! A `Session` is the only mutable record of an in-progress task. Its fields
//! are private to this module: reads go through accessors, and every mutation
//! goes through [`SessionStore`] so invariants are enforced in one place:
//! - `completed_phases` is append-only and duplicate-free
//! - `iteration_counts` only grow, by exactly one per validation attempt
//! - a file's history is keyed by its normalized path

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::artifacts::ArtifactRecord;
use crate::audit::AuditTrail;
use crate::escalation::EscalationContext;
use crate::phase::Phase;
use crate::workflow_config::WorkflowConfiguration;

pub mod store;

pub use store::SessionStore;

/// Read/write history of one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub has_been_read: bool,
    pub modified: bool,
    pub first_read_at: Option<DateTime<Utc>>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub read_count: u32,
    pub modify_count: u32,
}

/// Validation bookkeeping for one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationState {
    pub is_complete: bool,
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    pub unmet_requirements: Vec<String>,
    /// Total validation attempts on this phase
    pub attempts: u32,
    /// Consecutive failures since the last pass or escalation resolution
    pub failure_streak: u32,
    pub last_validated_at: Option<DateTime<Utc>>,
}

/// The last accepted output of a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseOutput {
    pub phase: Phase,
    pub completed_at: DateTime<Utc>,
    /// Milliseconds since session start
    pub duration_ms: i64,
    pub output: serde_json::Value,
    pub artifacts: Vec<ArtifactRecord>,
}

/// Single in-progress task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: Uuid,
    task: String,
    started_at: DateTime<Utc>,
    current_phase: Phase,
    completed_phases: Vec<Phase>,
    skipped_phases: Vec<Phase>,
    phase_outputs: BTreeMap<Phase, PhaseOutput>,
    file_history: BTreeMap<String, FileRecord>,
    iteration_counts: BTreeMap<Phase, u32>,
    validation_states: BTreeMap<Phase, ValidationState>,
    /// Extra iterations granted by human decisions, per phase
    iteration_extensions: BTreeMap<Phase, u32>,
    /// Requirement keys waived by human decisions, per phase
    waived_requirements: BTreeMap<Phase, Vec<String>>,
    pending_escalation: Option<EscalationContext>,
    workflow_config: WorkflowConfiguration,
    #[serde(skip_serializing)]
    audit: AuditTrail,
}

impl Session {
    fn new(task: &str, workflow_config: WorkflowConfiguration) -> Self {
        let id = Uuid::new_v4();
        let audit = AuditTrail::new(id, task, workflow_config.workflow_type);
        Self {
            id,
            task: task.to_string(),
            started_at: audit.started_at,
            current_phase: workflow_config.first_phase(),
            completed_phases: Vec::new(),
            skipped_phases: Vec::new(),
            phase_outputs: BTreeMap::new(),
            file_history: BTreeMap::new(),
            iteration_counts: BTreeMap::new(),
            validation_states: BTreeMap::new(),
            iteration_extensions: BTreeMap::new(),
            waived_requirements: BTreeMap::new(),
            pending_escalation: None,
            workflow_config,
            audit,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.started_at
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn completed_phases(&self) -> &[Phase] {
        &self.completed_phases
    }

    pub fn skipped_phases(&self) -> &[Phase] {
        &self.skipped_phases
    }

    pub fn is_completed(&self, phase: Phase) -> bool {
        self.completed_phases.contains(&phase)
    }

    pub fn is_skipped(&self, phase: Phase) -> bool {
        self.skipped_phases.contains(&phase)
    }

    pub fn phase_output(&self, phase: Phase) -> Option<&PhaseOutput> {
        self.phase_outputs.get(&phase)
    }

    pub fn phase_outputs(&self) -> &BTreeMap<Phase, PhaseOutput> {
        &self.phase_outputs
    }

    pub fn file_record(&self, path: &str) -> Option<&FileRecord> {
        self.file_history.get(&normalize_path(path))
    }

    pub fn file_history(&self) -> &BTreeMap<String, FileRecord> {
        &self.file_history
    }

    pub fn has_read(&self, path: &str) -> bool {
        self.file_record(path).is_some_and(|r| r.has_been_read)
    }

    pub fn iteration_count(&self, phase: Phase) -> u32 {
        self.iteration_counts.get(&phase).copied().unwrap_or(0)
    }

    pub fn iteration_counts(&self) -> &BTreeMap<Phase, u32> {
        &self.iteration_counts
    }

    pub fn validation_state(&self, phase: Phase) -> Option<&ValidationState> {
        self.validation_states.get(&phase)
    }

    pub fn validation_states(&self) -> &BTreeMap<Phase, ValidationState> {
        &self.validation_states
    }

    pub fn iteration_extension(&self, phase: Phase) -> u32 {
        self.iteration_extensions.get(&phase).copied().unwrap_or(0)
    }

    /// Configured limit plus any extension granted by a human, if the phase is capped.
    pub fn effective_iteration_limit(&self, phase: Phase) -> Option<u32> {
        self.workflow_config
            .iteration_limit(phase)
            .map(|limit| limit.saturating_add(self.iteration_extension(phase)))
    }

    /// Iterations left before the next failing attempt escalates.
    pub fn remaining_iterations(&self, phase: Phase) -> Option<u32> {
        self.effective_iteration_limit(phase)
            .map(|limit| limit.saturating_sub(self.iteration_count(phase)))
    }

    pub fn waived_requirements(&self, phase: Phase) -> &[String] {
        self.waived_requirements
            .get(&phase)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pending_escalation(&self) -> Option<&EscalationContext> {
        self.pending_escalation.as_ref()
    }

    pub fn workflow_config(&self) -> &WorkflowConfiguration {
        &self.workflow_config
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub(crate) fn audit_mut(&mut self) -> &mut AuditTrail {
        &mut self.audit
    }

    /// Phases of the workflow that are neither completed nor skipped.
    pub fn remaining_phases(&self) -> Vec<Phase> {
        self.workflow_config
            .selected_phases
            .iter()
            .copied()
            .filter(|p| !self.is_completed(*p) && !self.is_skipped(*p))
            .collect()
    }

    /// True once every selected phase is completed or skipped.
    pub fn is_workflow_complete(&self) -> bool {
        self.remaining_phases().is_empty()
    }
}

/// Lexically normalize a file path used as a history key.
///
/// Backslashes become slashes, `.` segments and repeated separators are
/// dropped. `..` is kept as-is since resolving it would need the file system.
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let absolute = unified.starts_with('/');
    let parts: Vec<&str> = unified
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src//lib.rs"), "src/lib.rs");
        assert_eq!(normalize_path("src\\main.rs"), "src/main.rs");
        assert_eq!(normalize_path("/abs/./x.rs"), "/abs/x.rs");
        assert_eq!(normalize_path(" a.txt "), "a.txt");
        assert_eq!(normalize_path("../up.rs"), "../up.rs");
    }
}
