//! The workflow facade.
//!
//! `Orchestrator` owns the session store and threads every call through the
//! components in one direction:
//!
//! ```text
//! complete_phase ─▶ ValidationEngine ─▶ record attempt ─▶ escalation policy
//!                                                     ├─▶ blocked (ValidationFailed)
//!                                                     ├─▶ escalate (EscalationRequired)
//!                                                     └─▶ ArtifactRecorder ─▶ record output ─▶ checkpoint
//! ```
//!
//! One orchestrator serves one connection; calls are handled one at a time.

use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::artifacts::{ArtifactRecord, ArtifactRecorder, FsArtifactWriter, task_dir_name};
use crate::audit::AuditLogger;
use crate::config::Config;
use crate::errors::WorkflowError;
use crate::escalation::{self, EscalationDecision};
use crate::guidance::{self, PhaseGuidance};
use crate::phase::Phase;
use crate::presets::{self, WorkflowType};
use crate::safety::{SafetyDecision, SafetyGate};
use crate::session::{FileRecord, PhaseOutput, SessionStore};
use crate::transition;
use crate::validation::{Submission, ValidationEngine};
use crate::workflow_config::{GuidanceMode, WorkflowConfiguration};

pub mod reports;

pub use reports::{
    AdvanceResponse, CompletionResponse, PhaseState, PhaseStatus, ResolutionResponse,
    SessionStatus, SessionSummary, StartResponse,
};

/// Parameters for starting a session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub task: String,
    #[serde(default)]
    pub workflow_type: Option<WorkflowType>,
    /// Explicit phase sequence; replaces the preset's phases
    #[serde(default)]
    pub phases: Option<Vec<Phase>>,
    /// Per-phase limits applied over preset and file limits
    #[serde(default)]
    pub iteration_limits: Option<BTreeMap<Phase, u32>>,
    #[serde(default)]
    pub guidance_mode: Option<GuidanceMode>,
}

impl StartRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    pub fn workflow(mut self, workflow_type: WorkflowType) -> Self {
        self.workflow_type = Some(workflow_type);
        self
    }

    pub fn phases(mut self, phases: Vec<Phase>) -> Self {
        self.phases = Some(phases);
        self
    }

    pub fn limit(mut self, phase: Phase, limit: u32) -> Self {
        self.iteration_limits
            .get_or_insert_with(BTreeMap::new)
            .insert(phase, limit);
        self
    }

    pub fn guidance_mode(mut self, mode: GuidanceMode) -> Self {
        self.guidance_mode = Some(mode);
        self
    }
}

pub struct Orchestrator {
    config: Config,
    store: SessionStore,
    engine: ValidationEngine,
    gate: SafetyGate,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let classifier = config.settings().toml.safety.classifier();
        Self {
            config,
            store: SessionStore::new(),
            engine: ValidationEngine::new(),
            gate: SafetyGate::new(Box::new(classifier)),
        }
    }

    /// Replace the validation engine (custom content predicates).
    pub fn with_engine(mut self, engine: ValidationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn has_session(&self) -> bool {
        self.store.session().is_some()
    }

    /// Start a session, replacing any active one.
    ///
    /// An explicit workflow type always wins. Without one, an explicit phase
    /// list means `custom`, then the configured default applies, then the type
    /// detected from the task text, then `refactor`.
    pub fn start_session(&mut self, request: StartRequest) -> Result<StartResponse, WorkflowError> {
        let task = request.task.trim();
        if task.is_empty() {
            return Err(WorkflowError::InvalidParams(
                "task must not be empty".to_string(),
            ));
        }

        let settings = self.config.settings();
        let detected = presets::detect_workflow_type(task);
        let workflow_type = request
            .workflow_type
            .or_else(|| request.phases.as_ref().map(|_| WorkflowType::Custom))
            .or(settings.toml.defaults.workflow)
            .or(detected)
            .unwrap_or_default();

        self.config.ensure_output_dir()?;
        let artifact_dir = self
            .config
            .output_dir
            .join(task_dir_name(task, Utc::now()));
        let prefs = self.config.output_preferences(artifact_dir);

        let preset = presets::resolve(workflow_type);
        let workflow_config = match &request.phases {
            Some(phases) => {
                let limits = preset
                    .iteration_limits
                    .into_iter()
                    .filter(|(phase, _)| phases.contains(phase))
                    .collect();
                WorkflowConfiguration::new(workflow_type, phases.clone(), limits, prefs)?
            }
            None if workflow_type == WorkflowType::Custom => {
                return Err(WorkflowError::InvalidWorkflow(
                    "the custom workflow needs an explicit phases list".to_string(),
                ));
            }
            None => WorkflowConfiguration::new(
                workflow_type,
                preset.phases,
                preset.iteration_limits,
                prefs,
            )?,
        };

        let mut workflow_config = workflow_config
            .with_limit_overrides(&settings.toml.limit_overrides())?
            .with_escalation_triggers(settings.toml.escalation_triggers())
            .with_guidance_mode(request.guidance_mode.unwrap_or_else(|| settings.guidance_mode()))
            .with_min_content_length(settings.toml.validation.min_content_length);
        if let Some(limits) = &request.iteration_limits {
            workflow_config = workflow_config.with_limit_overrides(limits)?;
        }

        let session = self.store.start_session(task, workflow_config);
        let config = session.workflow_config();
        Ok(StartResponse {
            session_id: session.id(),
            task: session.task().to_string(),
            workflow_type: config.workflow_type,
            detected_workflow: detected,
            phases: config.selected_phases.clone(),
            iteration_limits: config.iteration_limits.clone(),
            current_phase: session.current_phase(),
            guidance_mode: config.guidance_mode,
            artifact_dir: config.output_preferences.artifact_dir.display().to_string(),
        })
    }

    pub fn status(&self) -> Result<SessionStatus, WorkflowError> {
        Ok(SessionStatus::of(self.store.require()?))
    }

    /// End the session and export its audit trail next to its artifacts.
    ///
    /// Writing the audit file is best-effort; a failure is logged and the
    /// summary is returned without `auditFile`.
    pub fn end_session(&mut self) -> Result<SessionSummary, WorkflowError> {
        let mut session = self
            .store
            .end_session()
            .ok_or(WorkflowError::NoActiveSession)?;

        let audit_dir = session
            .workflow_config()
            .output_preferences
            .artifact_dir
            .clone();
        let audit_file = match AuditLogger::new(&audit_dir).finish(session.audit_mut()) {
            Ok(path) => Some(path.display().to_string()),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Audit trail not written");
                None
            }
        };

        Ok(SessionSummary::of(&session, audit_file))
    }

    pub fn record_file_read(&mut self, path: &str) -> Result<FileRecord, WorkflowError> {
        require_path(path)?;
        self.store.record_file_read(path).cloned()
    }

    pub fn check_action(&mut self, action: &str, path: &str) -> Result<SafetyDecision, WorkflowError> {
        require_path(path)?;
        self.gate.check_action(&mut self.store, action, path)
    }

    pub fn check_modification(&mut self, path: &str) -> Result<SafetyDecision, WorkflowError> {
        require_path(path)?;
        self.gate.check_modification(&mut self.store, path)
    }

    /// Guidance for `phase`, or for the current phase when `None`.
    pub fn guidance(&self, phase: Option<Phase>) -> Result<PhaseGuidance, WorkflowError> {
        let session = self.store.require()?;
        let phase = phase.unwrap_or(session.current_phase());
        Ok(guidance::phase_guidance(session, &self.engine, phase))
    }

    /// Move to `phase`. Never blocked; out-of-order moves come back with warnings.
    pub fn advance_phase(&mut self, phase: Phase) -> Result<AdvanceResponse, WorkflowError> {
        let before = self.store.require()?;
        let previous = before.current_phase();
        let kind = transition::classify(before, phase);
        let warnings = guidance::phase_guidance(before, &self.engine, phase).warnings;

        let session = self.store.advance_phase(phase)?;
        Ok(AdvanceResponse {
            previous_phase: previous,
            current_phase: session.current_phase(),
            transition: kind,
            in_order: kind.is_in_order(),
            next_phase: transition::next_phase(session),
            warnings,
        })
    }

    /// Validate a phase submission and, if it passes, record it.
    pub fn complete_phase(
        &mut self,
        submission: Submission,
    ) -> Result<CompletionResponse, WorkflowError> {
        let phase = submission.phase;
        let session = self.store.require()?;

        if let Some(pending) = session.pending_escalation() {
            return Err(WorkflowError::EscalationRequired(Box::new(pending.clone())));
        }
        if !session.workflow_config().contains(phase) {
            return Err(WorkflowError::PhaseNotInWorkflow { phase });
        }

        let report = self.engine.validate(
            &submission,
            session.workflow_config(),
            session.waived_requirements(phase),
        );
        self.store.record_validation_attempt(phase, &report)?;
        let session = self.store.require()?;
        let attempt = session.iteration_count(phase);

        if !report.is_complete {
            if let Some(context) = escalation::should_escalate(session, phase) {
                self.store.set_pending_escalation(context.clone())?;
                return Err(WorkflowError::EscalationRequired(Box::new(context)));
            }
            info!(phase = %phase, attempt, failures = report.failed.len(), "Phase completion rejected");
            let mut next_steps = report.blocking_messages.clone();
            next_steps.extend(report.next_steps.iter().cloned());
            return Err(WorkflowError::ValidationFailed {
                phase,
                failures: report.failed,
                next_steps,
                remaining_iterations: session.remaining_iterations(phase),
            });
        }

        let prefs = &session.workflow_config().output_preferences;
        let writer = FsArtifactWriter::new(prefs.artifact_dir.clone());
        let date = prefs.date_stamp.then(|| Utc::now().date_naive());
        let outcome = ArtifactRecorder::new(&writer, date).record(phase, &submission.output_artifacts);

        let mut artifacts = outcome.saved.clone();
        for failure in &outcome.failed {
            if let Some(artifact) = submission
                .output_artifacts
                .iter()
                .find(|a| a.path == failure.path)
            {
                artifacts.push(ArtifactRecord::from_artifact(artifact));
            }
        }

        let now = Utc::now();
        let duration_ms = (now - session.started_at()).num_milliseconds();
        self.store.record_phase_output(PhaseOutput {
            phase,
            completed_at: now,
            duration_ms,
            output: submission.output,
            artifacts: artifacts.clone(),
        })?;

        let session = self.store.require()?;
        let checkpoint = escalation::checkpoint(session, phase);
        let next_phase = transition::next_after(session, phase);
        let workflow_complete = session.is_workflow_complete();
        if let Some(context) = &checkpoint {
            self.store.set_pending_escalation(context.clone())?;
        }

        Ok(CompletionResponse {
            recorded: true,
            phase,
            attempt,
            artifacts_saved: outcome.saved.len(),
            artifacts_failed: outcome.failed.len(),
            artifacts,
            failures: outcome.failed,
            passed: report.passed,
            next_phase,
            workflow_complete,
            checkpoint,
        })
    }

    /// Apply a human decision to the pending escalation.
    ///
    /// `abort` ends the session and returns its summary.
    pub fn resolve_escalation(
        &mut self,
        decision: EscalationDecision,
    ) -> Result<ResolutionResponse, WorkflowError> {
        let context = self.store.resolve_pending(&decision)?;
        let phase = context.phase;

        if matches!(decision, EscalationDecision::Abort) {
            let summary = self.end_session()?;
            return Ok(ResolutionResponse {
                phase,
                trigger: context.trigger,
                decision: decision.kind().to_string(),
                session_ended: true,
                current_phase: None,
                remaining_iterations: None,
                waived_requirements: Vec::new(),
                summary: Some(summary),
            });
        }

        let session = self.store.require()?;
        Ok(ResolutionResponse {
            phase,
            trigger: context.trigger,
            decision: decision.kind().to_string(),
            session_ended: false,
            current_phase: Some(session.current_phase()),
            remaining_iterations: session.remaining_iterations(phase),
            waived_requirements: session.waived_requirements(phase).to_vec(),
            summary: None,
        })
    }
}

fn require_path(path: &str) -> Result<(), WorkflowError> {
    if path.trim().is_empty() {
        return Err(WorkflowError::InvalidParams("path must not be empty".to_string()));
    }
    Ok(())
}
