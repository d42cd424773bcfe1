//! Owner of the single active session.
//!
//! All session mutation goes through `SessionStore`. The store never decides
//! policy (validation outcome, escalation): it records what callers tell it.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{FileRecord, PhaseOutput, Session, ValidationState, normalize_path};
use crate::audit::AuditEventKind;
use crate::errors::WorkflowError;
use crate::escalation::{EscalationContext, EscalationDecision, MAX_ADDITIONAL_ITERATIONS};
use crate::phase::Phase;
use crate::validation::ValidationReport;
use crate::workflow_config::WorkflowConfiguration;

#[derive(Debug, Default)]
pub struct SessionStore {
    session: Option<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, replacing any existing one.
    pub fn start_session(&mut self, task: &str, config: WorkflowConfiguration) -> &Session {
        if let Some(old) = &self.session {
            warn!(session = %old.id, "Replacing active session");
        }
        let session = Session::new(task, config);
        info!(
            session = %session.id,
            workflow = %session.workflow_config.workflow_type,
            phase = %session.current_phase,
            "Session started"
        );
        self.session.insert(session)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn require(&self) -> Result<&Session, WorkflowError> {
        self.session.as_ref().ok_or(WorkflowError::NoActiveSession)
    }

    fn require_mut(&mut self) -> Result<&mut Session, WorkflowError> {
        self.session.as_mut().ok_or(WorkflowError::NoActiveSession)
    }

    /// Take the session out of the store, ending it.
    pub fn end_session(&mut self) -> Option<Session> {
        let mut session = self.session.take()?;
        session.audit.finish();
        info!(session = %session.id, completed = session.completed_phases.len(), "Session ended");
        Some(session)
    }

    pub fn record_file_read(&mut self, path: &str) -> Result<&FileRecord, WorkflowError> {
        let session = self.require_mut()?;
        let key = normalize_path(path);
        let now = Utc::now();

        let record = session.file_history.entry(key.clone()).or_default();
        let first = !record.has_been_read;
        record.has_been_read = true;
        record.first_read_at.get_or_insert(now);
        record.last_read_at = Some(now);
        record.read_count += 1;

        if first {
            debug!(path = %key, "File read recorded");
            session.audit.push(AuditEventKind::FileRead { path: key.clone() });
        }
        Ok(&session.file_history[&key])
    }

    pub fn record_file_modified(&mut self, path: &str) -> Result<&FileRecord, WorkflowError> {
        let session = self.require_mut()?;
        let key = normalize_path(path);
        let now = Utc::now();

        let record = session.file_history.entry(key.clone()).or_default();
        record.modified = true;
        record.last_modified_at = Some(now);
        record.modify_count += 1;

        session.audit.push(AuditEventKind::FileModified { path: key.clone() });
        Ok(&session.file_history[&key])
    }

    pub fn record_safety_denial(&mut self, path: &str, action: &str) -> Result<(), WorkflowError> {
        let session = self.require_mut()?;
        session.audit.push(AuditEventKind::SafetyDenied {
            path: normalize_path(path),
            action: action.to_string(),
        });
        Ok(())
    }

    /// Make `phase` the current phase.
    ///
    /// The phase being left is recorded as completed (if it is not already).
    /// Moving to the current phase is a no-op.
    pub fn advance_phase(&mut self, phase: Phase) -> Result<&Session, WorkflowError> {
        let session = self.require_mut()?;
        let from = session.current_phase;
        if from != phase {
            if !session.completed_phases.contains(&from) {
                session.completed_phases.push(from);
            }
            session.current_phase = phase;
            info!(from = %from, to = %phase, "Phase advanced");
            session
                .audit
                .push(AuditEventKind::PhaseAdvanced { from, to: phase });
        }
        Ok(session)
    }

    /// Count one validation attempt and store its outcome.
    pub fn record_validation_attempt(
        &mut self,
        phase: Phase,
        report: &ValidationReport,
    ) -> Result<&ValidationState, WorkflowError> {
        let session = self.require_mut()?;

        let count = session.iteration_counts.entry(phase).or_insert(0);
        *count += 1;
        let attempt = *count;

        let state = session.validation_states.entry(phase).or_default();
        state.attempts += 1;
        state.is_complete = report.is_complete;
        state.passed = report.passed.clone();
        state.failed = report.failed.clone();
        state.unmet_requirements = report.unmet_requirements.clone();
        state.last_validated_at = Some(Utc::now());
        if report.is_complete {
            state.failure_streak = 0;
        } else {
            state.failure_streak += 1;
        }

        debug!(
            phase = %phase,
            attempt,
            passed = report.is_complete,
            failures = report.failed.len(),
            "Validation attempt recorded"
        );
        session.audit.push(AuditEventKind::ValidationAttempt {
            phase,
            attempt,
            passed: report.is_complete,
            failures: report.failed.len(),
        });
        Ok(&session.validation_states[&phase])
    }

    /// Store the accepted output of `phase` and mark it completed.
    pub fn record_phase_output(&mut self, output: PhaseOutput) -> Result<(), WorkflowError> {
        let session = self.require_mut()?;
        let phase = output.phase;
        session.audit.push(AuditEventKind::PhaseCompleted {
            phase,
            artifacts: output.artifacts.len(),
        });
        session.phase_outputs.insert(phase, output);
        if !session.completed_phases.contains(&phase) {
            session.completed_phases.push(phase);
        }
        info!(phase = %phase, "Phase completed");
        Ok(())
    }

    pub fn set_pending_escalation(&mut self, context: EscalationContext) -> Result<(), WorkflowError> {
        let session = self.require_mut()?;
        warn!(
            phase = %context.phase,
            trigger = %context.trigger,
            attempts = context.attempt_count,
            "Escalation raised"
        );
        session.audit.push(AuditEventKind::EscalationRaised {
            phase: context.phase,
            trigger: context.trigger.to_string(),
        });
        session.pending_escalation = Some(context);
        Ok(())
    }

    /// Apply a human decision to the pending escalation.
    ///
    /// `abort` only clears the escalation here; ending the session is the
    /// caller's job. Returns the resolved context.
    pub fn resolve_pending(
        &mut self,
        decision: &EscalationDecision,
    ) -> Result<EscalationContext, WorkflowError> {
        let session = self.require_mut()?;
        let context = session
            .pending_escalation
            .as_ref()
            .ok_or(WorkflowError::NoPendingEscalation)?;
        if !context.offers(decision) {
            return Err(WorkflowError::InvalidDecision {
                decision: decision.kind().to_string(),
            });
        }
        let phase = context.phase;
        let granted = match decision {
            EscalationDecision::Continue {
                additional_iterations,
            } => {
                if *additional_iterations > MAX_ADDITIONAL_ITERATIONS {
                    return Err(WorkflowError::InvalidParams(format!(
                        "additionalIterations must be at most {}",
                        MAX_ADDITIONAL_ITERATIONS
                    )));
                }
                context.granted_iterations(*additional_iterations)
            }
            _ => 0,
        };

        match decision {
            EscalationDecision::Continue { .. } => {
                // The escalating attempt is already counted, so the new cap
                // is measured from the attempts made so far.
                if granted > 0
                    && let Some(limit) = session.workflow_config.iteration_limit(phase)
                {
                    let needed = session
                        .iteration_count(phase)
                        .saturating_sub(limit)
                        .saturating_add(granted);
                    let extension = session.iteration_extensions.entry(phase).or_insert(0);
                    *extension = (*extension).max(needed);
                }
                reset_streak(session, phase);
            }
            EscalationDecision::SkipPhase => {
                if !session.skipped_phases.contains(&phase) {
                    session.skipped_phases.push(phase);
                }
                session.audit.push(AuditEventKind::PhaseSkipped { phase });
                if session.current_phase == phase
                    && let Some(next) = next_open_phase(session, phase)
                {
                    session.current_phase = next;
                }
            }
            EscalationDecision::ModifyRequirements { waive } => {
                let waived = session.waived_requirements.entry(phase).or_default();
                for key in waive {
                    if !waived.contains(key) {
                        waived.push(key.clone());
                    }
                }
                reset_streak(session, phase);
            }
            EscalationDecision::Abort => {}
        }

        info!(phase = %phase, decision = %decision, "Escalation resolved");
        session.audit.push(AuditEventKind::EscalationResolved {
            phase,
            decision: decision.to_string(),
        });
        session
            .pending_escalation
            .take()
            .ok_or(WorkflowError::NoPendingEscalation)
    }
}

fn reset_streak(session: &mut Session, phase: Phase) {
    if let Some(state) = session.validation_states.get_mut(&phase) {
        state.failure_streak = 0;
    }
}

/// First phase after `phase` in the workflow that is neither completed nor skipped.
fn next_open_phase(session: &Session, phase: Phase) -> Option<Phase> {
    let config = &session.workflow_config;
    let start = config.position(phase)? + 1;
    config.selected_phases[start..]
        .iter()
        .copied()
        .find(|p| !session.is_completed(*p) && !session.is_skipped(*p))
}
