//! Advisory per-phase guidance.
//!
//! Guidance never blocks. The two modes differ only in how requirements and
//! out-of-order requests are phrased.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::session::Session;
use crate::transition::{self, TransitionKind};
use crate::validation::ValidationEngine;
use crate::workflow_config::GuidanceMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseGuidance {
    pub phase: Phase,
    pub title: String,
    pub mode: GuidanceMode,
    pub current_phase: Phase,
    pub transition: TransitionKind,
    pub in_order: bool,
    /// Completion criteria, phrased according to the mode
    pub requirements: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waived_requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_phase: Option<Phase>,
    pub completed: bool,
}

/// Guidance for `phase` in the current session.
pub fn phase_guidance(session: &Session, engine: &ValidationEngine, phase: Phase) -> PhaseGuidance {
    let config = session.workflow_config();
    let mode = config.guidance_mode;
    let kind = transition::classify(session, phase);
    let waived = session.waived_requirements(phase);

    let prefix = match mode {
        GuidanceMode::Suggestive => "Recommended",
        GuidanceMode::Directive => "Required",
    };
    let requirements = engine
        .criteria(phase, config, waived)
        .describe()
        .into_iter()
        .map(|line| format!("{}: {}", prefix, line))
        .collect();

    let mut warnings = Vec::new();
    match kind {
        TransitionKind::OutsideWorkflow => warnings.push(format!(
            "{} is not part of the {} workflow",
            phase, config.workflow_type
        )),
        TransitionKind::SkipAhead => {
            let skipped = transition::skipped_by(session, phase);
            if !skipped.is_empty() {
                let names: Vec<&str> = skipped.iter().map(|p| p.as_str()).collect();
                warnings.push(match mode {
                    GuidanceMode::Suggestive => {
                        format!("Consider finishing {} first", names.join(", "))
                    }
                    GuidanceMode::Directive => format!(
                        "Out of order: {} must be completed before {}",
                        names.join(", "),
                        phase
                    ),
                });
            }
        }
        TransitionKind::Revisit if session.is_completed(phase) => warnings.push(format!(
            "{} was already completed; resubmitting replaces its output",
            phase
        )),
        _ => {}
    }

    if let Some(ctx) = session.pending_escalation() {
        warnings.push(format!(
            "Escalation pending on {} ({}); completion is blocked until it is resolved",
            ctx.phase, ctx.trigger
        ));
    }

    PhaseGuidance {
        phase,
        title: phase.title().to_string(),
        mode,
        current_phase: session.current_phase(),
        transition: kind,
        in_order: kind.is_in_order(),
        requirements,
        warnings,
        iteration_limit: session.effective_iteration_limit(phase),
        remaining_iterations: session.remaining_iterations(phase),
        waived_requirements: waived.to_vec(),
        next_phase: transition::next_after(session, phase),
        completed: session.is_completed(phase),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::WorkflowType;
    use crate::session::SessionStore;
    use crate::workflow_config::{OutputPreferences, WorkflowConfiguration};

    fn store(mode: GuidanceMode) -> SessionStore {
        let config =
            WorkflowConfiguration::from_preset(WorkflowType::Feature, OutputPreferences::new("/tmp/x"))
                .unwrap()
                .with_guidance_mode(mode);
        let mut store = SessionStore::new();
        store.start_session("add export", config);
        store
    }

    #[test]
    fn test_current_phase_guidance() {
        let store = store(GuidanceMode::Suggestive);
        let engine = ValidationEngine::new();
        let g = phase_guidance(store.require().unwrap(), &engine, Phase::Planning);
        assert!(g.in_order);
        assert_eq!(g.next_phase, Some(Phase::QuestionDetermine));
        assert!(g.requirements.iter().all(|r| r.starts_with("Recommended")));
        assert!(g.warnings.is_empty());
    }

    #[test]
    fn test_directive_flags_out_of_order() {
        let store = store(GuidanceMode::Directive);
        let engine = ValidationEngine::new();
        let g = phase_guidance(store.require().unwrap(), &engine, Phase::Test);
        assert!(!g.in_order);
        assert_eq!(g.transition, TransitionKind::SkipAhead);
        assert!(g.requirements.iter().all(|r| r.starts_with("Required")));
        assert!(g.warnings[0].starts_with("Out of order"));
        assert_eq!(g.iteration_limit, Some(5));
    }

    #[test]
    fn test_outside_workflow_is_still_answered() {
        let store = store(GuidanceMode::Suggestive);
        let engine = ValidationEngine::new();
        let g = phase_guidance(store.require().unwrap(), &engine, Phase::AuditInventory);
        assert_eq!(g.transition, TransitionKind::OutsideWorkflow);
        assert!(g.next_phase.is_none());
        assert!(!g.requirements.is_empty());
    }
}
