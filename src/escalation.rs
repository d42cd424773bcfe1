//! Iteration limits, escalation and the human resume contract.
//!
//! Every validation attempt on a phase increments its iteration counter. When a
//! *failing* attempt pushes a phase past its budget, the policy produces an
//! [`EscalationContext`] instead of a plain failure:
//!
//! - **iteration_limit**: attempts exceed the phase's cap (plus any extension
//!   a human granted). A cap of N allows N failing attempts; attempt N+1
//!   escalates.
//! - **validation_failure**: [`REPEATED_FAILURE_THRESHOLD`] consecutive
//!   failures, for phases with or without a cap.
//! - **user_checkpoint**: a configured checkpoint phase completed and needs
//!   a sign-off.
//!
//! An escalation stops automatic progress. The only way forward is an explicit
//! [`EscalationDecision`] that matches one of the offered options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::phase::Phase;
use crate::session::Session;

/// Consecutive failures on one phase that escalate when errors trigger escalation.
pub const REPEATED_FAILURE_THRESHOLD: u32 = 3;

/// Iterations offered by the default `continue` option.
pub const DEFAULT_ADDITIONAL_ITERATIONS: u32 = 2;

/// Largest extension a single `continue` decision may grant.
pub const MAX_ADDITIONAL_ITERATIONS: u32 = 100;

/// What caused an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    IterationLimit,
    ValidationFailure,
    UserCheckpoint,
}

impl EscalationTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationTrigger::IterationLimit => "iteration_limit",
            EscalationTrigger::ValidationFailure => "validation_failure",
            EscalationTrigger::UserCheckpoint => "user_checkpoint",
        }
    }
}

impl fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A way out of an escalation, as offered to the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionOption {
    /// Grant more iterations and retry the phase
    Continue {
        #[serde(rename = "additionalIterations")]
        additional_iterations: u32,
    },
    /// Leave the phase unfinished and move to the next one
    SkipPhase,
    /// Waive some of the phase's requirements
    ModifyRequirements { requirements: Vec<String> },
    /// Stop the session
    Abort,
}

impl ResolutionOption {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionOption::Continue { .. } => "continue",
            ResolutionOption::SkipPhase => "skip_phase",
            ResolutionOption::ModifyRequirements { .. } => "modify_requirements",
            ResolutionOption::Abort => "abort",
        }
    }

    pub fn description(&self, phase: Phase) -> String {
        match self {
            ResolutionOption::Continue {
                additional_iterations,
            } => format!(
                "Continue {} with {} more iteration(s)",
                phase, additional_iterations
            ),
            ResolutionOption::SkipPhase => format!("Skip {} and move to the next phase", phase),
            ResolutionOption::ModifyRequirements { requirements } if requirements.is_empty() => {
                format!("Relax the requirements of {}", phase)
            }
            ResolutionOption::ModifyRequirements { requirements } => format!(
                "Waive these requirements of {}: {}",
                phase,
                requirements.join(", ")
            ),
            ResolutionOption::Abort => "Abort the workflow".to_string(),
        }
    }
}

/// An offered option plus its human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationOption {
    #[serde(flatten)]
    pub option: ResolutionOption,
    pub description: String,
}

/// Everything a human needs to decide how to resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationContext {
    pub trigger: EscalationTrigger,
    pub phase: Phase,
    pub attempt_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_limit: Option<u32>,
    pub last_error: String,
    pub options: Vec<EscalationOption>,
    pub raised_at: DateTime<Utc>,
}

impl EscalationContext {
    fn new(
        trigger: EscalationTrigger,
        phase: Phase,
        attempt_count: u32,
        iteration_limit: Option<u32>,
        last_error: String,
        options: Vec<ResolutionOption>,
    ) -> Self {
        let options = options
            .into_iter()
            .map(|option| EscalationOption {
                description: option.description(phase),
                option,
            })
            .collect();
        Self {
            trigger,
            phase,
            attempt_count,
            iteration_limit,
            last_error,
            options,
            raised_at: Utc::now(),
        }
    }

    /// Whether `decision` corresponds to one of the offered options.
    pub fn offers(&self, decision: &EscalationDecision) -> bool {
        self.options
            .iter()
            .any(|o| o.option.kind() == decision.kind())
    }

    /// Iterations a `continue` decision actually grants.
    ///
    /// A checkpoint follows a completed phase, so it never grants more than
    /// its offered `continue` option.
    pub fn granted_iterations(&self, requested: u32) -> u32 {
        if self.trigger != EscalationTrigger::UserCheckpoint {
            return requested;
        }
        self.options
            .iter()
            .find_map(|o| match o.option {
                ResolutionOption::Continue {
                    additional_iterations,
                } => Some(requested.min(additional_iterations)),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn option_kinds(&self) -> Vec<&'static str> {
        self.options.iter().map(|o| o.option.kind()).collect()
    }
}

/// The human's answer to an escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationDecision {
    Continue {
        #[serde(
            rename = "additionalIterations",
            alias = "additional_iterations",
            default = "default_additional_iterations"
        )]
        additional_iterations: u32,
    },
    SkipPhase,
    ModifyRequirements {
        #[serde(default)]
        waive: Vec<String>,
    },
    Abort,
}

fn default_additional_iterations() -> u32 {
    DEFAULT_ADDITIONAL_ITERATIONS
}

impl EscalationDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            EscalationDecision::Continue { .. } => "continue",
            EscalationDecision::SkipPhase => "skip_phase",
            EscalationDecision::ModifyRequirements { .. } => "modify_requirements",
            EscalationDecision::Abort => "abort",
        }
    }
}

impl fmt::Display for EscalationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationDecision::Continue {
                additional_iterations,
            } => write!(f, "continue (+{})", additional_iterations),
            EscalationDecision::ModifyRequirements { waive } => {
                write!(f, "modify_requirements ({})", waive.join(", "))
            }
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Decide whether the latest attempt on `phase` must escalate.
///
/// Call after the attempt has been recorded in the session. Passing attempts
/// never escalate; when both triggers apply, the iteration limit wins.
pub fn should_escalate(session: &Session, phase: Phase) -> Option<EscalationContext> {
    let state = session.validation_state(phase)?;
    if state.is_complete {
        return None;
    }

    let triggers = &session.workflow_config().escalation_triggers;
    let attempts = session.iteration_count(phase);
    let limit = session.effective_iteration_limit(phase);

    let trigger = if triggers.escalate_on_iteration_limit && limit.is_some_and(|l| attempts > l) {
        EscalationTrigger::IterationLimit
    } else if triggers.escalate_on_errors && state.failure_streak >= REPEATED_FAILURE_THRESHOLD {
        EscalationTrigger::ValidationFailure
    } else {
        return None;
    };

    let last_error = if state.failed.is_empty() {
        "validation failed".to_string()
    } else {
        state.failed.join("; ")
    };

    Some(EscalationContext::new(
        trigger,
        phase,
        attempts,
        limit,
        last_error,
        vec![
            ResolutionOption::Continue {
                additional_iterations: DEFAULT_ADDITIONAL_ITERATIONS,
            },
            ResolutionOption::SkipPhase,
            ResolutionOption::ModifyRequirements {
                requirements: state.unmet_requirements.clone(),
            },
            ResolutionOption::Abort,
        ],
    ))
}

/// Sign-off escalation for a checkpoint phase that just completed.
pub fn checkpoint(session: &Session, phase: Phase) -> Option<EscalationContext> {
    if !session.workflow_config().is_checkpoint(phase) || !session.is_completed(phase) {
        return None;
    }

    Some(EscalationContext::new(
        EscalationTrigger::UserCheckpoint,
        phase,
        session.iteration_count(phase),
        session.effective_iteration_limit(phase),
        format!("{} completed and requires user review before continuing", phase),
        vec![
            ResolutionOption::Continue {
                additional_iterations: 0,
            },
            ResolutionOption::Abort,
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> EscalationContext {
        EscalationContext::new(
            EscalationTrigger::IterationLimit,
            Phase::Lint,
            3,
            Some(2),
            "lint failed".into(),
            vec![ResolutionOption::SkipPhase, ResolutionOption::Abort],
        )
    }

    #[test]
    fn test_offers_matches_by_kind() {
        let ctx = context();
        assert!(ctx.offers(&EscalationDecision::SkipPhase));
        assert!(ctx.offers(&EscalationDecision::Abort));
        assert!(!ctx.offers(&EscalationDecision::Continue {
            additional_iterations: 1
        }));
        assert_eq!(ctx.option_kinds(), vec!["skip_phase", "abort"]);
    }

    #[test]
    fn test_context_serializes_camel_case() {
        let json = serde_json::to_value(context()).unwrap();
        assert_eq!(json["trigger"], "iteration_limit");
        assert_eq!(json["attemptCount"], 3);
        assert_eq!(json["iterationLimit"], 2);
        assert_eq!(json["options"][0]["kind"], "skip_phase");
        assert!(json["options"][0]["description"].as_str().unwrap().contains("LINT"));
    }

    #[test]
    fn test_decision_deserializes_with_default_iterations() {
        let d: EscalationDecision = serde_json::from_str(r#"{"kind": "continue"}"#).unwrap();
        assert_eq!(
            d,
            EscalationDecision::Continue {
                additional_iterations: DEFAULT_ADDITIONAL_ITERATIONS
            }
        );
        let d: EscalationDecision =
            serde_json::from_str(r#"{"kind": "continue", "additionalIterations": 4}"#).unwrap();
        assert_eq!(d, EscalationDecision::Continue { additional_iterations: 4 });
        let d: EscalationDecision =
            serde_json::from_str(r#"{"kind": "continue", "additional_iterations": 1}"#).unwrap();
        assert_eq!(d, EscalationDecision::Continue { additional_iterations: 1 });
        let d: EscalationDecision =
            serde_json::from_str(r#"{"kind": "modify_requirements", "waive": ["lintPassed"]}"#)
                .unwrap();
        assert_eq!(d.kind(), "modify_requirements");
        assert_eq!(d.to_string(), "modify_requirements (lintPassed)");
    }

    #[test]
    fn test_option_descriptions() {
        let opt = ResolutionOption::Continue {
            additional_iterations: 4,
        };
        assert!(opt.description(Phase::Test).contains("4 more"));
        let opt = ResolutionOption::ModifyRequirements {
            requirements: vec!["testsPassing".into()],
        };
        assert!(opt.description(Phase::Test).contains("testsPassing"));
    }

    mod policy {
        use super::*;
        use crate::presets::WorkflowType;
        use crate::session::SessionStore;
        use crate::validation::ValidationReport;
        use crate::workflow_config::{EscalationTriggers, OutputPreferences, WorkflowConfiguration};
        use std::collections::BTreeMap;

        fn store(on_limit: bool, on_errors: bool) -> SessionStore {
            let mut limits = BTreeMap::new();
            limits.insert(Phase::Test, 5);
            let config = WorkflowConfiguration::new(
                WorkflowType::Custom,
                vec![Phase::WriteOrRefactor, Phase::Test, Phase::Lint],
                limits,
                OutputPreferences::new("/tmp/x"),
            )
            .unwrap()
            .with_escalation_triggers(EscalationTriggers {
                escalate_on_iteration_limit: on_limit,
                escalate_on_errors: on_errors,
                checkpoint_phases: Vec::new(),
            });
            let mut store = SessionStore::new();
            store.start_session("t", config);
            store
        }

        fn fail(store: &mut SessionStore, phase: Phase) -> Option<EscalationContext> {
            let report = ValidationReport {
                failed: vec!["still failing".into()],
                ..Default::default()
            };
            store.record_validation_attempt(phase, &report).unwrap();
            should_escalate(store.require().unwrap(), phase)
        }

        fn pass(store: &mut SessionStore, phase: Phase) -> Option<EscalationContext> {
            let report = ValidationReport {
                is_complete: true,
                ..Default::default()
            };
            store.record_validation_attempt(phase, &report).unwrap();
            should_escalate(store.require().unwrap(), phase)
        }

        #[test]
        fn test_uncapped_phase_escalates_on_third_failure() {
            let mut store = store(true, true);
            assert!(fail(&mut store, Phase::Lint).is_none());
            assert!(fail(&mut store, Phase::Lint).is_none());
            let ctx = fail(&mut store, Phase::Lint).unwrap();
            assert_eq!(ctx.trigger, EscalationTrigger::ValidationFailure);
            assert_eq!(ctx.iteration_limit, None);
            assert_eq!(ctx.last_error, "still failing");
        }

        #[test]
        fn test_limit_trigger_off_falls_back_to_streak() {
            let mut store = store(false, true);
            for _ in 0..2 {
                assert!(fail(&mut store, Phase::Test).is_none());
            }
            let ctx = fail(&mut store, Phase::Test).unwrap();
            assert_eq!(ctx.trigger, EscalationTrigger::ValidationFailure);
            assert_eq!(ctx.iteration_limit, Some(5));
        }

        #[test]
        fn test_both_triggers_off_never_escalate() {
            let mut store = store(false, false);
            for _ in 0..10 {
                assert!(fail(&mut store, Phase::Test).is_none());
                assert!(fail(&mut store, Phase::Lint).is_none());
            }
        }

        #[test]
        fn test_pass_resets_streak() {
            let mut store = store(true, true);
            assert!(fail(&mut store, Phase::Lint).is_none());
            assert!(fail(&mut store, Phase::Lint).is_none());
            assert!(pass(&mut store, Phase::Lint).is_none());
            assert!(fail(&mut store, Phase::Lint).is_none());
            assert!(fail(&mut store, Phase::Lint).is_none());
            let ctx = fail(&mut store, Phase::Lint).unwrap();
            assert_eq!(ctx.trigger, EscalationTrigger::ValidationFailure);
            assert_eq!(ctx.attempt_count, 6);
        }

        #[test]
        fn test_continue_option_uses_camel_case() {
            let value = serde_json::to_value(ResolutionOption::Continue {
                additional_iterations: 3,
            })
            .unwrap();
            assert_eq!(value["kind"], "continue");
            assert_eq!(value["additionalIterations"], 3);
            assert!(value.get("additional_iterations").is_none());
        }

        #[test]
        fn test_checkpoint_clamps_continue() {
            let ctx = EscalationContext::new(
                EscalationTrigger::UserCheckpoint,
                Phase::Test,
                1,
                Some(5),
                "review".into(),
                vec![
                    ResolutionOption::Continue {
                        additional_iterations: 0,
                    },
                    ResolutionOption::Abort,
                ],
            );
            assert!(ctx.offers(&EscalationDecision::Continue {
                additional_iterations: 50
            }));
            assert_eq!(ctx.granted_iterations(50), 0);
            assert_eq!(context().granted_iterations(3), 3);
        }
    }
}
