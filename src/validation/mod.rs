//! Phase completion validation.
//!
//! Given a phase and what the agent submitted (claimed metrics, artifacts and
//! created files), the engine decides pass/fail against that phase's
//! [`ValidationCriteria`] and explains every failure. It is pure: it never
//! reads or writes the session, the caller threads the report onward.
//!
//! ```text
//! Submission ─▶ criteria_for(phase) ─▶ requirements ─▶ expected files ─▶ artifacts ─▶ ValidationReport
//! ```

use serde::{Deserialize, Serialize};

use crate::artifacts::OutputArtifact;
use crate::phase::Phase;

pub mod criteria;
pub mod engine;
pub mod predicates;

pub use criteria::{MinimumRequirement, Requirement, ValidationCriteria, criteria_for};
pub use engine::ValidationEngine;
pub use predicates::{AcceptAll, ContentPredicate, KeywordPredicate, default_predicate};

/// A phase-completion submission as sent by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub phase: Phase,
    /// Claimed metrics, matched against the phase's minimum requirements
    #[serde(default = "empty_object")]
    pub output: serde_json::Value,
    #[serde(default)]
    pub output_artifacts: Vec<OutputArtifact>,
    #[serde(default)]
    pub created_files: Vec<String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Submission {
    pub fn new(phase: Phase, output: serde_json::Value) -> Self {
        Self {
            phase,
            output,
            output_artifacts: Vec::new(),
            created_files: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: OutputArtifact) -> Self {
        self.output_artifacts.push(artifact);
        self
    }

    pub fn with_created_file(mut self, file: impl Into<String>) -> Self {
        self.created_files.push(file.into());
        self
    }
}

/// Outcome of validating one submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_complete: bool,
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    /// Phase-level explanations shown when the phase is incomplete
    pub blocking_messages: Vec<String>,
    pub next_steps: Vec<String>,
    /// Keys of minimum requirements / expected files that were not met
    pub unmet_requirements: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn pass(&mut self, message: String) {
        self.passed.push(message);
    }

    pub(crate) fn fail(&mut self, message: String, next_step: Option<String>) {
        self.failed.push(message);
        if let Some(step) = next_step {
            self.next_steps.push(step);
        }
    }

    /// Deduplicate every list, keeping first occurrences in order.
    pub(crate) fn finish(mut self) -> Self {
        dedup_in_order(&mut self.passed);
        dedup_in_order(&mut self.failed);
        dedup_in_order(&mut self.blocking_messages);
        dedup_in_order(&mut self.next_steps);
        dedup_in_order(&mut self.unmet_requirements);
        self.is_complete = self.failed.is_empty();
        if self.is_complete {
            self.blocking_messages.clear();
        }
        self
    }
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
