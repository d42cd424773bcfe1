//! Per-phase completion criteria.
//!
//! Criteria are derived, never stored: a pure function of the phase and the
//! output preferences.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::phase::Phase;
use crate::workflow_config::OutputPreferences;

/// Expected value of a claimed metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    /// Claimed number (or array length) must be at least this
    AtLeast(u64),
    /// Claimed value's truthiness must equal this
    Flag(bool),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::AtLeast(n) => write!(f, ">= {}", n),
            Requirement::Flag(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimumRequirement {
    pub key: String,
    pub expected: Requirement,
    pub description: String,
}

impl MinimumRequirement {
    fn new(key: &str, expected: Requirement, description: &str) -> Self {
        Self {
            key: key.to_string(),
            expected,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCriteria {
    pub phase: Phase,
    pub minimum_requirements: Vec<MinimumRequirement>,
    pub min_artifacts: usize,
    /// Output-file identifiers that must appear among the created files
    pub expected_files: Vec<String>,
    pub blocking_messages: Vec<String>,
}

impl ValidationCriteria {
    /// Drop requirements and expected files a human waived.
    pub fn without(mut self, waived: &[String]) -> Self {
        self.minimum_requirements
            .retain(|r| !waived.iter().any(|w| w == &r.key));
        self.expected_files
            .retain(|f| !waived.iter().any(|w| w == f));
        self
    }

    /// One line per requirement, for guidance output.
    pub fn describe(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .minimum_requirements
            .iter()
            .map(|r| format!("{} {} - {}", r.key, r.expected, r.description))
            .collect();
        if self.min_artifacts > 0 {
            lines.push(format!("at least {} output artifact(s)", self.min_artifacts));
        }
        for file in &self.expected_files {
            lines.push(format!("output file '{}' created", file));
        }
        lines
    }
}

/// Criteria for `phase` under the given output preferences.
pub fn criteria_for(phase: Phase, output: &OutputPreferences) -> ValidationCriteria {
    use Requirement::{AtLeast, Flag};

    let (requirements, blocking, min_artifacts) = match phase {
        Phase::Planning => (
            vec![
                MinimumRequirement::new("planCreated", Flag(true), "a written plan exists"),
                MinimumRequirement::new(
                    "stepsIdentified",
                    AtLeast(1),
                    "number of concrete steps in the plan",
                ),
            ],
            "Planning is incomplete until a concrete plan with steps is written",
            1,
        ),
        Phase::AuditInventory => (
            vec![MinimumRequirement::new(
                "filesAnalyzed",
                AtLeast(1),
                "number of in-scope files read and inventoried",
            )],
            "Every file in scope must be read and inventoried before changes are planned",
            1,
        ),
        Phase::CompareAnalyze => (
            vec![
                MinimumRequirement::new(
                    "approachesCompared",
                    AtLeast(2),
                    "number of candidate approaches compared",
                ),
                MinimumRequirement::new(
                    "recommendationMade",
                    Flag(true),
                    "one approach has been recommended",
                ),
            ],
            "At least two approaches must be compared and one recommended",
            1,
        ),
        Phase::QuestionDetermine => (
            vec![MinimumRequirement::new(
                "questionsResolved",
                Flag(true),
                "open questions are answered or explicitly deferred",
            )],
            "Open questions must be resolved before writing code",
            1,
        ),
        Phase::WriteOrRefactor => (
            vec![MinimumRequirement::new(
                "filesModified",
                AtLeast(1),
                "number of files changed",
            )],
            "No change has been reported for this phase",
            1,
        ),
        Phase::Test => (
            vec![
                MinimumRequirement::new("testsRun", AtLeast(1), "number of tests executed"),
                MinimumRequirement::new("testsPassing", Flag(true), "the test run is green"),
            ],
            "Tests must be executed and passing",
            1,
        ),
        Phase::Lint => (
            vec![MinimumRequirement::new(
                "lintClean",
                Flag(true),
                "linters report no remaining issues",
            )],
            "Lint must run clean",
            1,
        ),
        Phase::Iterate => (
            vec![MinimumRequirement::new(
                "issuesAddressed",
                Flag(true),
                "every issue from test/lint has been addressed",
            )],
            "Outstanding issues from test and lint must be addressed",
            1,
        ),
        Phase::Present => (
            vec![MinimumRequirement::new(
                "summaryProvided",
                Flag(true),
                "a final summary was presented to the user",
            )],
            "A final summary must be presented",
            1,
        ),
        Phase::UserInputRequired => (
            vec![MinimumRequirement::new(
                "userResponded",
                Flag(true),
                "the user has answered",
            )],
            "Waiting for the user's response",
            0,
        ),
    };

    let expected_files = if output.require_expected_files && min_artifacts > 0 {
        vec![phase.file_stem()]
    } else {
        Vec::new()
    };

    ValidationCriteria {
        phase,
        minimum_requirements: requirements,
        min_artifacts,
        expected_files,
        blocking_messages: vec![blocking.to_string()],
    }
}
