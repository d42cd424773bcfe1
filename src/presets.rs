//! Workflow presets and task-type detection.
//!
//! A preset is a named phase sequence plus default iteration limits for a
//! common task shape. `detect_workflow_type` only *suggests* a preset from the
//! task text; an explicit choice always wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::errors::WorkflowError;
use crate::phase::Phase;

/// The kind of task a session is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowType {
    #[default]
    Refactor,
    Feature,
    Test,
    Tdd,
    /// Caller supplies the phase list explicitly
    Custom,
}

impl WorkflowType {
    pub fn all() -> &'static [WorkflowType] {
        &[
            WorkflowType::Refactor,
            WorkflowType::Feature,
            WorkflowType::Test,
            WorkflowType::Tdd,
            WorkflowType::Custom,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::Refactor => "refactor",
            WorkflowType::Feature => "feature",
            WorkflowType::Test => "test",
            WorkflowType::Tdd => "tdd",
            WorkflowType::Custom => "custom",
        }
    }
}

impl std::fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkflowType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "refactor" => Ok(WorkflowType::Refactor),
            "feature" => Ok(WorkflowType::Feature),
            "test" | "tests" => Ok(WorkflowType::Test),
            "tdd" => Ok(WorkflowType::Tdd),
            "custom" => Ok(WorkflowType::Custom),
            _ => Err(WorkflowError::InvalidParams(format!(
                "Invalid workflow type '{}'. Valid values: refactor, feature, test, tdd, custom",
                s
            ))),
        }
    }
}

/// A named, predefined phase sequence with default iteration limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub workflow_type: WorkflowType,
    pub description: String,
    pub phases: Vec<Phase>,
    pub iteration_limits: BTreeMap<Phase, u32>,
}

/// Look up the preset for a workflow type.
///
/// `Custom` resolves to an empty phase list; callers must supply phases.
pub fn resolve(workflow_type: WorkflowType) -> Preset {
    use Phase::{
        AuditInventory, CompareAnalyze, Iterate, Lint, Planning, Present, QuestionDetermine,
        Test, WriteOrRefactor,
    };

    let (description, phases, limits): (&str, Vec<Phase>, Vec<(Phase, u32)>) = match workflow_type
    {
        WorkflowType::Refactor => (
            "Restructure existing code without changing behavior",
            vec![
                AuditInventory,
                CompareAnalyze,
                QuestionDetermine,
                WriteOrRefactor,
                Test,
                Lint,
                Iterate,
                Present,
            ],
            vec![(WriteOrRefactor, 3), (Test, 3), (Lint, 2), (Iterate, 5)],
        ),
        WorkflowType::Feature => (
            "Add new functionality",
            vec![
                Planning,
                QuestionDetermine,
                WriteOrRefactor,
                Test,
                Lint,
                Present,
            ],
            vec![(WriteOrRefactor, 3), (Test, 5), (Lint, 3)],
        ),
        WorkflowType::Test => (
            "Write tests for existing code",
            vec![AuditInventory, WriteOrRefactor, Test, Present],
            vec![(WriteOrRefactor, 3), (Test, 5)],
        ),
        WorkflowType::Tdd => (
            "Test-first development: failing test, implementation, refinement",
            vec![Planning, Test, WriteOrRefactor, Iterate, Lint, Present],
            vec![(Test, 5), (WriteOrRefactor, 3), (Iterate, 5), (Lint, 2)],
        ),
        WorkflowType::Custom => ("Caller-defined phase sequence", vec![], vec![]),
    };

    Preset {
        workflow_type,
        description: description.to_string(),
        phases,
        iteration_limits: limits.into_iter().collect(),
    }
}

/// All presets, in declaration order.
pub fn all_presets() -> Vec<Preset> {
    WorkflowType::all().iter().map(|t| resolve(*t)).collect()
}

static TDD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(tdd|test[- ]driven|test[- ]first|red[- ]green)\b").unwrap()
});

static TEST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(tests?|testing|coverage|unit tests?|integration tests?|specs?)\b").unwrap()
});

static REFACTOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(refactor\w*|restructur\w*|clean ?up|simplif\w*|renam\w*|extract\w*|reorganiz\w*|deduplicat\w*|modulariz\w*)\b",
    )
    .unwrap()
});

static FEATURE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(add|adds|adding|implement\w*|feature|build|create|support|introduce|new)\b")
        .unwrap()
});

/// Suggest a workflow type from free task text.
///
/// Test-driven wording wins outright. Otherwise each remaining type is scored by
/// keyword hits; ties go to refactor, then test, then feature. Returns `None`
/// when nothing matches.
pub fn detect_workflow_type(task: &str) -> Option<WorkflowType> {
    if TDD_REGEX.is_match(task) {
        return Some(WorkflowType::Tdd);
    }

    let scores = [
        (WorkflowType::Refactor, REFACTOR_REGEX.find_iter(task).count()),
        (WorkflowType::Test, TEST_REGEX.find_iter(task).count()),
        (WorkflowType::Feature, FEATURE_REGEX.find_iter(task).count()),
    ];

    let mut best: Option<(WorkflowType, usize)> = None;
    for (workflow_type, score) in scores {
        if score == 0 {
            continue;
        }
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((workflow_type, score)),
        }
    }

    best.map(|(workflow_type, _)| workflow_type)
}
