//! Phase definitions for the phaseguard workflow core.
//!
//! This module provides:
//! - `Phase`, the closed set of workflow stages an agent moves through
//! - The fixed phase → order table used to prefix artifact file names
//! - Parsing/printing of the SCREAMING_SNAKE wire names
//!
//! Order is *not* intrinsic to a workflow: a session supplies its own ordered
//! subset of phases (see [`crate::workflow_config::WorkflowConfiguration`]).
//! The order table only exists so artifact files sort chronologically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::WorkflowError;

/// A named stage in the enforced task workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Outline the approach before touching code
    Planning,
    /// Read and inventory every file in scope
    AuditInventory,
    /// Compare candidate approaches and analyze trade-offs
    CompareAnalyze,
    /// Resolve open questions and determine the path forward
    QuestionDetermine,
    /// Perform the actual write or refactor
    WriteOrRefactor,
    /// Run the test suite and report results
    Test,
    /// Run linters / formatters and report results
    Lint,
    /// Address failures found by test and lint
    Iterate,
    /// Present the final summary to the user
    Present,
    /// Hand control back to the user for input
    UserInputRequired,
}

impl Phase {
    /// Returns all phases in order-table order.
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Planning,
            Phase::AuditInventory,
            Phase::CompareAnalyze,
            Phase::QuestionDetermine,
            Phase::WriteOrRefactor,
            Phase::Test,
            Phase::Lint,
            Phase::Iterate,
            Phase::Present,
            Phase::UserInputRequired,
        ]
    }

    /// Returns the wire name (e.g. `AUDIT_INVENTORY`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "PLANNING",
            Phase::AuditInventory => "AUDIT_INVENTORY",
            Phase::CompareAnalyze => "COMPARE_ANALYZE",
            Phase::QuestionDetermine => "QUESTION_DETERMINE",
            Phase::WriteOrRefactor => "WRITE_OR_REFACTOR",
            Phase::Test => "TEST",
            Phase::Lint => "LINT",
            Phase::Iterate => "ITERATE",
            Phase::Present => "PRESENT",
            Phase::UserInputRequired => "USER_INPUT_REQUIRED",
        }
    }

    /// Position in the fixed naming table. Drives the numeric artifact prefix.
    pub fn order(&self) -> u8 {
        match self {
            Phase::Planning => 0,
            Phase::AuditInventory => 1,
            Phase::CompareAnalyze => 2,
            Phase::QuestionDetermine => 3,
            Phase::WriteOrRefactor => 4,
            Phase::Test => 5,
            Phase::Lint => 6,
            Phase::Iterate => 7,
            Phase::Present => 8,
            Phase::UserInputRequired => 9,
        }
    }

    /// Lowercase, dash-separated name used in file names (`audit-inventory`).
    pub fn slug(&self) -> String {
        self.as_str().to_lowercase().replace('_', "-")
    }

    /// Zero-padded order prefix plus slug (`01-audit-inventory`).
    ///
    /// This is also the identifier a phase's expected output file must carry.
    pub fn file_stem(&self) -> String {
        format!("{:02}-{}", self.order(), self.slug())
    }

    /// Short human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            Phase::Planning => "Planning",
            Phase::AuditInventory => "Audit & inventory",
            Phase::CompareAnalyze => "Compare & analyze",
            Phase::QuestionDetermine => "Question & determine",
            Phase::WriteOrRefactor => "Write or refactor",
            Phase::Test => "Test",
            Phase::Lint => "Lint",
            Phase::Iterate => "Iterate",
            Phase::Present => "Present",
            Phase::UserInputRequired => "User input required",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Phase::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| WorkflowError::UnknownPhase(s.to_string()))
    }
}
