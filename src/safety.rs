//! Read-before-write enforcement.
//!
//! A modification of a path that has not been read in this session is always
//! denied, whatever the phase or workflow. Which action names count as reads
//! or modifications is decided by an [`ActionClassifier`], never hardcoded.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::WorkflowError;
use crate::session::SessionStore;

pub const READ_BEFORE_WRITE: &str = "read before write";

/// What an action does to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Read,
    Modify,
    /// Neither reads nor modifies an existing file (listing, creating, searching)
    Other,
}

pub trait ActionClassifier: Send + Sync {
    fn classify(&self, action: &str) -> ActionKind;
}

/// Classifies by action/tool name, case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolNameClassifier {
    read_actions: Vec<String>,
    modify_actions: Vec<String>,
}

impl ToolNameClassifier {
    pub fn new(read_actions: &[String], modify_actions: &[String]) -> Self {
        Self {
            read_actions: read_actions.iter().map(|a| a.to_lowercase()).collect(),
            modify_actions: modify_actions.iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    pub fn default_read_actions() -> Vec<String> {
        ["read", "view", "cat", "open", "read_file"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn default_modify_actions() -> Vec<String> {
        [
            "write",
            "edit",
            "modify",
            "multiedit",
            "str_replace",
            "delete",
            "rename",
            "move",
            "write_file",
            "edit_file",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

impl Default for ToolNameClassifier {
    fn default() -> Self {
        Self::new(&Self::default_read_actions(), &Self::default_modify_actions())
    }
}

impl ActionClassifier for ToolNameClassifier {
    fn classify(&self, action: &str) -> ActionKind {
        let action = action.trim().to_lowercase();
        // Modification wins when a name is configured as both.
        if self.modify_actions.contains(&action) {
            ActionKind::Modify
        } else if self.read_actions.contains(&action) {
            ActionKind::Read
        } else {
            ActionKind::Other
        }
    }
}

/// Result of a safety check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyDecision {
    pub allowed: bool,
    pub action: ActionKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SafetyDecision {
    /// `Err(SafetyViolation)` for a denial.
    pub fn into_result(self) -> Result<SafetyDecision, WorkflowError> {
        if self.allowed {
            Ok(self)
        } else {
            Err(WorkflowError::SafetyViolation {
                reason: self.reason.unwrap_or_else(|| READ_BEFORE_WRITE.to_string()),
                path: self.path,
            })
        }
    }
}

pub struct SafetyGate {
    classifier: Box<dyn ActionClassifier>,
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new(Box::new(ToolNameClassifier::default()))
    }
}

impl SafetyGate {
    pub fn new(classifier: Box<dyn ActionClassifier>) -> Self {
        Self { classifier }
    }

    /// Classify `action` on `path`, enforce read-before-write and record
    /// allowed reads and modifications in the session.
    pub fn check_action(
        &self,
        store: &mut SessionStore,
        action: &str,
        path: &str,
    ) -> Result<SafetyDecision, WorkflowError> {
        match self.classifier.classify(action) {
            ActionKind::Read => {
                store.record_file_read(path)?;
                Ok(allowed(ActionKind::Read, path))
            }
            ActionKind::Modify => self.check_modification(store, path),
            ActionKind::Other => {
                store.require()?;
                Ok(allowed(ActionKind::Other, path))
            }
        }
    }

    /// Enforce read-before-write for a modification of `path`.
    pub fn check_modification(
        &self,
        store: &mut SessionStore,
        path: &str,
    ) -> Result<SafetyDecision, WorkflowError> {
        if !store.require()?.has_read(path) {
            warn!(path = %path, "Modification denied: {}", READ_BEFORE_WRITE);
            store.record_safety_denial(path, "modify")?;
            return Ok(SafetyDecision {
                allowed: false,
                action: ActionKind::Modify,
                path: path.to_string(),
                reason: Some(READ_BEFORE_WRITE.to_string()),
            });
        }
        store.record_file_modified(path)?;
        Ok(allowed(ActionKind::Modify, path))
    }
}

fn allowed(action: ActionKind, path: &str) -> SafetyDecision {
    SafetyDecision {
        allowed: true,
        action,
        path: path.to_string(),
        reason: None,
    }
}
