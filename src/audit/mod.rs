//! Session audit trail.
//!
//! Every state change a session goes through is appended here in order. The
//! trail lives in memory with the session and is written next to the task's
//! artifacts when the session ends (see [`AuditLogger`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::Phase;
use crate::presets::WorkflowType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub session_id: Uuid,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new(session_id: Uuid, task: &str, workflow_type: WorkflowType) -> Self {
        let mut trail = Self {
            session_id,
            task: task.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            events: Vec::new(),
        };
        trail.push(AuditEventKind::SessionStarted { workflow_type });
        trail
    }

    pub fn push(&mut self, kind: AuditEventKind) {
        self.events.push(AuditEvent {
            at: Utc::now(),
            kind,
        });
    }

    pub fn finish(&mut self) {
        if self.ended_at.is_none() {
            self.push(AuditEventKind::SessionEnded);
            self.ended_at = Some(Utc::now());
        }
    }

    /// Number of events of a given kind, matched by its tag name.
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| e.kind.name() == event).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AuditEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEventKind {
    SessionStarted {
        workflow_type: WorkflowType,
    },
    FileRead {
        path: String,
    },
    FileModified {
        path: String,
    },
    SafetyDenied {
        path: String,
        action: String,
    },
    PhaseAdvanced {
        from: Phase,
        to: Phase,
    },
    ValidationAttempt {
        phase: Phase,
        attempt: u32,
        passed: bool,
        failures: usize,
    },
    PhaseCompleted {
        phase: Phase,
        artifacts: usize,
    },
    PhaseSkipped {
        phase: Phase,
    },
    EscalationRaised {
        phase: Phase,
        trigger: String,
    },
    EscalationResolved {
        phase: Phase,
        decision: String,
    },
    SessionEnded,
}

impl AuditEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            AuditEventKind::SessionStarted { .. } => "session_started",
            AuditEventKind::FileRead { .. } => "file_read",
            AuditEventKind::FileModified { .. } => "file_modified",
            AuditEventKind::SafetyDenied { .. } => "safety_denied",
            AuditEventKind::PhaseAdvanced { .. } => "phase_advanced",
            AuditEventKind::ValidationAttempt { .. } => "validation_attempt",
            AuditEventKind::PhaseCompleted { .. } => "phase_completed",
            AuditEventKind::PhaseSkipped { .. } => "phase_skipped",
            AuditEventKind::EscalationRaised { .. } => "escalation_raised",
            AuditEventKind::EscalationResolved { .. } => "escalation_resolved",
            AuditEventKind::SessionEnded => "session_ended",
        }
    }
}

pub mod logger;
pub use logger::{AUDIT_FILE, AuditLogger};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trail_records_start() {
        let trail = AuditTrail::new(Uuid::new_v4(), "task", WorkflowType::Feature);
        assert_eq!(trail.events.len(), 1);
        assert_eq!(trail.count("session_started"), 1);
        assert!(trail.ended_at.is_none());
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut trail = AuditTrail::new(Uuid::new_v4(), "task", WorkflowType::Feature);
        trail.finish();
        trail.finish();
        assert_eq!(trail.count("session_ended"), 1);
        assert!(trail.ended_at.is_some());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = AuditEvent {
            at: Utc::now(),
            kind: AuditEventKind::PhaseSkipped { phase: Phase::Lint },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "phase_skipped");
        assert_eq!(json["phase"], "LINT");
        assert!(json["at"].is_string());
    }
}
