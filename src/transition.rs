//! Phase transitions.
//!
//! Transitions are advisory: any phase may be requested out of order and only
//! completion is gated by validation. This module just answers "what comes
//! next" and "is this request in order".

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::session::Session;

/// The phase after the current one, or `None` when the current phase is last
/// or not part of the workflow.
pub fn next_phase(session: &Session) -> Option<Phase> {
    next_after(session, session.current_phase())
}

/// The phase following `phase` in the session's workflow.
pub fn next_after(session: &Session, phase: Phase) -> Option<Phase> {
    let phases = &session.workflow_config().selected_phases;
    let index = phases.iter().position(|p| *p == phase)?;
    phases.get(index + 1).copied()
}

/// How a requested phase relates to where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Already the current phase
    Current,
    /// The immediate successor of the current phase
    Next,
    /// Going back to a phase before the current one
    Revisit,
    /// Jumping over one or more phases
    SkipAhead,
    /// Not in the selected phase sequence
    OutsideWorkflow,
}

impl TransitionKind {
    pub fn is_in_order(&self) -> bool {
        matches!(self, TransitionKind::Current | TransitionKind::Next)
    }
}

/// Classify a request to move to `requested`.
pub fn classify(session: &Session, requested: Phase) -> TransitionKind {
    let config = session.workflow_config();
    let Some(target) = config.position(requested) else {
        return TransitionKind::OutsideWorkflow;
    };
    let current = session.current_phase();
    if requested == current {
        return TransitionKind::Current;
    }
    match config.position(current) {
        Some(pos) if target == pos + 1 => TransitionKind::Next,
        Some(pos) if target < pos => TransitionKind::Revisit,
        _ => TransitionKind::SkipAhead,
    }
}

/// Phases between the current phase and `requested` that are not yet done.
pub fn skipped_by(session: &Session, requested: Phase) -> Vec<Phase> {
    let config = session.workflow_config();
    let (Some(from), Some(to)) = (config.position(session.current_phase()), config.position(requested))
    else {
        return Vec::new();
    };
    if to <= from + 1 {
        return Vec::new();
    }
    config.selected_phases[from + 1..to]
        .iter()
        .copied()
        .filter(|p| !session.is_completed(*p) && !session.is_skipped(*p))
        .collect()
}
