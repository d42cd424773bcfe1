//! Tool invocation boundary.
//!
//! Every call arrives as a tool name plus a JSON object of parameters and
//! leaves as a JSON value: the tool's result on success, a [`ToolError`]
//! object otherwise. Nothing below this function may panic or return an `Err`
//! to the transport.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::{ToolError, WorkflowError};
use crate::escalation::EscalationDecision;
use crate::orchestrator::{Orchestrator, StartRequest};
use crate::phase::Phase;
use crate::presets;
use crate::validation::Submission;

/// Names accepted by [`dispatch`].
pub const TOOL_NAMES: &[&str] = &[
    "start_session",
    "get_status",
    "end_session",
    "record_file_read",
    "check_action",
    "check_modification",
    "get_phase_guidance",
    "advance_phase",
    "complete_phase",
    "resolve_escalation",
    "list_presets",
    "detect_workflow",
];

#[derive(Deserialize)]
struct PathParams {
    path: String,
}

#[derive(Deserialize)]
struct ActionParams {
    action: String,
    path: String,
}

#[derive(Deserialize)]
struct PhaseParams {
    phase: Phase,
}

#[derive(Deserialize, Default)]
struct OptionalPhaseParams {
    #[serde(default)]
    phase: Option<Phase>,
}

#[derive(Deserialize)]
struct DecisionParams {
    decision: EscalationDecision,
}

#[derive(Deserialize)]
struct TaskParams {
    task: String,
}

/// Run one tool call and return its JSON response.
pub fn dispatch(orchestrator: &mut Orchestrator, tool: &str, params: Value) -> Value {
    debug!(tool, "Tool call");
    match call(orchestrator, tool, params) {
        Ok(value) => value,
        Err(err) => {
            debug!(tool, error = err.code(), "Tool call failed");
            error_value(err)
        }
    }
}

/// Serialize a [`WorkflowError`] as the boundary error object.
pub fn error_value(err: WorkflowError) -> Value {
    let tool_error = ToolError::from(err);
    serde_json::to_value(&tool_error).unwrap_or_else(|e| {
        json!({
            "error": "internal_error",
            "message": format!("Failed to serialize error: {}", e),
        })
    })
}

fn call(orch: &mut Orchestrator, tool: &str, params: Value) -> Result<Value, WorkflowError> {
    match tool {
        "start_session" => {
            let request: StartRequest = parse(params)?;
            to_value(orch.start_session(request)?)
        }
        "get_status" => to_value(orch.status()?),
        "end_session" => to_value(orch.end_session()?),
        "record_file_read" => {
            let p: PathParams = parse(params)?;
            to_value(orch.record_file_read(&p.path)?)
        }
        "check_action" => {
            let p: ActionParams = parse(params)?;
            to_value(orch.check_action(&p.action, &p.path)?.into_result()?)
        }
        "check_modification" => {
            let p: PathParams = parse(params)?;
            to_value(orch.check_modification(&p.path)?.into_result()?)
        }
        "get_phase_guidance" => {
            let p: OptionalPhaseParams = if params.is_null() {
                OptionalPhaseParams::default()
            } else {
                parse(params)?
            };
            to_value(orch.guidance(p.phase)?)
        }
        "advance_phase" => {
            let p: PhaseParams = parse(params)?;
            to_value(orch.advance_phase(p.phase)?)
        }
        "complete_phase" => {
            let submission: Submission = parse(params)?;
            to_value(orch.complete_phase(submission)?)
        }
        "resolve_escalation" => {
            let p: DecisionParams = parse(params)?;
            to_value(orch.resolve_escalation(p.decision)?)
        }
        "list_presets" => Ok(json!({ "presets": presets::all_presets() })),
        "detect_workflow" => {
            let p: TaskParams = parse(params)?;
            let detected = presets::detect_workflow_type(&p.task);
            Ok(json!({
                "task": p.task,
                "workflowType": detected,
                "suggested": detected.unwrap_or_default(),
            }))
        }
        other => Err(WorkflowError::UnknownTool(other.to_string())),
    }
}

/// Deserialize tool parameters, canonicalizing phase names first so that
/// `"lint"` or `"write-or-refactor"` resolve like their wire names.
fn parse<T: DeserializeOwned>(mut params: Value) -> Result<T, WorkflowError> {
    if params.is_null() {
        params = Value::Object(serde_json::Map::new());
    }
    canonicalize_phases(&mut params)?;
    serde_json::from_value(params).map_err(|e| WorkflowError::InvalidParams(e.to_string()))
}

fn canonicalize_phases(params: &mut Value) -> Result<(), WorkflowError> {
    let Value::Object(map) = params else {
        return Ok(());
    };

    if let Some(phase) = map.get_mut("phase") {
        canonicalize_phase(phase)?;
    }
    if let Some(Value::Array(phases)) = map.get_mut("phases") {
        for phase in phases.iter_mut() {
            canonicalize_phase(phase)?;
        }
    }
    if let Some(Value::Object(limits)) = map.get_mut("iterationLimits") {
        let mut canonical = serde_json::Map::new();
        for (key, limit) in std::mem::take(limits) {
            let phase: Phase = key.parse()?;
            canonical.insert(phase.as_str().to_string(), limit);
        }
        *limits = canonical;
    }
    Ok(())
}

fn canonicalize_phase(value: &mut Value) -> Result<(), WorkflowError> {
    if let Value::String(name) = value {
        let phase: Phase = name.parse()?;
        *name = phase.as_str().to_string();
    }
    Ok(())
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, WorkflowError> {
    serde_json::to_value(value)
        .map_err(|e| WorkflowError::Other(anyhow::anyhow!("Failed to serialize response: {}", e)))
}
