use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::criteria::{Requirement, ValidationCriteria, criteria_for};
use super::predicates::{ContentPredicate, default_predicate};
use super::{Submission, ValidationReport};
use crate::phase::Phase;
use crate::workflow_config::{OutputFormat, WorkflowConfiguration};

/// Validates phase submissions against derived criteria.
pub struct ValidationEngine {
    predicates: HashMap<Phase, Box<dyn ContentPredicate>>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// Engine with the built-in keyword predicate for every phase.
    pub fn new() -> Self {
        let predicates = Phase::all()
            .iter()
            .map(|p| (*p, default_predicate(*p)))
            .collect();
        Self { predicates }
    }

    /// Replace the content predicate of one phase.
    pub fn with_predicate(mut self, phase: Phase, predicate: Box<dyn ContentPredicate>) -> Self {
        self.predicates.insert(phase, predicate);
        self
    }

    /// Criteria for `phase` with waived keys removed.
    pub fn criteria(
        &self,
        phase: Phase,
        config: &WorkflowConfiguration,
        waived: &[String],
    ) -> ValidationCriteria {
        criteria_for(phase, &config.output_preferences).without(waived)
    }

    pub fn validate(
        &self,
        submission: &Submission,
        config: &WorkflowConfiguration,
        waived: &[String],
    ) -> ValidationReport {
        let phase = submission.phase;
        let criteria = self.criteria(phase, config, waived);
        let mut report = ValidationReport::default();

        self.check_requirements(&criteria, &submission.output, &mut report);
        check_expected_files(&criteria, submission, &mut report);
        self.check_artifacts(&criteria, submission, config, &mut report);

        report.blocking_messages = criteria.blocking_messages.clone();
        report.finish()
    }

    fn check_requirements(
        &self,
        criteria: &ValidationCriteria,
        output: &Value,
        report: &mut ValidationReport,
    ) {
        for req in &criteria.minimum_requirements {
            let actual = output.get(&req.key);
            let ok = match req.expected {
                Requirement::AtLeast(min) => numeric(actual).is_some_and(|n| n >= min as f64),
                Requirement::Flag(expected) => truthy(actual) == expected,
            };
            let shown = actual.map(Value::to_string).unwrap_or_else(|| "missing".into());
            if ok {
                report.pass(format!("{}: {} (required {})", req.key, shown, req.expected));
            } else {
                report.fail(
                    format!("{}: got {}, required {}", req.key, shown, req.expected),
                    Some(format!("Report {} ({})", req.key, req.description)),
                );
                report.unmet_requirements.push(req.key.clone());
            }
        }
    }

    fn check_artifacts(
        &self,
        criteria: &ValidationCriteria,
        submission: &Submission,
        config: &WorkflowConfiguration,
        report: &mut ValidationReport,
    ) {
        let artifacts = &submission.output_artifacts;
        if artifacts.len() < criteria.min_artifacts {
            report.fail(
                format!(
                    "{} output artifact(s) submitted, at least {} required",
                    artifacts.len(),
                    criteria.min_artifacts
                ),
                Some(format!(
                    "Attach the {} deliverable as an output artifact",
                    criteria.phase
                )),
            );
        }

        let predicate = self.predicates.get(&criteria.phase);
        let min_len = config.min_content_length;

        for artifact in artifacts {
            let label = if artifact.path.trim().is_empty() {
                report.fail(
                    "artifact has an empty path".to_string(),
                    Some("Give every artifact a path or identifier".to_string()),
                );
                "<unnamed>"
            } else {
                artifact.path.as_str()
            };

            if !config.output_preferences.allows(artifact.format) {
                report.fail(
                    format!("{}: format {} is not enabled", label, artifact.format),
                    Some(format!(
                        "Use one of: {}",
                        config
                            .output_preferences
                            .formats
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                );
                continue;
            }

            let chars = artifact.content.trim().chars().count();
            if chars < min_len {
                report.fail(
                    format!(
                        "{}: content is {} characters, at least {} required",
                        label, chars, min_len
                    ),
                    Some(format!("Write the actual {} content into {}", criteria.phase, label)),
                );
                continue;
            }

            if artifact.format == OutputFormat::Json
                && let Err(e) = serde_json::from_str::<Value>(&artifact.content)
            {
                report.fail(
                    format!("{}: not valid JSON ({})", label, e),
                    Some(format!("Fix the JSON syntax of {}", label)),
                );
                continue;
            }

            match predicate.map(|p| p.check(&artifact.content)) {
                Some(Err(reason)) => report.fail(
                    format!("{}: not relevant to {}: {}", label, criteria.phase, reason),
                    Some(format!(
                        "Describe the {} work itself in {}",
                        criteria.phase, label
                    )),
                ),
                _ => report.pass(format!("{}: accepted", label)),
            }
        }
    }
}

fn check_expected_files(
    criteria: &ValidationCriteria,
    submission: &Submission,
    report: &mut ValidationReport,
) {
    let claimed: Vec<&str> = submission
        .created_files
        .iter()
        .map(String::as_str)
        .chain(submission.output_artifacts.iter().map(|a| a.path.as_str()))
        .collect();

    for expected in &criteria.expected_files {
        let found = claimed.iter().any(|c| file_name(c).starts_with(expected.as_str()));
        if found {
            report.pass(format!("output file {} created", expected));
        } else {
            report.fail(
                format!("output file {} not created", expected),
                Some(format!("Create {}.<ext> and list it in createdFiles", expected)),
            );
            report.unmet_requirements.push(expected.clone());
        }
    }
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// A number, or the length of an array.
fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::Array(items) => Some(items.len() as f64),
        _ => None,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
