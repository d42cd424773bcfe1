//! Persists validated artifacts through an [`ArtifactWriter`].
//!
//! Writes are best-effort per artifact: one failing write is reported in
//! `failed` and does not stop the others.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::naming::artifact_file_name;
use super::writer::ArtifactWriter;
use super::{ArtifactRecord, OutputArtifact};
use crate::errors::WorkflowError;
use crate::phase::Phase;
use crate::workflow_config::OutputFormat;

/// An artifact that validated but could not be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFailure {
    pub path: String,
    pub reason: String,
}

/// Result of recording one phase's artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub saved: Vec<ArtifactRecord>,
    pub failed: Vec<ArtifactFailure>,
}

pub struct ArtifactRecorder<'a> {
    writer: &'a dyn ArtifactWriter,
    date: Option<NaiveDate>,
}

impl<'a> ArtifactRecorder<'a> {
    /// `date` is stamped into every file name when present.
    pub fn new(writer: &'a dyn ArtifactWriter, date: Option<NaiveDate>) -> Self {
        Self { writer, date }
    }

    pub fn record(&self, phase: Phase, artifacts: &[OutputArtifact]) -> RecordOutcome {
        let mut outcome = RecordOutcome::default();
        let many = artifacts.len() > 1;

        for (i, artifact) in artifacts.iter().enumerate() {
            let index = if many { Some(i + 1) } else { None };
            let file_name = artifact_file_name(phase, artifact.format, self.date, index);

            let content = match render(artifact) {
                Ok(content) => content,
                Err(e) => {
                    warn!(phase = %phase, path = %artifact.path, error = %e, "Artifact not written");
                    outcome.failed.push(ArtifactFailure {
                        path: artifact.path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self.writer.write(&file_name, &content) {
                Ok(location) => {
                    debug!(phase = %phase, file = %location.display(), "Artifact written");
                    let mut record = ArtifactRecord::from_artifact(artifact);
                    record.saved_to = Some(location.display().to_string());
                    outcome.saved.push(record);
                }
                Err(e) => {
                    warn!(phase = %phase, file = %file_name, error = %e, "Artifact write failed");
                    outcome.failed.push(ArtifactFailure {
                        path: artifact.path.clone(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        outcome
    }
}

/// JSON artifacts are re-parsed and pretty-printed; other formats are written as-is.
fn render(artifact: &OutputArtifact) -> Result<String, WorkflowError> {
    match artifact.format {
        OutputFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(&artifact.content).map_err(|e| {
                WorkflowError::InvalidJson {
                    path: artifact.path.clone(),
                    message: e.to_string(),
                }
            })?;
            serde_json::to_string_pretty(&value).map_err(|e| WorkflowError::InvalidJson {
                path: artifact.path.clone(),
                message: e.to_string(),
            })
        }
        OutputFormat::Markdown | OutputFormat::Text => Ok(artifact.content.clone()),
    }
}
