//! Artifact submission types, file naming and persistence.
//!
//! Validated phase outputs are written through an [`ArtifactWriter`]
//! collaborator so the core never touches the file system directly. File names
//! follow a fixed `NN-phase-slug[-YYYYMMDD][-n].ext` scheme so a task
//! directory lists in chronological phase order.

use serde::{Deserialize, Serialize};

use crate::workflow_config::OutputFormat;

pub mod naming;
pub mod recorder;
pub mod writer;

pub use naming::{artifact_file_name, sanitize, task_dir_name};
pub use recorder::{ArtifactFailure, ArtifactRecorder, RecordOutcome};
pub use writer::{ArtifactWriter, FsArtifactWriter};

/// A piece of evidence submitted with a phase completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputArtifact {
    /// Path or identifier the agent uses for this artifact
    pub path: String,
    pub format: OutputFormat,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
}

impl OutputArtifact {
    pub fn new(
        path: impl Into<String>,
        format: OutputFormat,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            format,
            description: description.into(),
            content: content.into(),
        }
    }

    pub fn markdown(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, OutputFormat::Markdown, "", content)
    }

    pub fn json(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, OutputFormat::Json, "", content)
    }
}

/// An artifact that passed validation, as kept in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    pub path: String,
    pub format: OutputFormat,
    pub description: String,
    pub chars: usize,
    /// Where the artifact landed on disk, if the write succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
}

impl ArtifactRecord {
    pub fn from_artifact(artifact: &OutputArtifact) -> Self {
        Self {
            path: artifact.path.clone(),
            format: artifact.format,
            description: artifact.description.clone(),
            chars: artifact.content.chars().count(),
            saved_to: None,
        }
    }
}
