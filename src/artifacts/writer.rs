//! File-writer collaborator used by the recorder.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Persists artifact content under a name chosen by the recorder.
pub trait ArtifactWriter {
    /// Write `content` as `file_name` and return the final location.
    fn write(&self, file_name: &str, content: &str) -> Result<PathBuf>;

    /// Directory the writer puts files in.
    fn location(&self) -> &Path;
}

/// Writes artifacts into a single task directory on the local file system.
#[derive(Debug, Clone)]
pub struct FsArtifactWriter {
    dir: PathBuf,
}

impl FsArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactWriter for FsArtifactWriter {
    fn write(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create artifact directory: {}", self.dir.display())
        })?;

        let path = self.dir.join(file_name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;

        Ok(path)
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_directory() {
        let dir = tempdir().unwrap();
        let writer = FsArtifactWriter::new(dir.path().join("nested/task"));
        let path = writer.write("01-audit-inventory.md", "# Audit").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Audit");
        assert!(path.starts_with(writer.location()));
    }

    #[test]
    fn test_write_overwrites_same_name() {
        let dir = tempdir().unwrap();
        let writer = FsArtifactWriter::new(dir.path());
        writer.write("05-test.md", "first").unwrap();
        let path = writer.write("05-test.md", "second").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }
}
