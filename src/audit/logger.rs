use super::AuditTrail;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the exported trail inside a task directory.
pub const AUDIT_FILE: &str = "session-audit.json";

/// Writes finished audit trails to disk.
pub struct AuditLogger {
    audit_dir: PathBuf,
}

impl AuditLogger {
    pub fn new(audit_dir: &Path) -> Self {
        Self {
            audit_dir: audit_dir.to_path_buf(),
        }
    }

    /// Mark the trail finished and write it as pretty JSON.
    pub fn finish(&self, trail: &mut AuditTrail) -> Result<PathBuf> {
        trail.finish();

        fs::create_dir_all(&self.audit_dir).with_context(|| {
            format!(
                "Failed to create audit directory: {}",
                self.audit_dir.display()
            )
        })?;

        let path = self.audit_dir.join(AUDIT_FILE);
        let json = serde_json::to_string_pretty(trail).context("Failed to serialize audit trail")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write audit trail: {}", path.display()))?;

        Ok(path)
    }

    pub fn load(path: &Path) -> Result<AuditTrail> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read audit trail: {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse audit trail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEventKind;
    use crate::phase::Phase;
    use crate::presets::WorkflowType;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[test]
    fn test_finish_writes_and_loads() {
        let dir = tempdir().unwrap();
        let logger = AuditLogger::new(&dir.path().join("task"));
        let mut trail = AuditTrail::new(Uuid::new_v4(), "refactor x", WorkflowType::Refactor);
        trail.push(AuditEventKind::PhaseCompleted {
            phase: Phase::AuditInventory,
            artifacts: 1,
        });

        let path = logger.finish(&mut trail).unwrap();
        assert!(path.ends_with(AUDIT_FILE));

        let loaded = AuditLogger::load(&path).unwrap();
        assert_eq!(loaded.session_id, trail.session_id);
        assert_eq!(loaded.count("phase_completed"), 1);
        assert_eq!(loaded.count("session_ended"), 1);
    }
}
