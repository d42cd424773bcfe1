//! Integration tests for phaseguard
//!
//! These tests drive the binary end to end and run the documented
//! scenarios against the library.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

/// Helper to create a phaseguard Command
fn phaseguard() -> Command {
    cargo_bin_cmd!("phaseguard")
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Run `serve` over `requests` and parse every response line.
fn serve(dir: &TempDir, requests: &[Value]) -> Vec<Value> {
    let input: String = requests.iter().map(|r| format!("{}\n", r)).collect();
    let output = phaseguard()
        .current_dir(dir.path())
        .args(["serve", "--output-dir", "out"])
        .env_remove("PHASEGUARD_OUTPUT_DIR")
        .env_remove("PHASEGUARD_GUIDANCE_MODE")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        phaseguard()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"));
    }

    #[test]
    fn test_version() {
        phaseguard().arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_config() {
        let dir = create_temp_project();

        phaseguard()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized phaseguard"));

        assert!(dir.path().join(".phaseguard/phaseguard.toml").exists());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = create_temp_project();
        phaseguard().current_dir(dir.path()).arg("init").assert().success();
        phaseguard()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));
    }

    #[test]
    fn test_init_fills_in_missing_config() {
        let dir = create_temp_project();
        std::fs::create_dir_all(dir.path().join(".phaseguard")).unwrap();
        phaseguard()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Wrote default config"));
        assert!(dir.path().join(".phaseguard/phaseguard.toml").exists());
    }

    #[test]
    fn test_presets_lists_every_workflow() {
        phaseguard()
            .arg("presets")
            .assert()
            .success()
            .stdout(predicate::str::contains("refactor"))
            .stdout(predicate::str::contains("tdd"))
            .stdout(predicate::str::contains("AUDIT_INVENTORY"));
    }

    #[test]
    fn test_detect() {
        phaseguard()
            .args(["detect", "Use", "TDD", "for", "the", "parser"])
            .assert()
            .success()
            .stdout(predicate::str::contains("tdd"));
    }

    #[test]
    fn test_detect_requires_task() {
        phaseguard().arg("detect").assert().failure();
    }

    #[test]
    fn test_phases() {
        phaseguard()
            .arg("phases")
            .assert()
            .success()
            .stdout(predicate::str::contains("USER_INPUT_REQUIRED"))
            .stdout(predicate::str::contains("06"));
    }
}

// =============================================================================
// Config Command Tests
// =============================================================================

mod config_commands {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();
        phaseguard()
            .current_dir(dir.path())
            .args(["config", "show"])
            .env_remove("PHASEGUARD_OUTPUT_DIR")
            .assert()
            .success()
            .stdout(predicate::str::contains("No phaseguard.toml found"))
            .stdout(predicate::str::contains("phaseguard-output"));
    }

    #[test]
    fn test_config_init_then_exists() {
        let dir = create_temp_project();
        phaseguard()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created phaseguard.toml"));
        phaseguard()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".phaseguard")).unwrap();
        fs::write(
            dir.path().join(".phaseguard/phaseguard.toml"),
            "[limits]\nDEPLOY = 3\n",
        )
        .unwrap();

        phaseguard()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Unknown phase 'DEPLOY'"));
    }

    #[test]
    fn test_malformed_config_fails() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".phaseguard")).unwrap();
        fs::write(dir.path().join(".phaseguard/phaseguard.toml"), "[output\n").unwrap();

        phaseguard()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Stdio Server Tests
// =============================================================================

mod serve_session {
    use super::*;

    #[test]
    fn test_scripted_session() {
        let dir = create_temp_project();
        let responses = serve(
            &dir,
            &[
                json!({"id": 1, "tool": "start_session", "params": {
                    "task": "Refactor the session store",
                    "phases": ["AUDIT_INVENTORY", "WRITE_OR_REFACTOR", "PRESENT"]
                }}),
                json!({"id": 2, "tool": "check_modification", "params": {"path": "src/store.rs"}}),
                json!({"id": 3, "tool": "record_file_read", "params": {"path": "src/store.rs"}}),
                json!({"id": 4, "tool": "check_modification", "params": {"path": "src/store.rs"}}),
                json!({"id": 5, "tool": "complete_phase", "params": {
                    "phase": "AUDIT_INVENTORY",
                    "output": {"filesAnalyzed": 4},
                    "outputArtifacts": [{
                        "path": "audit.md",
                        "format": "markdown",
                        "description": "inventory",
                        "content": "# Audit\n\nFour files in scope; the changes touch the store only."
                    }]
                }}),
                json!({"id": 6, "tool": "get_status"}),
                json!({"id": 7, "tool": "nope"}),
            ],
        );

        assert_eq!(responses.len(), 7);
        assert_eq!(responses[0]["result"]["workflowType"], "custom");
        assert_eq!(responses[1]["result"]["error"], "safety_violation");
        assert_eq!(responses[3]["result"]["allowed"], true);
        assert_eq!(responses[4]["result"]["recorded"], true);
        assert_eq!(responses[4]["result"]["artifactsSaved"], 1);
        assert_eq!(responses[5]["result"]["completedPhases"][0], "AUDIT_INVENTORY");
        assert_eq!(responses[6]["id"], 7);
        assert_eq!(responses[6]["result"]["error"], "unknown_tool");

        // Artifact and audit trail on disk
        let out = dir.path().join("out");
        let task_dir = fs::read_dir(&out)
            .unwrap()
            .filter_map(|e| e.ok())
            .find(|e| e.path().is_dir())
            .unwrap()
            .path();
        let names: Vec<String> = fs::read_dir(&task_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("01-audit-inventory")));
        assert!(names.iter().any(|n| n == "session-audit.json"));
    }

    #[test]
    fn test_malformed_request_line() {
        let dir = create_temp_project();
        let output = phaseguard()
            .current_dir(dir.path())
            .args(["serve", "--output-dir", "out"])
            .write_stdin("{broken\n")
            .assert()
            .success();
        output.stdout(predicate::str::contains("invalid_request"));
    }
}

// =============================================================================
// Library Scenarios
// =============================================================================

mod scenarios {
    use super::*;
    use phaseguard::artifacts::OutputArtifact;
    use phaseguard::config::Config;
    use phaseguard::errors::WorkflowError;
    use phaseguard::escalation::EscalationTrigger;
    use phaseguard::orchestrator::{Orchestrator, StartRequest};
    use phaseguard::phase::Phase;
    use phaseguard::safety::READ_BEFORE_WRITE;
    use phaseguard::validation::Submission;
    use std::path::PathBuf;

    fn orchestrator(dir: &TempDir) -> Orchestrator {
        let config =
            Config::new(dir.path().to_path_buf(), Some(PathBuf::from("out")), false).unwrap();
        Orchestrator::new(config)
    }

    fn three_phase_session(orch: &mut Orchestrator) {
        orch.start_session(StartRequest::new("tidy the parser").phases(vec![
            Phase::AuditInventory,
            Phase::WriteOrRefactor,
            Phase::Present,
        ]))
        .unwrap();
    }

    #[test]
    fn scenario_a_short_artifact_rejected() {
        let dir = create_temp_project();
        let mut orch = orchestrator(&dir);
        three_phase_session(&mut orch);

        let err = orch
            .complete_phase(
                Submission::new(Phase::AuditInventory, json!({"filesAnalyzed": 1}))
                    .with_artifact(OutputArtifact::markdown("audit.md", "x")),
            )
            .unwrap_err();
        let WorkflowError::ValidationFailed { failures, .. } = err else {
            panic!("expected validation failure");
        };
        assert!(failures.iter().any(|f| f.contains("characters")));
        assert!(orch.status().unwrap().completed_phases.is_empty());
    }

    #[test]
    fn scenario_b_relevant_artifact_accepted() {
        let dir = create_temp_project();
        let mut orch = orchestrator(&dir);
        three_phase_session(&mut orch);

        let done = orch
            .complete_phase(
                Submission::new(Phase::AuditInventory, json!({"filesAnalyzed": 2})).with_artifact(
                    OutputArtifact::markdown(
                        "audit.md",
                        "Audit of parser.rs and lexer.rs; the changes stay local to parsing.",
                    ),
                ),
            )
            .unwrap();
        assert!(done.recorded);
        assert_eq!(
            orch.status().unwrap().completed_phases,
            vec![Phase::AuditInventory]
        );
    }

    #[test]
    fn scenario_c_lint_limit_escalates_on_third_failure() {
        let dir = create_temp_project();
        let mut orch = orchestrator(&dir);
        orch.start_session(StartRequest::new("tidy").limit(Phase::Lint, 2).phases(vec![
            Phase::WriteOrRefactor,
            Phase::Lint,
        ]))
        .unwrap();

        let failing = || {
            Submission::new(Phase::Lint, json!({"lintClean": false})).with_artifact(
                OutputArtifact::markdown("lint.md", "clippy output: 3 warnings remain"),
            )
        };

        for _ in 0..2 {
            let err = orch.complete_phase(failing()).unwrap_err();
            assert!(matches!(err, WorkflowError::ValidationFailed { .. }));
        }
        let err = orch.complete_phase(failing()).unwrap_err();
        let WorkflowError::EscalationRequired(ctx) = err else {
            panic!("expected escalation");
        };
        assert_eq!(ctx.trigger, EscalationTrigger::IterationLimit);
        assert_eq!(ctx.attempt_count, 3);
    }

    #[test]
    fn scenario_d_read_before_write() {
        let dir = create_temp_project();
        let mut orch = orchestrator(&dir);
        three_phase_session(&mut orch);

        let denied = orch.check_modification("a.txt").unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.reason.as_deref(), Some(READ_BEFORE_WRITE));

        orch.record_file_read("a.txt").unwrap();
        let allowed = orch.check_modification("a.txt").unwrap();
        assert!(allowed.allowed);
    }

    #[test]
    fn json_artifact_must_parse() {
        let dir = create_temp_project();
        let mut orch = orchestrator(&dir);
        three_phase_session(&mut orch);

        let err = orch
            .complete_phase(
                Submission::new(Phase::AuditInventory, json!({"filesAnalyzed": 1})).with_artifact(
                    OutputArtifact::json("audit.json", "{\"audit\": \"changes\", broken"),
                ),
            )
            .unwrap_err();
        let WorkflowError::ValidationFailed { failures, .. } = err else {
            panic!("expected validation failure");
        };
        assert!(failures.iter().any(|f| f.contains("not valid JSON")));
    }
}
