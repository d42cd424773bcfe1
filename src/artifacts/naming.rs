//! Deterministic artifact and task-directory names.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::phase::Phase;
use crate::workflow_config::OutputFormat;

/// Longest task slug kept in a task directory name.
pub const MAX_TASK_SLUG_LEN: usize = 48;

static NON_SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercase, replace every run of non-alphanumerics with a dash, trim dashes.
pub fn sanitize(input: &str) -> String {
    let lower = input.to_lowercase();
    NON_SLUG_REGEX
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// File name for a phase artifact.
///
/// `index` is the 1-based position when a phase submits several artifacts;
/// pass `None` for a lone artifact.
pub fn artifact_file_name(
    phase: Phase,
    format: OutputFormat,
    date: Option<NaiveDate>,
    index: Option<usize>,
) -> String {
    let mut name = phase.file_stem();
    if let Some(date) = date {
        name.push('-');
        name.push_str(&date.format("%Y%m%d").to_string());
    }
    if let Some(index) = index {
        name.push_str(&format!("-{}", index));
    }
    format!("{}.{}", name, format.extension())
}

/// Directory name for a task: `YYYYMMDD-task-slug`.
pub fn task_dir_name(task: &str, started_at: DateTime<Utc>) -> String {
    let mut slug = sanitize(task);
    if slug.len() > MAX_TASK_SLUG_LEN {
        slug.truncate(MAX_TASK_SLUG_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    if slug.is_empty() {
        slug = "task".to_string();
    }
    format!("{}-{}", started_at.format("%Y%m%d"), slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Refactor the  Session/Store!"), "refactor-the-session-store");
        assert_eq!(sanitize("--a--"), "a");
        assert_eq!(sanitize("***"), "");
    }

    #[test]
    fn test_artifact_name_plain() {
        assert_eq!(
            artifact_file_name(Phase::AuditInventory, OutputFormat::Markdown, None, None),
            "01-audit-inventory.md"
        );
    }

    #[test]
    fn test_artifact_name_dated_and_indexed() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            artifact_file_name(Phase::Test, OutputFormat::Json, Some(date), Some(2)),
            "05-test-20260309-2.json"
        );
    }

    #[test]
    fn test_names_sort_in_phase_order() {
        let mut names: Vec<String> = Phase::all()
            .iter()
            .rev()
            .map(|p| artifact_file_name(*p, OutputFormat::Text, None, None))
            .collect();
        names.sort();
        let expected: Vec<String> = Phase::all()
            .iter()
            .map(|p| artifact_file_name(*p, OutputFormat::Text, None, None))
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_task_dir_name() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        assert_eq!(task_dir_name("Add CSV export", at), "20261016-add-csv-export");
        assert_eq!(task_dir_name("!!!", at), "20261016-task");
    }

    #[test]
    fn test_task_dir_name_truncates() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let long = "word ".repeat(40);
        let name = task_dir_name(&long, at);
        assert!(name.len() <= 9 + MAX_TASK_SLUG_LEN);
        assert!(!name.ends_with('-'));
    }
}
