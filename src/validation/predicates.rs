//! Pluggable per-phase content predicates.
//!
//! A predicate only catches placeholder content ("TODO", "done", lorem ipsum).
//! It is a loose keyword check, not a judge of quality, and any phase's
//! predicate can be replaced through [`ValidationEngine::with_predicate`].
//!
//! [`ValidationEngine::with_predicate`]: super::ValidationEngine::with_predicate

use crate::phase::Phase;

/// Decides whether an artifact's content is relevant to its phase.
pub trait ContentPredicate: Send + Sync {
    /// `Err` carries a human-readable reason.
    fn check(&self, content: &str) -> Result<(), String>;
}

impl<F> ContentPredicate for F
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn check(&self, content: &str) -> Result<(), String> {
        self(content)
    }
}

/// Accepts any content.
pub struct AcceptAll;

impl ContentPredicate for AcceptAll {
    fn check(&self, _content: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Every group must have at least one keyword present (case-insensitive substring).
pub struct KeywordPredicate {
    groups: Vec<Vec<&'static str>>,
}

impl KeywordPredicate {
    pub fn new(groups: Vec<Vec<&'static str>>) -> Self {
        Self { groups }
    }
}

impl ContentPredicate for KeywordPredicate {
    fn check(&self, content: &str) -> Result<(), String> {
        let lower = content.to_lowercase();
        for group in &self.groups {
            if !group.iter().any(|kw| lower.contains(kw)) {
                return Err(format!("content mentions none of: {}", group.join(", ")));
            }
        }
        Ok(())
    }
}

/// Built-in predicate for `phase`.
pub fn default_predicate(phase: Phase) -> Box<dyn ContentPredicate> {
    let groups: Vec<Vec<&'static str>> = match phase {
        Phase::Planning => vec![vec!["plan", "step", "approach", "goal", "milestone"]],
        Phase::AuditInventory => vec![
            vec!["audit", "inventory"],
            vec!["change", "modif", "file"],
        ],
        Phase::CompareAnalyze => vec![vec![
            "compar",
            "analy",
            "trade-off",
            "tradeoff",
            "versus",
            "option",
            "alternative",
        ]],
        Phase::QuestionDetermine => vec![vec![
            "question", "decision", "decide", "determin", "answer", "clarif", "assum",
        ]],
        Phase::WriteOrRefactor => vec![vec![
            "refactor",
            "implement",
            "change",
            "modif",
            "wrote",
            "written",
            "add",
            "updat",
            "remov",
            "rename",
            "extract",
            "diff",
        ]],
        Phase::Test => vec![
            vec!["test"],
            vec!["pass", "fail", "run", "result", "execut"],
        ],
        Phase::Lint => vec![vec![
            "lint", "clippy", "eslint", "warning", "format", "style", "check",
        ]],
        Phase::Iterate => vec![vec!["iterat", "fix", "address", "resolv", "revis", "retry"]],
        Phase::Present => vec![vec!["summar", "result", "complete", "overview", "changes"]],
        Phase::UserInputRequired => return Box::new(AcceptAll),
    };
    Box::new(KeywordPredicate::new(groups))
}
