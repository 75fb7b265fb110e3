pub mod copy_rules;
pub mod internal_rules;
pub mod misc_rules;
pub mod registry;

use crate::engine::AnalysisContext;
use crate::symbols::{Function, Scope};
use crate::tokens::TokenId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity levels for diagnostics, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Style,
    Performance,
    #[default]
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Style => write!(f, "style"),
            Severity::Performance => write!(f, "performance"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "style" => Ok(Severity::Style),
            "performance" | "perf" => Ok(Severity::Performance),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "deny" => Ok(Severity::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl clap::ValueEnum for Severity {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Severity::Style,
            Severity::Performance,
            Severity::Warning,
            Severity::Error,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(match self {
            Severity::Style => "style",
            Severity::Performance => "performance",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }))
    }
}

/// Rule category; settings enable or disable whole categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Undefined or implementation-defined behaviour.
    Warning,
    Performance,
    /// Self-checks over uses of the pattern-matching API.
    Internal,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Warning => write!(f, "warning"),
            Category::Performance => write!(f, "performance"),
            Category::Internal => write!(f, "internal"),
        }
    }
}

/// A diagnostic reported by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule_id: &'static str,
    pub severity: Severity,
    /// `Title line.\nExplanation line(s).`
    pub message: String,
    pub file_path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// First line of the message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// Everything after the first message line.
    pub fn explanation(&self) -> Option<&str> {
        self.message.split_once('\n').map(|(_, rest)| rest)
    }
}

/// Receives findings as they are emitted.
///
/// Deduplication and formatting are the sink's business; the engine hands
/// over every finding exactly once, in emission order.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Which tokens a rule's [`Rule::check_token`] is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Body tokens of every defined function, shared with the other body
    /// rules: the first rule that reports on a token wins.
    FunctionBodies,
    /// Every token of the unit, independently of other rules.
    WholeUnit,
}

/// The Rule trait - implement this to add new checks.
///
/// A rule overrides whichever hooks it needs; the defaults report nothing.
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule (e.g., "float-equality")
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Description of what this rule checks
    fn description(&self) -> &'static str;

    fn category(&self) -> Category;

    /// Default severity level
    fn default_severity(&self) -> Severity;

    fn walk(&self) -> Walk {
        Walk::FunctionBodies
    }

    /// Inspect one token.
    fn check_token(&self, _ctx: &AnalysisContext, _tok: TokenId) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Inspect a defined function's signature, once per function.
    fn check_function(&self, _ctx: &AnalysisContext, _func: &Function) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Inspect a scope, once per scope in the unit.
    fn check_scope(&self, _ctx: &AnalysisContext, _scope: &Scope) -> Vec<Diagnostic> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Style < Severity::Performance);
        assert!(Severity::Performance < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("Performance".parse::<Severity>(), Ok(Severity::Performance));
        assert_eq!("deny".parse::<Severity>(), Ok(Severity::Error));
        assert!("info".parse::<Severity>().is_err());
    }

    #[test]
    fn test_message_parts() {
        let diag = Diagnostic {
            rule_id: "return-errno",
            severity: Severity::Warning,
            message: "Title.\nFirst.\nSecond.".to_string(),
            file_path: PathBuf::from("a.c"),
            line: 1,
            column: 1,
            suggestion: None,
        };
        assert_eq!(diag.title(), "Title.");
        assert_eq!(diag.explanation(), Some("First.\nSecond."));
    }

    #[test]
    fn test_vec_sink_preserves_order() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        for line in [3, 1, 2] {
            sink.report(Diagnostic {
                rule_id: "x",
                severity: Severity::Style,
                message: String::new(),
                file_path: PathBuf::new(),
                line,
                column: 1,
                suggestion: None,
            });
        }
        let lines: Vec<_> = sink.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![3, 1, 2]);
    }
}
