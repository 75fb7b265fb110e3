//! tokenlint: rule-based static analysis over C/C++ token streams
//!
//! Source text is lexed into an arena of tokens, a lightweight resolver
//! attaches variable, function and scope facts, and an ordered set of rules
//! walks the result reporting findings.

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod reporter;
pub mod rules;
pub mod suppression;
pub mod symbols;
pub mod tokens;

pub use config::Config;
pub use engine::{AnalysisContext, Engine};
pub use rules::registry::RuleSet;
pub use rules::{Category, Diagnostic, Rule, Severity};

use std::path::Path;

/// Run analysis on a file or project directory with the built-in rules
pub fn analyze(path: &Path, config: &Config) -> anyhow::Result<Vec<Diagnostic>> {
    let engine = Engine::new(config);
    engine.analyze(path)
}

/// Run the built-in rules over source text that is already in memory.
pub fn analyze_source(path: &Path, source: &str, config: &Config) -> Vec<Diagnostic> {
    engine::analyze_source(path, source, config, &RuleSet::builtin())
}
