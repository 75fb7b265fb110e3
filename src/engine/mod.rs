//! Analysis engine - coordinates file discovery and rule execution.

mod context;
mod file_analyzer;
mod runner;

pub use context::AnalysisContext;
pub use file_analyzer::{analyze_file_with_rules, analyze_source, read_file_secure};
pub use runner::run_rules;

use crate::discovery::{discover_sources, DiscoveryOptions};
use crate::rules::registry::RuleSet;
use crate::rules::Diagnostic;
use crate::Config;
use anyhow::{bail, Result};
use rayon::prelude::*;
use std::path::Path;

enum Rules<'a> {
    Builtin(RuleSet),
    Borrowed(&'a RuleSet),
}

impl Rules<'_> {
    fn get(&self) -> &RuleSet {
        match self {
            Rules::Builtin(rules) => rules,
            Rules::Borrowed(rules) => rules,
        }
    }
}

pub struct Engine<'a> {
    config: &'a Config,
    rules: Rules<'a>,
}

impl<'a> Engine<'a> {
    /// Engine running the built-in rules.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            rules: Rules::Builtin(RuleSet::builtin()),
        }
    }

    /// Engine running a caller-composed rule set.
    pub fn with_rules(config: &'a Config, rules: &'a RuleSet) -> Self {
        Self {
            config,
            rules: Rules::Borrowed(rules),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        self.rules.get()
    }

    /// Analyze a file or every C/C++ source under a directory.
    ///
    /// Files are analyzed in parallel; findings come back grouped by file in
    /// discovery order. A file that cannot be read is logged and skipped.
    pub fn analyze(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        if !path.exists() {
            bail!("path does not exist: {}", path.display());
        }

        let files = discover_sources(path, &DiscoveryOptions::secure());
        tracing::debug!(files = files.len(), "discovered sources");

        let rules = self.rules.get();
        let results: Vec<_> = files
            .par_iter()
            .map(|file| (file, analyze_file_with_rules(file, self.config, rules)))
            .collect();

        let mut all_diagnostics = Vec::new();
        for (file, result) in results {
            match result {
                Ok(diagnostics) => all_diagnostics.extend(diagnostics),
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "failed to analyze file");
                }
            }
        }

        Ok(all_diagnostics)
    }

    /// Analyze source text that is already in memory.
    pub fn analyze_source(&self, file_path: &Path, source: &str) -> Vec<Diagnostic> {
        analyze_source(file_path, source, self.config, self.rules.get())
    }
}
