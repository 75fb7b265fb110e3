//! Per-file analysis shared by the engine and the library entry points.
//!
//! This module provides TOCTOU-safe file reading and the
//! tokenize → resolve → run pipeline for a single translation unit.

use super::context::AnalysisContext;
use super::runner::run_rules;
use crate::discovery::MAX_FILE_SIZE;
use crate::error::{Error, Result};
use crate::rules::registry::RuleSet;
use crate::rules::{Diagnostic, DiagnosticSink};
use crate::suppression::SuppressionExtractor;
use crate::symbols::resolve;
use crate::tokens::tokenize;
use crate::Config;
use std::any::Any;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Extract a human-readable message from a panic payload.
///
/// Panic payloads can be String, &str, or other types.
pub(crate) fn extract_panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }

    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }

    "(unknown panic payload)".to_string()
}

/// Read a file with TOCTOU-safe handling.
///
/// Opens the file, validates metadata from the file descriptor,
/// and returns the file content. This prevents race conditions
/// where the file could be replaced between check and read.
pub fn read_file_secure(file_path: &Path) -> Result<String> {
    // SECURITY: open once, verify via fd metadata, then read from same fd
    let mut file = File::open(file_path).map_err(|e| Error::io(file_path, e))?;
    let metadata = file.metadata().map_err(|e| Error::io(file_path, e))?;

    if !metadata.is_file() {
        return Err(Error::io(
            file_path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    if metadata.len() > MAX_FILE_SIZE {
        return Err(Error::io(
            file_path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "file too large: {} bytes (max: {} bytes)",
                    metadata.len(),
                    MAX_FILE_SIZE
                ),
            ),
        ));
    }

    // C sources are not guaranteed to be UTF-8; Latin-1 comments are common
    let mut bytes = Vec::with_capacity(metadata.len() as usize);
    file.read_to_end(&mut bytes)
        .map_err(|e| Error::io(file_path, e))?;

    Ok(match String::from_utf8(bytes) {
        Ok(source) => source,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Sink that drops findings silenced by inline comments.
struct SuppressingSink<'a> {
    suppressions: &'a SuppressionExtractor,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for SuppressingSink<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        if !self
            .suppressions
            .is_suppressed(diagnostic.rule_id, diagnostic.line)
        {
            self.diagnostics.push(diagnostic);
        }
    }
}

/// Analyze one translation unit already in memory.
///
/// Never fails: a panic while tokenizing or resolving is logged and the
/// unit yields no findings.
pub fn analyze_source(
    file_path: &Path,
    source: &str,
    config: &Config,
    rules: &RuleSet,
) -> Vec<Diagnostic> {
    let unit = std::panic::catch_unwind(|| {
        let mut tokens = tokenize(source);
        let symbols = resolve(&mut tokens);
        (tokens, symbols)
    });
    let (tokens, symbols) = match unit {
        Ok(unit) => unit,
        Err(payload) => {
            tracing::warn!(
                path = %file_path.display(),
                "failed to build token model: {}",
                extract_panic_message(&payload)
            );
            return Vec::new();
        }
    };

    tracing::debug!(
        path = %file_path.display(),
        tokens = tokens.len(),
        scopes = symbols.scopes().len(),
        functions = symbols.functions().len(),
        "analyzing"
    );

    let ctx = AnalysisContext::new(file_path, source, &tokens, &symbols, config);
    let suppressions = SuppressionExtractor::new(source);
    let mut sink = SuppressingSink {
        suppressions: &suppressions,
        diagnostics: Vec::new(),
    };
    run_rules(&ctx, rules, &mut sink);
    sink.diagnostics
}

/// Read and analyze a single file with a given set of rules.
pub fn analyze_file_with_rules(
    file_path: &Path,
    config: &Config,
    rules: &RuleSet,
) -> Result<Vec<Diagnostic>> {
    let source = read_file_secure(file_path)?;
    Ok(analyze_source(file_path, &source, config, rules))
}
