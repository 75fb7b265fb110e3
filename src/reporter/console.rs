use crate::rules::{Diagnostic, Severity};
use colored::{ColoredString, Colorize};

/// Print diagnostics for a terminal.
///
/// Only the title line of each message is shown unless `verbose` is set,
/// in which case the explanation follows indented.
pub fn report(diagnostics: &[Diagnostic], verbose: bool) {
    if diagnostics.is_empty() {
        println!("{}", "No issues found.".green());
        return;
    }

    for diagnostic in diagnostics {
        print_diagnostic(diagnostic, verbose);
    }

    let counts = count_by_severity(diagnostics);
    let parts: Vec<String> = [
        (counts.errors, Severity::Error),
        (counts.warnings, Severity::Warning),
        (counts.performance, Severity::Performance),
        (counts.style, Severity::Style),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, severity)| paint(severity, &format!("{} {}(s)", count, severity)).to_string())
    .collect();

    println!();
    println!("Found {}", parts.join(", "));
}

fn paint(severity: Severity, text: &str) -> ColoredString {
    match severity {
        Severity::Error => text.red(),
        Severity::Warning => text.yellow(),
        Severity::Performance => text.magenta(),
        Severity::Style => text.blue(),
    }
}

fn print_diagnostic(d: &Diagnostic, verbose: bool) {
    let severity_str = paint(d.severity, &d.severity.to_string()).bold();
    let rule_id = format!("[{}]", d.rule_id).dimmed();

    println!("{}{} {} {}", severity_str, ":".bold(), d.title(), rule_id);

    println!(
        "  {} {}:{}:{}",
        "-->".blue(),
        d.file_path.display(),
        d.line,
        d.column,
    );

    if verbose {
        if let Some(explanation) = d.explanation() {
            for line in explanation.lines() {
                println!("  {} {}", "=".blue(), line);
            }
        }
    }

    if let Some(suggestion) = &d.suggestion {
        println!("  {} {}", "help:".cyan(), suggestion);
    }

    println!();
}

/// Format a diagnostic as a plain text string (no colors) for testing.
#[cfg(test)]
fn format_diagnostic_plain(d: &Diagnostic, verbose: bool) -> String {
    let mut result = format!(
        "{}: {} [{}]\n  --> {}:{}:{}\n",
        d.severity,
        d.title(),
        d.rule_id,
        d.file_path.display(),
        d.line,
        d.column
    );

    if verbose {
        for line in d.explanation().into_iter().flat_map(str::lines) {
            result.push_str(&format!("  = {}\n", line));
        }
    }

    if let Some(suggestion) = &d.suggestion {
        result.push_str(&format!("  help: {}\n", suggestion));
    }

    result
}

/// Number of diagnostics at each severity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub performance: usize,
    pub style: usize,
}

/// Count diagnostics by severity.
pub fn count_by_severity(diagnostics: &[Diagnostic]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for d in diagnostics {
        match d.severity {
            Severity::Error => counts.errors += 1,
            Severity::Warning => counts.warnings += 1,
            Severity::Performance => counts.performance += 1,
            Severity::Style => counts.style += 1,
        }
    }
    counts
}
