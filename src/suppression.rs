//! Inline suppression support for tokenlint diagnostics.
//!
//! Supports suppressing findings with comments:
//! - `// tokenlint-ignore: rule-a, rule-b` - those rules on the next line
//! - `// tokenlint-ignore` (or `: all`) - every rule on the next line
//! - `// tokenlint-ignore-file: rule-a` - a rule for the whole file
//!
//! `/* ... */` comments are honoured the same way.

use std::collections::{HashMap, HashSet};

const IGNORE_MARKER: &str = "tokenlint-ignore";
const FILE_SUFFIX: &str = "-file";

/// Extracts all tokenlint suppressions from a file.
#[derive(Debug, Default)]
pub struct SuppressionExtractor {
    /// Suppressed rule IDs by line; `"all"` suppresses everything.
    pub line_suppressions: HashMap<usize, HashSet<String>>,
    /// Suppressions that apply to the entire file.
    pub file_suppressions: HashSet<String>,
}

impl SuppressionExtractor {
    pub fn new(source: &str) -> Self {
        let mut extractor = Self::default();

        for (index, line) in source.lines().enumerate() {
            let line_num = index + 1;
            let Some(comment) = comment_text(line) else {
                continue;
            };
            let Some(idx) = comment.find(IGNORE_MARKER) else {
                continue;
            };
            let rest = &comment[idx + IGNORE_MARKER.len()..];

            let (target, rest) = match rest.strip_prefix(FILE_SUFFIX) {
                Some(rest) => (&mut extractor.file_suppressions, rest),
                // Suppress the *next* line
                None => (
                    extractor.line_suppressions.entry(line_num + 1).or_default(),
                    rest,
                ),
            };
            parse_rule_list(rest, target);
        }

        extractor
    }

    /// Check if a diagnostic at the given line should be suppressed.
    pub fn is_suppressed(&self, rule_id: &str, line: usize) -> bool {
        if self.file_suppressions.contains("all") || self.file_suppressions.contains(rule_id) {
            return true;
        }

        self.line_suppressions
            .get(&line)
            .is_some_and(|rules| rules.contains("all") || rules.contains(rule_id))
    }
}

/// Text of the comment on a line, if it carries one.
fn comment_text(line: &str) -> Option<&str> {
    let line_comment = line.find("//");
    let block_comment = line.find("/*");
    let start = match (line_comment, block_comment) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    let text = &line[start + 2..];
    Some(text.split("*/").next().unwrap_or(text))
}

fn parse_rule_list(rest: &str, target: &mut HashSet<String>) {
    let rest = rest.trim_start_matches(':').trim();
    if rest.is_empty() || rest == "all" {
        target.insert("all".to_string());
        return;
    }
    for rule in rest.split(',') {
        let rule = rule.trim();
        if !rule.is_empty() {
            target.insert(rule.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_suppression() {
        let source = r#"
void test(float x) {
    // tokenlint-ignore: float-equality
    if (x == 1.0) {}
}
"#;
        let extractor = SuppressionExtractor::new(source);

        assert!(extractor.is_suppressed("float-equality", 4));
        assert!(!extractor.is_suppressed("float-equality", 5));
        assert!(!extractor.is_suppressed("time-t-arithmetic", 4));
    }

    #[test]
    fn test_comment_suppression_all() {
        let source = "/* tokenlint-ignore */\nreturn errno;\n";
        let extractor = SuppressionExtractor::new(source);

        assert!(extractor.is_suppressed("return-errno", 2));
        assert!(extractor.is_suppressed("any-rule", 2));
    }

    #[test]
    fn test_multiple_rules() {
        let source = "// tokenlint-ignore: float-equality, time-t-arithmetic\nx;";
        let extractor = SuppressionExtractor::new(source);

        assert!(extractor.is_suppressed("float-equality", 2));
        assert!(extractor.is_suppressed("time-t-arithmetic", 2));
        assert!(!extractor.is_suppressed("return-errno", 2));
    }

    #[test]
    fn test_file_suppression() {
        let source = "// tokenlint-ignore-file: modify-std-namespace\n\nnamespace std {}\n";
        let extractor = SuppressionExtractor::new(source);

        assert!(extractor.is_suppressed("modify-std-namespace", 3));
        assert!(extractor.is_suppressed("modify-std-namespace", 300));
        assert!(!extractor.is_suppressed("float-equality", 3));
    }

    #[test]
    fn test_marker_outside_comment_is_ignored() {
        let source = "const char* s = \"tokenlint-ignore\";\nreturn errno;\n";
        let extractor = SuppressionExtractor::new(source);

        assert!(!extractor.is_suppressed("return-errno", 2));
    }

    #[test]
    fn test_no_suppression() {
        let extractor = SuppressionExtractor::new("int main() { return errno; }");
        assert!(!extractor.is_suppressed("return-errno", 1));
    }
}
