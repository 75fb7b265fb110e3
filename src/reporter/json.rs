use crate::rules::Diagnostic;
use anyhow::Result;

pub fn report(diagnostics: &[Diagnostic]) -> Result<()> {
    println!("{}", format(diagnostics)?);
    Ok(())
}

/// Format diagnostics as JSON string without printing.
pub fn format(diagnostics: &[Diagnostic]) -> Result<String> {
    Ok(serde_json::to_string_pretty(diagnostics)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;
    use std::path::PathBuf;

    fn test_diagnostic() -> Diagnostic {
        Diagnostic {
            rule_id: "return-errno",
            message: "Functions that return errno should change to a return type of errno_t.\nDetails."
                .to_string(),
            severity: Severity::Warning,
            file_path: PathBuf::from("test.cpp"),
            line: 10,
            column: 5,
            suggestion: Some("Declare the function as returning errno_t".to_string()),
        }
    }

    #[test]
    fn test_format_empty_diagnostics() {
        let result = format(&[]).unwrap();
        assert_eq!(result, "[]");
    }

    #[test]
    fn test_format_single_diagnostic() {
        let result = format(&[test_diagnostic()]).unwrap();

        assert!(result.contains(r#""rule_id": "return-errno""#));
        assert!(result.contains(r#"errno_t.\nDetails."#));
        assert!(result.contains(r#""severity": "warning""#));
        assert!(result.contains(r#""line": 10"#));
        assert!(result.contains(r#""column": 5"#));
        assert!(result.contains(r#""suggestion": "Declare the function as returning errno_t""#));
    }

    #[test]
    fn test_format_severities() {
        let mut perf = test_diagnostic();
        perf.severity = Severity::Performance;
        let mut style = test_diagnostic();
        style.severity = Severity::Style;
        style.suggestion = None;

        let result = format(&[perf, style]).unwrap();

        assert!(result.contains(r#""severity": "performance""#));
        assert!(result.contains(r#""severity": "style""#));
        assert!(result.contains(r#""suggestion": null"#));
    }

    #[test]
    fn test_format_is_valid_json() {
        let result = format(&[test_diagnostic()]).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert!(parsed.is_array());
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["file_path"], "test.cpp");
    }
}
