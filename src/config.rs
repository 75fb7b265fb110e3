use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Error;
use crate::rules::Category;
use crate::Severity;

/// Name of the per-project settings file.
pub const CONFIG_FILE_NAME: &str = "tokenlint.toml";

/// Maximum config file size (1 MB) - prevents memory exhaustion from malformed files
const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Rule categories to run. `internal` is opt-in.
    #[serde(default = "default_enable")]
    pub enable: Vec<Category>,

    #[serde(default)]
    pub rules: HashMap<String, RuleSeverity>,

    #[serde(default)]
    pub output: OutputConfig,
}

fn default_enable() -> Vec<Category> {
    vec![Category::Warning, Category::Performance]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable: default_enable(),
            rules: HashMap::new(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Deny,
    Warn,
    Allow,
}

impl From<RuleSeverity> for Option<Severity> {
    fn from(rs: RuleSeverity) -> Option<Severity> {
        match rs {
            RuleSeverity::Deny => Some(Severity::Error),
            RuleSeverity::Warn => Some(Severity::Warning),
            RuleSeverity::Allow => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_color")]
    pub color: String,
}

fn default_format() -> String {
    "console".to_string()
}

fn default_color() -> String {
    "auto".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color: default_color(),
        }
    }
}

impl Config {
    /// Load config from tokenlint.toml in the given path, or return default
    ///
    /// # Errors
    ///
    /// Returns an error if the path doesn't exist or if the config file
    /// exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }

        // If path is a file, use its parent directory for config lookup
        let dir_path = if path.is_file() {
            path.parent().unwrap_or(path)
        } else {
            path
        };

        let config_path = dir_path.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let metadata = std::fs::metadata(&config_path).map_err(|e| Error::io(&config_path, e))?;
        if metadata.len() > MAX_CONFIG_SIZE {
            anyhow::bail!(
                "Config file too large ({} bytes, max {} bytes): {}",
                metadata.len(),
                MAX_CONFIG_SIZE,
                config_path.display()
            );
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| Error::io(&config_path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::config(format!("{}: {}", config_path.display(), e)))?;

        config.validate_rule_ids();
        tracing::debug!(path = %config_path.display(), "loaded configuration");

        Ok(config)
    }

    /// Warn about configured rule IDs that no built-in rule has.
    fn validate_rule_ids(&self) {
        use crate::rules::registry;

        for rule_id in self.rules.keys() {
            if !registry::has_rule(rule_id) {
                tracing::warn!(
                    rule = %rule_id,
                    "unknown rule in {} (will be ignored)",
                    CONFIG_FILE_NAME
                );
            }
        }
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.enable.contains(&category)
    }

    /// Get the effective severity for a rule, `None` when it should not run.
    pub fn rule_severity(
        &self,
        rule_id: &str,
        category: Category,
        default: Severity,
    ) -> Option<Severity> {
        if !self.is_enabled(category) {
            return None;
        }
        match self.rules.get(rule_id) {
            Some(&configured) => configured.into(),
            None => Some(default),
        }
    }

    /// Generate default TOML config
    pub fn default_toml() -> &'static str {
        r#"# tokenlint configuration

# Rule categories to run: "warning", "performance", "internal"
enable = ["warning", "performance"]

[rules]
# Set rule severity: "deny" (error), "warn" (warning), "allow" (ignore)
# float-equality = "deny"
# signed-bitwise-operand = "allow"
# complex-object-copying = "warn"

[output]
format = "console"  # "console", "json", "sarif"
color = "auto"      # "auto", "always", "never"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.rules.is_empty());
        assert!(config.is_enabled(Category::Warning));
        assert!(config.is_enabled(Category::Performance));
        assert!(!config.is_enabled(Category::Internal));
        assert_eq!(config.output.format, "console");
        assert_eq!(config.output.color, "auto");
    }

    #[test]
    fn test_default_toml_parses_to_default() {
        let config: Config = toml::from_str(Config::default_toml()).unwrap();
        assert_eq!(config.enable, Config::default().enable);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_rule_severity_default() {
        let config = Config::default();
        assert_eq!(
            config.rule_severity("float-equality", Category::Warning, Severity::Warning),
            Some(Severity::Warning)
        );
    }

    #[test]
    fn test_disabled_category_skips_rule() {
        let config = Config::default();
        assert_eq!(
            config.rule_severity("simple-pattern", Category::Internal, Severity::Warning),
            None
        );
    }

    #[test]
    fn test_rule_severity_deny_and_allow() {
        let mut config = Config::default();
        config.rules.insert("a".to_string(), RuleSeverity::Deny);
        config.rules.insert("b".to_string(), RuleSeverity::Allow);
        assert_eq!(
            config.rule_severity("a", Category::Performance, Severity::Performance),
            Some(Severity::Error)
        );
        assert_eq!(config.rule_severity("b", Category::Warning, Severity::Warning), None);
    }

    #[test]
    fn test_load_or_default_nonexistent_path() {
        let result = Config::load_or_default(Path::new("/nonexistent/path"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(tmp.path()).unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_load_or_default_with_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_content = r#"
enable = ["warning", "internal"]

[rules]
float-equality = "deny"
return-errno = "allow"
"#;
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), config_content).unwrap();

        let config = Config::load_or_default(tmp.path()).unwrap();
        assert!(config.is_enabled(Category::Internal));
        assert!(!config.is_enabled(Category::Performance));
        assert_eq!(
            config.rule_severity("float-equality", Category::Warning, Severity::Warning),
            Some(Severity::Error)
        );
        assert_eq!(
            config.rule_severity("return-errno", Category::Warning, Severity::Warning),
            None
        );
    }

    #[test]
    fn test_load_or_default_with_file_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[rules]\ncomplex-object-copying = \"warn\"\n",
        )
        .unwrap();
        let file_path = tmp.path().join("main.cpp");
        std::fs::write(&file_path, "").unwrap();

        // Should find config from parent directory when given a file
        let config = Config::load_or_default(&file_path).unwrap();
        assert_eq!(
            config.rule_severity("complex-object-copying", Category::Performance, Severity::Performance),
            Some(Severity::Warning)
        );
    }

    #[test]
    fn test_load_invalid_config() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "invalid { toml").unwrap();
        let err = Config::load_or_default(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result: Result<Config, _> = toml::from_str("enable = [\"portability\"]");
        assert!(result.is_err());
    }
}
