//! Load — config loading from file and environment variables.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::AnalyzerConfig;

pub const DEFAULT_CONFIG_FILE: &str = "analyzer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AnalyzerConfig {
    /// Load configuration from file and environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with a custom variable lookup.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config_path = env("ANALYZER_CONFIG_FILE").unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", config_path);
            Self::default()
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overlaid with whatever environment variables are set
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(layout) = env("ANALYZER_LAYOUT") {
            self.layout = layout
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("ANALYZER_LAYOUT: {}", e)))?;
        }
        if let Some(workers) = env("ANALYZER_WORKERS") {
            self.workers = parse_number("ANALYZER_WORKERS", &workers)?;
        }
        if let Some(top_n) = env("ANALYZER_TOP_N") {
            self.top_n = parse_number("ANALYZER_TOP_N", &top_n)?;
        }
        if let Some(level) = env("ANALYZER_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Check that configuration values are sane
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be > 0".to_string()));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must not be empty".to_string()));
        }
        self.bots.validate()
    }
}

fn parse_number(name: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} must be a non-negative integer, got '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LogLayout;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    // ── Sources ─────────────────────────────────────────────────

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AnalyzerConfig::load_with(env_of(&[(
            "ANALYZER_CONFIG_FILE",
            "/definitely/not/analyzer.toml",
        )]))
        .unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn test_file_values_are_loaded() {
        let file = config_file(
            r#"
            layout = "basic"
            workers = 2
            top_n = 5

            [bots.extra_keywords]
            "seo tool" = ["rankbot"]
            "#,
        );
        let path = file.path().to_string_lossy().to_string();
        let config = AnalyzerConfig::load_with(env_of(&[("ANALYZER_CONFIG_FILE", path.as_str())])).unwrap();

        assert_eq!(config.layout, LogLayout::Basic);
        assert_eq!(config.workers, 2);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.bots.extra_keywords["seo tool"], vec!["rankbot".to_string()]);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = config_file("layout = \"basic\"\ntop_n = 5\n");
        let path = file.path().to_string_lossy().to_string();
        let config = AnalyzerConfig::load_with(env_of(&[
            ("ANALYZER_CONFIG_FILE", path.as_str()),
            ("ANALYZER_LAYOUT", "combined"),
            ("ANALYZER_TOP_N", "20"),
            ("ANALYZER_WORKERS", "8"),
            ("ANALYZER_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.layout, LogLayout::Extended);
        assert_eq!(config.top_n, 20);
        assert_eq!(config.workers, 8);
        assert_eq!(config.logging.level, "debug");
    }

    // ── Errors ──────────────────────────────────────────────────

    #[test]
    fn test_bad_toml_is_parse_error() {
        let file = config_file("top_n = \"many\"");
        assert!(matches!(
            AnalyzerConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_bad_env_values() {
        let missing = ("ANALYZER_CONFIG_FILE", "/definitely/not/analyzer.toml");
        assert!(matches!(
            AnalyzerConfig::load_with(env_of(&[missing, ("ANALYZER_WORKERS", "lots")])),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AnalyzerConfig::load_with(env_of(&[missing, ("ANALYZER_LAYOUT", "json")])),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AnalyzerConfig::load_with(env_of(&[missing, ("ANALYZER_TOP_N", "0")])),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_bot_category_fails_validation() {
        let file = config_file("[bots.extra_keywords]\nrobots = [\"x\"]\n");
        let path = file.path().to_string_lossy().to_string();
        assert!(matches!(
            AnalyzerConfig::load_with(env_of(&[("ANALYZER_CONFIG_FILE", path.as_str())])),
            Err(ConfigError::Invalid(_))
        ));
    }
}
