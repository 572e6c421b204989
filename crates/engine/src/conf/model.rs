//! Model — AnalyzerConfig and related structs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parser::LogLayout;
use crate::pipeline::ParsingPipeline;
use crate::stats::{BotCategory, BotClassifier, StatisticsEngine, DEFAULT_TOP_N};

use super::load::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub layout: LogLayout,
    /// 0 means one worker per available core.
    pub workers: usize,
    pub top_n: usize,
    pub logging: LoggingConfig,
    pub bots: BotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `engine=debug,cli=info`.
    pub level: String,
    pub format: LogOutput,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    #[default]
    Pretty,
    Json,
}

/// Extra user-agent keywords per bot category, on top of the built-in lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Category name (e.g. `"monitoring"`) → keywords.
    pub extra_keywords: BTreeMap<String, Vec<String>>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            layout: LogLayout::Extended,
            workers: 0,
            top_n: DEFAULT_TOP_N,
            logging: LoggingConfig::default(),
            bots: BotConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogOutput::Pretty,
        }
    }
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (category, keywords) in &self.extra_keywords {
            category
                .parse::<BotCategory>()
                .map_err(ConfigError::Invalid)?;
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "bots.extra_keywords.{} contains an empty keyword",
                    category
                )));
            }
        }
        Ok(())
    }
}

impl AnalyzerConfig {
    /// A parsing pipeline with the configured layout and worker count.
    pub fn pipeline(&self) -> ParsingPipeline {
        ParsingPipeline::new(self.layout).with_workers(self.workers)
    }

    /// A classifier with the built-in keyword groups plus any extras.
    pub fn classifier(&self) -> Result<BotClassifier, ConfigError> {
        let classifier = BotClassifier::new();
        for (category, keywords) in &self.bots.extra_keywords {
            let category = category
                .parse::<BotCategory>()
                .map_err(ConfigError::Invalid)?;
            for keyword in keywords {
                classifier.add_keyword(category, keyword);
            }
        }
        Ok(classifier)
    }

    pub fn statistics_engine(&self) -> Result<StatisticsEngine, ConfigError> {
        Ok(StatisticsEngine::with_top_n(self.top_n).with_classifier(self.classifier()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.layout, LogLayout::Extended);
        assert_eq!(config.workers, 0);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogOutput::Pretty);
        assert!(config.bots.extra_keywords.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AnalyzerConfig = toml::from_str(
            r#"
            layout = "basic"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.layout, LogLayout::Basic);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.logging.format, LogOutput::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_classifier_includes_extra_keywords() {
        let mut config = AnalyzerConfig::default();
        config
            .bots
            .extra_keywords
            .insert("monitoring".to_string(), vec!["HealthCheck".to_string()]);

        let classifier = config.classifier().unwrap();
        assert_eq!(
            classifier.inspect("kube-healthcheck/1.0").category,
            Some(BotCategory::Monitoring)
        );
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let mut config = AnalyzerConfig::default();
        config
            .bots
            .extra_keywords
            .insert("robots".to_string(), vec!["x".to_string()]);
        assert!(matches!(config.classifier(), Err(ConfigError::Invalid(_))));
        assert!(config.bots.validate().is_err());
    }

    #[test]
    fn test_pipeline_uses_configured_workers() {
        let config = AnalyzerConfig {
            workers: 3,
            layout: LogLayout::Basic,
            ..Default::default()
        };
        let pipeline = config.pipeline();
        assert_eq!(pipeline.workers(), 3);
        assert_eq!(pipeline.layout(), LogLayout::Basic);
    }
}
