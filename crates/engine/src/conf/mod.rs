//! Conf module — configuration model and loading.

pub mod load;
pub mod model;

pub use load::ConfigError;
pub use model::{AnalyzerConfig, BotConfig, LogOutput, LoggingConfig};
