// Domain-driven module structure for the access-log analytics engine.

// Ingestion
pub mod source;
pub mod parser;
pub mod pipeline;

// Analytics
pub mod stats;

// Configuration and tooling
pub mod conf;
pub mod generate;

pub use parser::{LogLayout, ParseFailure, FailureReason, Record};
pub use pipeline::{ParseOutcome, ParsingPipeline, PipelineError};
pub use source::{LineSource, RawLine, SourceError};
pub use stats::{BotClassifier, StatisticsEngine, StatisticsSnapshot, TopNSelector};
pub use conf::AnalyzerConfig;
