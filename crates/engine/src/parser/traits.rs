pub use super::model::{FailureReason, LogLayout, Record};

pub trait FormatDetector: Send + Sync {
    /// Whether the line fits this layout's grammar.
    fn matches(&self, line: &[u8]) -> bool;
    fn layout(&self) -> LogLayout;
}

pub trait LogParser: Send + Sync {
    /// parse a raw log line into a structured record
    fn parse(&self, line_number: u64, raw: &[u8]) -> Result<Record, FailureReason>;
    fn layout(&self) -> LogLayout;
}
