/// Access-log line parsing
///
/// Turns one raw access-log line into a structured [`Record`] or a
/// [`ParseFailure`] explaining why the line was rejected.
///
/// # Architecture
///
/// - `traits.rs`: Core traits for layout detection and parsing
/// - `model.rs`: Layouts, records, failure reasons
/// - `formats/`: Grammar implementation for the two fixed layouts
/// - `detector.rs`: Layout auto-detection and sample validation
/// - `timestamp.rs`: `[day/Mon/year:h:m:s zone]` timestamp handling
///
/// # Safety Guarantees
///
/// - Binary safety (non-UTF8 bytes are replaced, never rejected outright)
/// - Line size limits enforced by the line source

pub mod traits;
pub mod model;
pub mod formats;
pub mod detector;
pub mod timestamp;

// Re-export commonly used types
pub use traits::{FormatDetector, LogParser};
pub use model::{FailureReason, LogLayout, ParseFailure, Record, RecordValidationError};
pub use formats::AccessLogParser;
pub use detector::{detect_layout, LayoutDetector, SampleReport};

// Constants
pub const MAX_LINE_SIZE: usize = 1_048_576; // 1MB
pub const VALIDATION_SAMPLE_SIZE: usize = 100; // Lines sampled for quick validation
pub const VALIDATION_THRESHOLD: f64 = 0.80;
