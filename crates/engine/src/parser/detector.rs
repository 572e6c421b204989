use serde::Serialize;

use super::formats::AccessLogParser;
use super::traits::*;
use super::VALIDATION_THRESHOLD;

/// Layout detector over the fixed grammars.
/// 1. Single line: first grammar that matches wins (extended before basic)
/// 2. Multi-line: majority vote over the per-line verdicts
/// 3. Scoring: how many sampled lines a given layout accepts
pub struct LayoutDetector {
    detectors: Vec<Box<dyn FormatDetector>>,
}

impl LayoutDetector {
    pub fn new() -> Self {
        let detectors: Vec<Box<dyn FormatDetector>> = vec![
            // Order matters! Every extended line also fits the basic grammar
            Box::new(AccessLogParser::new(LogLayout::Extended)),
            Box::new(AccessLogParser::new(LogLayout::Basic)),
        ];

        Self { detectors }
    }

    /// The first layout whose grammar accepts the line, if any.
    pub fn detect_single(&self, line: &[u8]) -> Option<LogLayout> {
        self.detectors
            .iter()
            .find(|d| d.matches(line))
            .map(|d| d.layout())
    }

    /// Majority vote over the sampled lines. Lines no grammar accepts do not
    /// vote; ties and an empty vote fall back to extended.
    pub fn detect_multi(&self, samples: &[&[u8]]) -> LogLayout {
        let mut extended = 0usize;
        let mut basic = 0usize;

        for sample in samples {
            match self.detect_single(sample) {
                Some(LogLayout::Extended) => extended += 1,
                Some(LogLayout::Basic) => basic += 1,
                None => {}
            }
        }

        if basic > extended {
            LogLayout::Basic
        } else {
            LogLayout::Extended
        }
    }

    /// Count how many of the samples `layout` accepts.
    pub fn score(&self, layout: LogLayout, samples: &[&[u8]]) -> SampleReport {
        let grammar = AccessLogParser::new(layout);
        let matched = samples.iter().filter(|s| grammar.matches(s)).count();
        SampleReport::new(layout, samples.len(), matched)
    }
}

impl Default for LayoutDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-line detection: extended first, then basic, else extended.
pub fn detect_layout(line: &[u8]) -> LogLayout {
    LayoutDetector::new().detect_single(line).unwrap_or_default()
}

/// Result of checking a layout against a sample of lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub layout: LogLayout,
    pub sampled: usize,
    pub matched: usize,
    /// `matched / sampled`, 0 for an empty sample.
    pub ratio: f64,
    /// Whether the ratio reaches the validation threshold.
    pub valid: bool,
}

impl SampleReport {
    pub fn new(layout: LogLayout, sampled: usize, matched: usize) -> Self {
        let ratio = if sampled == 0 {
            0.0
        } else {
            matched as f64 / sampled as f64
        };
        Self {
            layout,
            sampled,
            matched,
            ratio,
            valid: sampled > 0 && ratio >= VALIDATION_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENDED: &[u8] = b"127.0.0.1 - - [01/Jan/2024:00:00:00 +0000] \"GET /index.html HTTP/1.1\" 200 1024 \"-\" \"Mozilla/5.0\"";
    const BASIC: &[u8] = b"127.0.0.1 - - [01/Jan/2024:00:00:00 +0000] \"GET /index.html HTTP/1.1\" 200 1024";
    const JUNK: &[u8] = b"this is not an access log";

    #[test]
    fn test_detect_layout_single_line() {
        assert_eq!(detect_layout(EXTENDED), LogLayout::Extended);
        assert_eq!(detect_layout(BASIC), LogLayout::Basic);
        assert_eq!(detect_layout(JUNK), LogLayout::Extended);
    }

    #[test]
    fn test_detect_single_reports_no_match() {
        let detector = LayoutDetector::new();
        assert_eq!(detector.detect_single(JUNK), None);
    }

    #[test]
    fn test_majority_vote() {
        let detector = LayoutDetector::new();
        assert_eq!(
            detector.detect_multi(&[BASIC, BASIC, EXTENDED, JUNK]),
            LogLayout::Basic
        );
        assert_eq!(
            detector.detect_multi(&[EXTENDED, EXTENDED, BASIC]),
            LogLayout::Extended
        );
    }

    #[test]
    fn test_majority_vote_tie_prefers_extended() {
        let detector = LayoutDetector::new();
        assert_eq!(detector.detect_multi(&[BASIC, EXTENDED]), LogLayout::Extended);
        assert_eq!(detector.detect_multi(&[]), LogLayout::Extended);
        assert_eq!(detector.detect_multi(&[JUNK, JUNK]), LogLayout::Extended);
    }

    #[test]
    fn test_score_threshold() {
        let detector = LayoutDetector::new();

        let mut samples = vec![EXTENDED; 8];
        samples.extend([JUNK, JUNK]);
        let report = detector.score(LogLayout::Extended, &samples);
        assert_eq!(report.matched, 8);
        assert!((report.ratio - 0.8).abs() < f64::EPSILON);
        assert!(report.valid);

        samples.push(JUNK);
        assert!(!detector.score(LogLayout::Extended, &samples).valid);
    }

    #[test]
    fn test_basic_accepts_extended_lines() {
        let detector = LayoutDetector::new();
        let report = detector.score(LogLayout::Basic, &[EXTENDED, BASIC]);
        assert_eq!(report.matched, 2);
        assert!(!detector.score(LogLayout::Extended, &[BASIC]).valid);
    }

    #[test]
    fn test_empty_sample_is_not_valid() {
        let report = SampleReport::new(LogLayout::Basic, 0, 0);
        assert_eq!(report.ratio, 0.0);
        assert!(!report.valid);
    }
}
