//! Quick format checks over the head of a file, used before committing to
//! a full parse.

use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use super::PipelineError;
use crate::parser::{AccessLogParser, FormatDetector, LayoutDetector, LogLayout, SampleReport};
use crate::source::LineSource;

/// Check whether at least 80 % of the first `sample_lines` lines fit `layout`.
pub fn validate_format(
    path: impl AsRef<Path>,
    layout: LogLayout,
    sample_lines: usize,
) -> Result<SampleReport, PipelineError> {
    let path = path.as_ref();
    let mut source = LineSource::open(path)?;
    let sample = read_sample(&mut source, sample_lines)?;
    source.close();

    if sample.is_empty() {
        return Err(PipelineError::EmptyFile(path.to_path_buf()));
    }

    let refs: Vec<&[u8]> = sample.iter().map(|b| b.as_ref()).collect();
    let report = LayoutDetector::new().score(layout, &refs);
    debug!(
        file = %path.display(),
        layout = %layout,
        matched = report.matched,
        sampled = report.sampled,
        "Format validated"
    );
    Ok(report)
}

/// Fail fast when the first line does not fit `layout`.
pub fn validate_first_line(path: impl AsRef<Path>, layout: LogLayout) -> Result<(), PipelineError> {
    let path = path.as_ref();
    let mut source = LineSource::open(path)?;
    let first = source.next_line()?;
    source.close();

    let Some(first) = first else {
        return Err(PipelineError::EmptyFile(path.to_path_buf()));
    };

    if AccessLogParser::new(layout).matches(&first.text) {
        Ok(())
    } else {
        Err(PipelineError::FormatMismatch {
            path: path.to_path_buf(),
            layout,
        })
    }
}

/// Pick the layout most of the first `sample_lines` lines fit, then rewind
/// and score that layout over the same prefix.
pub fn detect_file_layout(path: impl AsRef<Path>, sample_lines: usize) -> Result<SampleReport, PipelineError> {
    let path = path.as_ref();
    let mut source = LineSource::open(path)?;
    let detector = LayoutDetector::new();

    let layout = {
        let sample = read_sample(&mut source, sample_lines)?;
        if sample.is_empty() {
            return Err(PipelineError::EmptyFile(path.to_path_buf()));
        }
        let refs: Vec<&[u8]> = sample.iter().map(|b| b.as_ref()).collect();
        detector.detect_multi(&refs)
    };

    source.reset()?;
    let sample = read_sample(&mut source, sample_lines)?;
    source.close();

    let refs: Vec<&[u8]> = sample.iter().map(|b| b.as_ref()).collect();
    let report = detector.score(layout, &refs);
    debug!(
        file = %path.display(),
        layout = %layout,
        ratio = report.ratio,
        "Layout detected"
    );
    Ok(report)
}

fn read_sample(source: &mut LineSource, limit: usize) -> Result<Vec<Bytes>, PipelineError> {
    let mut sample = Vec::with_capacity(limit.min(1024));
    while sample.len() < limit {
        match source.next_line()? {
            Some(line) => sample.push(line.text),
            None => break,
        }
    }
    Ok(sample)
}
