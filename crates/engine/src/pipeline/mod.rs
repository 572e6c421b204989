//! Pipeline — concurrent parse of one access-log file.
//!
//! One dispatcher (the calling thread) reads lines and feeds a bounded work
//! queue; a pool of worker threads parses them and feeds a bounded results
//! queue; a single collector thread owns every total and the failure
//! sample. Shutdown is by disconnect: the dispatcher drops the work sender,
//! workers exit when the queue drains, and the results queue disconnects
//! once the last worker is gone.
//!
//! Records arrive in completion order, not file order. Use
//! [`ParseOutcome::records_in_file_order`] when line order matters.

mod collector;
mod memory;
pub mod validate;
mod worker;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::parser::{AccessLogParser, LogLayout, ParseFailure, Record};
use crate::source::{LineSource, RawLine, SourceError};

use self::collector::Collector;

pub use self::validate::{detect_file_layout, validate_first_line, validate_format};

/// Files above this size are refused before any work starts.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024 * 1024; // 10 GiB
/// Failed lines kept for diagnostics; later failures are only counted.
pub const MAX_FAILURE_SAMPLES: usize = 100;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File too large: {path} is {size} bytes (limit {limit})")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),

    #[error("First line of {path} does not match the {layout} layout")]
    FormatMismatch { path: PathBuf, layout: LogLayout },

    #[error(transparent)]
    Read(SourceError),
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(path) => PipelineError::NotFound(path),
            SourceError::Io { path, source } => PipelineError::Io { path, source },
            other => PipelineError::Read(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Reading,
    Draining,
    Completed,
    Failed,
}

impl PipelineState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PipelineState::Reading,
            2 => PipelineState::Draining,
            3 => PipelineState::Completed,
            4 => PipelineState::Failed,
            _ => PipelineState::Idle,
        }
    }
}

/// Everything one parse run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    /// Parsed records in arrival order.
    pub records: Vec<Record>,
    pub total_lines: u64,
    pub parsed_lines: u64,
    pub error_lines: u64,
    /// The first failures seen, at most [`MAX_FAILURE_SAMPLES`].
    pub failure_samples: Vec<ParseFailure>,
    pub elapsed: Duration,
    pub throughput_mb_s: f64,
    /// Resident memory after minus before. Informational only.
    pub memory_delta_bytes: i64,
    /// Set when reading stopped early on an I/O error.
    pub read_warning: Option<String>,
    pub cancelled: bool,
    pub workers: usize,
    pub layout: LogLayout,
    pub file_size: u64,
}

impl ParseOutcome {
    /// Records re-sorted by their source line number.
    pub fn records_in_file_order(&self) -> Vec<&Record> {
        let mut ordered: Vec<&Record> = self.records.iter().collect();
        ordered.sort_by_key(|r| r.line_number);
        ordered
    }

    /// Failed lines as a percentage of all lines read.
    pub fn error_rate(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        self.error_lines as f64 / self.total_lines as f64 * 100.0
    }

    /// Whether every line in the file was read.
    pub fn is_complete(&self) -> bool {
        self.read_warning.is_none() && !self.cancelled
    }
}

/// How the dispatcher stopped.
#[derive(Debug, Default)]
struct DispatchEnd {
    read_warning: Option<String>,
    cancelled: bool,
}

#[derive(Debug)]
pub struct ParsingPipeline {
    layout: LogLayout,
    workers: usize,
    max_file_size: u64,
    cancel: Option<CancellationToken>,
    state: AtomicU8,
}

impl ParsingPipeline {
    pub fn new(layout: LogLayout) -> Self {
        Self {
            layout,
            workers: default_workers(),
            max_file_size: MAX_FILE_SIZE,
            cancel: None,
            state: AtomicU8::new(PipelineState::Idle as u8),
        }
    }

    /// Worker thread count; 0 means one per available core.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { default_workers() } else { workers };
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Stop reading when the token is cancelled; the partial outcome is
    /// returned with `cancelled` set.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn layout(&self) -> LogLayout {
        self.layout
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Parse a file, taking its size from the filesystem.
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<ParseOutcome, PipelineError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            self.set_state(PipelineState::Failed);
            SourceError::io(path, e)
        })?;
        self.parse_file(path, metadata.len())
    }

    /// Parse `path`, whose size the caller already knows.
    pub fn parse_file(&self, path: impl AsRef<Path>, file_size: u64) -> Result<ParseOutcome, PipelineError> {
        let path = path.as_ref();

        if file_size > self.max_file_size {
            self.set_state(PipelineState::Failed);
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size: file_size,
                limit: self.max_file_size,
            });
        }

        let mut source = LineSource::open(path).map_err(|e| {
            self.set_state(PipelineState::Failed);
            PipelineError::from(e)
        })?;

        info!(
            file = %path.display(),
            size = file_size,
            workers = self.workers,
            layout = %self.layout,
            "Parsing access log"
        );

        let memory_before = memory::resident_bytes();
        let started = Instant::now();
        self.set_state(PipelineState::Reading);

        let parser = AccessLogParser::new(self.layout);
        let capacity = self.workers * 2;
        let (work_tx, work_rx) = bounded::<RawLine>(capacity);
        let (result_tx, result_rx) = bounded(capacity);

        let (totals, end) = thread::scope(|scope| {
            for _ in 0..self.workers {
                let lines = work_rx.clone();
                let results = result_tx.clone();
                scope.spawn(move || worker::run(&parser, lines, results));
            }
            // Only the workers hold these now, so disconnect follows them.
            drop(work_rx);
            drop(result_tx);

            let collector = scope.spawn(move || Collector::new(MAX_FAILURE_SAMPLES).run(result_rx));

            let end = self.dispatch(&mut source, work_tx);
            self.set_state(PipelineState::Draining);

            match collector.join() {
                Ok(totals) => (totals, end),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        });

        source.close();

        let elapsed = started.elapsed();
        let throughput_mb_s = if elapsed.as_secs_f64() > 0.0 {
            (file_size as f64 / BYTES_PER_MIB) / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let memory_delta_bytes = match (memory_before, memory::resident_bytes()) {
            (Some(before), Some(after)) => after as i64 - before as i64,
            _ => 0,
        };

        let outcome = ParseOutcome {
            records: totals.records,
            total_lines: totals.parsed_lines + totals.error_lines,
            parsed_lines: totals.parsed_lines,
            error_lines: totals.error_lines,
            failure_samples: totals.failure_samples,
            elapsed,
            throughput_mb_s,
            memory_delta_bytes,
            read_warning: end.read_warning,
            cancelled: end.cancelled,
            workers: self.workers,
            layout: self.layout,
            file_size,
        };

        self.set_state(PipelineState::Completed);

        info!(
            total = outcome.total_lines,
            parsed = outcome.parsed_lines,
            errors = outcome.error_lines,
            elapsed_ms = elapsed.as_millis() as u64,
            throughput_mb_s = outcome.throughput_mb_s,
            "Parsing complete"
        );

        Ok(outcome)
    }

    /// Feed lines to the workers until end of input, a read error, or
    /// cancellation. Dropping `work_tx` on return is what lets workers exit.
    fn dispatch(&self, source: &mut LineSource, work_tx: Sender<RawLine>) -> DispatchEnd {
        let mut end = DispatchEnd::default();

        loop {
            if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                warn!(
                    file = %source.path().display(),
                    lines_read = source.line_number(),
                    "Parsing cancelled"
                );
                end.cancelled = true;
                break;
            }

            match source.next_line() {
                Ok(Some(line)) => {
                    if work_tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        file = %source.path().display(),
                        error = %e,
                        "Read failed, keeping partial results"
                    );
                    end.read_warning = Some(e.to_string());
                    break;
                }
            }
        }

        debug!(lines = source.line_number(), "Dispatch finished");
        end
    }

    fn set_state(&self, state: PipelineState) {
        debug!(state = ?state, "Pipeline state");
        self.state.store(state as u8, Ordering::Release);
    }
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
