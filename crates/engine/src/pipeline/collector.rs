use crossbeam_channel::Receiver;

use super::worker::WorkerMessage;
use crate::parser::{ParseFailure, Record};

/// Totals gathered by the collector over one run.
#[derive(Debug, Default)]
pub(super) struct Totals {
    pub records: Vec<Record>,
    pub parsed_lines: u64,
    pub error_lines: u64,
    pub failure_samples: Vec<ParseFailure>,
}

/// Sole owner of the run's totals. Keeps the first `sample_cap` failures
/// and only counts the rest.
pub(super) struct Collector {
    sample_cap: usize,
    totals: Totals,
}

impl Collector {
    pub fn new(sample_cap: usize) -> Self {
        Self {
            sample_cap,
            totals: Totals::default(),
        }
    }

    /// Drain the results queue until every worker has hung up.
    pub fn run(mut self, results: Receiver<WorkerMessage>) -> Totals {
        for message in results.iter() {
            self.accept(message);
        }
        self.totals
    }

    fn accept(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Parsed(record) => {
                self.totals.parsed_lines += 1;
                self.totals.records.push(record);
            }
            WorkerMessage::Failed { line, reason } => {
                self.totals.error_lines += 1;
                if self.totals.failure_samples.len() < self.sample_cap {
                    self.totals
                        .failure_samples
                        .push(ParseFailure::new(line.line_number, &line.text, reason));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FailureReason;
    use crate::source::RawLine;
    use bytes::Bytes;
    use crossbeam_channel::unbounded;

    fn failed(line_number: u64) -> WorkerMessage {
        WorkerMessage::Failed {
            line: RawLine {
                line_number,
                text: Bytes::from_static(b"junk"),
            },
            reason: FailureReason::PatternMismatch,
        }
    }

    #[test]
    fn test_sample_is_capped_first_come() {
        let (tx, rx) = unbounded();
        for n in 1..=10 {
            tx.send(failed(n)).unwrap();
        }
        drop(tx);

        let totals = Collector::new(3).run(rx);
        assert_eq!(totals.error_lines, 10);
        assert_eq!(
            totals.failure_samples.iter().map(|f| f.line_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(totals.failure_samples[0].raw_text, "junk");
    }

    #[test]
    fn test_empty_queue_gives_zero_totals() {
        let (tx, rx) = unbounded::<WorkerMessage>();
        drop(tx);
        let totals = Collector::new(100).run(rx);
        assert_eq!(totals.parsed_lines, 0);
        assert_eq!(totals.error_lines, 0);
        assert!(totals.records.is_empty());
    }
}
