use crossbeam_channel::{Receiver, Sender};

use crate::parser::{FailureReason, LogParser, Record};
use crate::source::RawLine;

/// What a worker hands the collector for one line.
#[derive(Debug)]
pub(super) enum WorkerMessage {
    Parsed(Record),
    /// The raw bytes travel along so the collector can keep a sample
    /// without the worker allocating text for every bad line.
    Failed { line: RawLine, reason: FailureReason },
}

/// Parse lines until the work queue disconnects.
pub(super) fn run<P: LogParser + ?Sized>(parser: &P, lines: Receiver<RawLine>, results: Sender<WorkerMessage>) {
    for line in lines.iter() {
        let message = match parser.parse(line.line_number, &line.text) {
            Ok(record) => WorkerMessage::Parsed(record),
            Err(reason) => WorkerMessage::Failed { line, reason },
        };
        if results.send(message).is_err() {
            // Collector is gone; nothing left to report to.
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{AccessLogParser, LogLayout};
    use bytes::Bytes;
    use crossbeam_channel::unbounded;

    fn raw(line_number: u64, text: &'static str) -> RawLine {
        RawLine {
            line_number,
            text: Bytes::from_static(text.as_bytes()),
        }
    }

    #[test]
    fn test_worker_parses_until_disconnect() {
        let (work_tx, work_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        work_tx
            .send(raw(1, "10.0.0.1 - - [01/Jan/2024:00:00:00 +0000] \"GET / HTTP/1.1\" 200 5"))
            .unwrap();
        work_tx.send(raw(2, "nope")).unwrap();
        drop(work_tx);

        run(&AccessLogParser::new(LogLayout::Basic), work_rx, result_tx);

        let messages: Vec<WorkerMessage> = result_rx.iter().collect();
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0], WorkerMessage::Parsed(r) if r.line_number == 1));
        assert!(matches!(
            &messages[1],
            WorkerMessage::Failed { line, reason: FailureReason::PatternMismatch } if line.line_number == 2
        ));
    }

    #[test]
    fn test_worker_stops_when_collector_gone() {
        let (work_tx, work_rx) = unbounded();
        let (result_tx, result_rx) = unbounded::<WorkerMessage>();
        drop(result_rx);

        work_tx.send(raw(1, "a")).unwrap();
        work_tx.send(raw(2, "b")).unwrap();

        // Returns instead of blocking even though the sender is still open.
        run(&AccessLogParser::new(LogLayout::Basic), work_rx, result_tx);
        assert_eq!(work_tx.len(), 1);
    }
}
