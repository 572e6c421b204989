//! Source — buffered, line-numbered reader over an access-log file.
//!
//! The reader hands out [`RawLine`]s one at a time. End of input is
//! `Ok(None)`; only a genuine I/O failure (or a line over the hard cap)
//! surfaces as an error.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

use crate::parser::MAX_LINE_SIZE;

/// Initial read buffer; grows on demand up to the line cap.
const READ_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Line {line_number} too large: exceeds {limit} bytes")]
    LineTooLong { line_number: u64, limit: usize },
}

impl SourceError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            SourceError::NotFound(path.to_path_buf())
        } else {
            SourceError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// One line of input with its 1-based position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub line_number: u64,
    pub text: Bytes,
}

pub struct LineSource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    line_number: u64,
    max_line_len: usize,
    /// Set once a read fails; later calls report end of input.
    failed: bool,
}

impl LineSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Self::open_with_limit(path, MAX_LINE_SIZE)
    }

    /// Open with a custom per-line byte cap (terminator excluded).
    pub fn open_with_limit(path: impl AsRef<Path>, max_line_len: usize) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SourceError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(BufReader::with_capacity(READ_BUFFER_SIZE, file)),
            line_number: 0,
            max_line_len,
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of the last line handed out (0 before the first read).
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read the next line, stripping a trailing `\n` or `\r\n`.
    pub fn next_line(&mut self) -> Result<Option<RawLine>, SourceError> {
        if self.failed {
            return Ok(None);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        // The cap is checked against the content; allow one extra byte
        // for a `\r` that is stripped below.
        let hard_limit = self.max_line_len.saturating_add(1);
        let mut buf: Vec<u8> = Vec::new();
        let mut saw_any = false;

        loop {
            let available = match reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.failed = true;
                    return Err(SourceError::io(&self.path, e));
                }
            };

            if available.is_empty() {
                if !saw_any {
                    return Ok(None);
                }
                break;
            }
            saw_any = true;

            match memchr::memchr(b'\n', available) {
                Some(pos) => {
                    buf.extend_from_slice(&available[..pos]);
                    reader.consume(pos + 1);
                    break;
                }
                None => {
                    let len = available.len();
                    buf.extend_from_slice(available);
                    reader.consume(len);
                }
            }

            if buf.len() > hard_limit {
                return Err(self.too_long());
            }
        }

        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.len() > self.max_line_len {
            return Err(self.too_long());
        }

        self.line_number += 1;
        Ok(Some(RawLine {
            line_number: self.line_number,
            text: Bytes::from(buf),
        }))
    }

    /// Rewind to the start of the file; the next read is line 1 again.
    pub fn reset(&mut self) -> Result<(), SourceError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| SourceError::io(&self.path, e))?;
        self.line_number = 0;
        self.failed = false;
        Ok(())
    }

    /// Release the file handle. Safe to call more than once.
    pub fn close(&mut self) {
        self.reader = None;
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    fn too_long(&mut self) -> SourceError {
        self.failed = true;
        SourceError::LineTooLong {
            line_number: self.line_number + 1,
            limit: self.max_line_len,
        }
    }
}

impl std::fmt::Debug for LineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("path", &self.path)
            .field("line_number", &self.line_number)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn collect(source: &mut LineSource) -> Vec<(u64, Vec<u8>)> {
        let mut out = Vec::new();
        while let Some(line) = source.next_line().unwrap() {
            out.push((line.line_number, line.text.to_vec()));
        }
        out
    }

    // ── Reading ─────────────────────────────────────────────────

    #[test]
    fn test_reads_lines_with_numbers() {
        let file = file_with(b"first\nsecond\nthird\n");
        let mut source = LineSource::open(file.path()).unwrap();
        let lines = collect(&mut source);
        assert_eq!(
            lines,
            vec![
                (1, b"first".to_vec()),
                (2, b"second".to_vec()),
                (3, b"third".to_vec()),
            ]
        );
        assert_eq!(source.line_number(), 3);
    }

    #[test]
    fn test_final_line_without_newline() {
        let file = file_with(b"a\nb");
        let mut source = LineSource::open(file.path()).unwrap();
        let lines = collect(&mut source);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].1, b"b".to_vec());
    }

    #[test]
    fn test_strips_crlf() {
        let file = file_with(b"one\r\ntwo\r\n");
        let mut source = LineSource::open(file.path()).unwrap();
        let lines = collect(&mut source);
        assert_eq!(lines[0].1, b"one".to_vec());
        assert_eq!(lines[1].1, b"two".to_vec());
    }

    #[test]
    fn test_blank_lines_are_lines() {
        let file = file_with(b"a\n\nb\n");
        let mut source = LineSource::open(file.path()).unwrap();
        let lines = collect(&mut source);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].1.is_empty());
    }

    #[test]
    fn test_empty_file_is_end_of_input() {
        let file = file_with(b"");
        let mut source = LineSource::open(file.path()).unwrap();
        assert!(source.next_line().unwrap().is_none());
        assert!(source.next_line().unwrap().is_none());
    }

    // ── Line size cap ───────────────────────────────────────────

    #[test]
    fn test_one_megabyte_line_is_supported() {
        let mut contents = vec![b'x'; MAX_LINE_SIZE];
        contents.push(b'\n');
        contents.extend_from_slice(b"tail\n");
        let file = file_with(&contents);

        let mut source = LineSource::open(file.path()).unwrap();
        let first = source.next_line().unwrap().unwrap();
        assert_eq!(first.text.len(), MAX_LINE_SIZE);
        let second = source.next_line().unwrap().unwrap();
        assert_eq!(second.text.as_ref(), b"tail");
    }

    #[test]
    fn test_line_over_cap_fails_deterministically() {
        let file = file_with(b"ok\n0123456789abcdef\nafter\n");
        let mut source = LineSource::open_with_limit(file.path(), 8).unwrap();

        assert_eq!(source.next_line().unwrap().unwrap().text.as_ref(), b"ok");
        match source.next_line() {
            Err(SourceError::LineTooLong { line_number, limit }) => {
                assert_eq!(line_number, 2);
                assert_eq!(limit, 8);
            }
            other => panic!("expected LineTooLong, got {:?}", other),
        }
        // The reader stays stopped after a failure.
        assert!(source.next_line().unwrap().is_none());
    }

    #[test]
    fn test_crlf_does_not_count_against_cap() {
        let file = file_with(b"12345678\r\n");
        let mut source = LineSource::open_with_limit(file.path(), 8).unwrap();
        assert_eq!(source.next_line().unwrap().unwrap().text.as_ref(), b"12345678");
    }

    // ── Lifecycle ───────────────────────────────────────────────

    #[test]
    fn test_open_missing_file() {
        let err = LineSource::open("/definitely/not/here.log").unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn test_reset_rewinds_to_line_one() {
        let file = file_with(b"a\nb\nc\n");
        let mut source = LineSource::open(file.path()).unwrap();
        source.next_line().unwrap();
        source.next_line().unwrap();

        source.reset().unwrap();
        assert_eq!(source.line_number(), 0);
        let line = source.next_line().unwrap().unwrap();
        assert_eq!(line.line_number, 1);
        assert_eq!(line.text.as_ref(), b"a");
    }

    #[test]
    fn test_close_is_idempotent() {
        let file = file_with(b"a\n");
        let mut source = LineSource::open(file.path()).unwrap();
        source.close();
        source.close();
        assert!(source.is_closed());
        assert!(source.next_line().unwrap().is_none());
        assert!(source.reset().is_ok());
    }
}
