use crate::parser::timestamp::parse_timestamp;
use crate::parser::traits::{FailureReason, FormatDetector, LogLayout, LogParser, Record};

/// Parser for access logs in one of the two fixed layouts.
///
/// Extracts remote host, user, timestamp, method, path, protocol, status
/// code, response size and, for the extended layout, referrer and
/// user-agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessLogParser {
    layout: LogLayout,
}

impl AccessLogParser {
    pub fn new(layout: LogLayout) -> Self {
        Self { layout }
    }
}

impl FormatDetector for AccessLogParser {
    fn matches(&self, line: &[u8]) -> bool {
        scan(line, self.layout).is_some()
    }

    fn layout(&self) -> LogLayout {
        self.layout
    }
}

impl LogParser for AccessLogParser {
    fn parse(&self, line_number: u64, raw: &[u8]) -> Result<Record, FailureReason> {
        // Format: host ident authuser [date] "request" status bytes ["referrer" "user-agent"]
        // Example: 127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326
        let fields = scan(raw, self.layout).ok_or(FailureReason::PatternMismatch)?;

        let timestamp = parse_timestamp(fields.timestamp)?;
        let status_code = parse_status(fields.status)?;
        let response_bytes = parse_size(fields.size);

        Ok(Record {
            client_address: lossy(fields.client),
            user: (fields.user != b"-").then(|| lossy(fields.user)),
            timestamp,
            method: lossy(fields.method),
            path: lossy(fields.path),
            protocol: lossy(fields.protocol),
            status_code,
            response_bytes,
            referrer: fields.referrer.map(lossy).unwrap_or_default(),
            user_agent: fields.user_agent.map(lossy).unwrap_or_default(),
            line_number,
        })
    }

    fn layout(&self) -> LogLayout {
        self.layout
    }
}

/// Borrowed field slices of a line that fits the grammar.
#[derive(Debug, PartialEq, Eq)]
struct Fields<'a> {
    client: &'a [u8],
    user: &'a [u8],
    timestamp: &'a [u8],
    method: &'a [u8],
    path: &'a [u8],
    protocol: &'a [u8],
    status: &'a [u8],
    size: &'a [u8],
    referrer: Option<&'a [u8]>,
    user_agent: Option<&'a [u8]>,
}

/// Match a line against the layout grammar. Fields are separated by single
/// spaces; anything after the last field is ignored.
fn scan(line: &[u8], layout: LogLayout) -> Option<Fields<'_>> {
    let mut c = Cursor::new(line);

    let client = c.token()?;
    c.expect(b' ')?;
    let _ident = c.token()?;
    c.expect(b' ')?;
    let user = c.token()?;
    c.expect(b' ')?;

    c.expect(b'[')?;
    let timestamp = c.until(b']')?;
    c.expect(b']')?;
    c.expect(b' ')?;

    c.expect(b'"')?;
    let method = c.take_while(|b| b.is_ascii_uppercase())?;
    c.expect(b' ')?;
    let path = c.token()?;
    c.expect(b' ')?;
    let protocol = c.until(b'"')?;
    c.expect(b'"')?;
    c.expect(b' ')?;

    let status = c.digits(3)?;
    c.expect(b' ')?;
    let size = c.token()?;

    let (referrer, user_agent) = match layout {
        LogLayout::Basic => (None, None),
        LogLayout::Extended => {
            c.expect(b' ')?;
            let referrer = c.quoted()?;
            c.expect(b' ')?;
            let user_agent = c.quoted()?;
            (Some(referrer), Some(user_agent))
        }
    };

    Some(Fields {
        client,
        user,
        timestamp,
        method,
        path,
        protocol,
        status,
        size,
        referrer,
        user_agent,
    })
}

struct Cursor<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a [u8]) -> Self {
        Self { line, pos: 0 }
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        if self.line.get(self.pos) == Some(&byte) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    /// One or more bytes satisfying `pred`.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> Option<&'a [u8]> {
        let start = self.pos;
        while self.line.get(self.pos).is_some_and(|b| pred(*b)) {
            self.pos += 1;
        }
        (self.pos > start).then(|| &self.line[start..self.pos])
    }

    /// A run of non-whitespace bytes.
    fn token(&mut self) -> Option<&'a [u8]> {
        self.take_while(|b| !b.is_ascii_whitespace())
    }

    /// One or more bytes up to (not including) `stop`, which must follow.
    fn until(&mut self, stop: u8) -> Option<&'a [u8]> {
        let rest = &self.line[self.pos..];
        let len = memchr::memchr(stop, rest)?;
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    /// `"..."` with possibly empty content and no embedded quote.
    fn quoted(&mut self) -> Option<&'a [u8]> {
        self.expect(b'"')?;
        let rest = &self.line[self.pos..];
        let len = memchr::memchr(b'"', rest)?;
        self.pos += len + 1;
        Some(&rest[..len])
    }

    fn digits(&mut self, count: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(count)?;
        let slice = self.line.get(self.pos..end)?;
        if !slice.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.pos = end;
        Some(slice)
    }
}

fn parse_status(raw: &[u8]) -> Result<u16, FailureReason> {
    let code = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or(FailureReason::StatusCodeParse)?;
    if (100..=599).contains(&code) {
        Ok(code)
    } else {
        Err(FailureReason::StatusCodeParse)
    }
}

/// `-` and anything non-numeric count as zero bytes.
fn parse_size(raw: &[u8]) -> u64 {
    if raw == b"-" {
        return 0;
    }
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0)
}

fn lossy(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
