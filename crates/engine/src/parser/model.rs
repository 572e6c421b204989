use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two supported access-log layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLayout {
    /// `host ident user [time] "request" status size "referrer" "user-agent"`
    #[default]
    Extended,
    /// `host ident user [time] "request" status size`
    Basic,
}

impl LogLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLayout::Extended => "extended",
            LogLayout::Basic => "basic",
        }
    }
}

impl fmt::Display for LogLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "extended" | "combined" => Ok(LogLayout::Extended),
            "basic" | "common" => Ok(LogLayout::Basic),
            other => Err(format!("unknown log layout '{}' (expected extended or basic)", other)),
        }
    }
}

/// Why a single line was rejected. Never fatal for the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    #[error("pattern mismatch")]
    PatternMismatch,

    #[error("timestamp parse error")]
    TimestampParse,

    #[error("status code parse error")]
    StatusCodeParse,
}

/// A retained sample of a line that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub line_number: u64,
    pub raw_text: String,
    pub reason: FailureReason,
}

impl ParseFailure {
    pub fn new(line_number: u64, raw: &[u8], reason: FailureReason) -> Self {
        Self {
            line_number,
            raw_text: String::from_utf8_lossy(raw).into_owned(),
            reason,
        }
    }
}

/// One successfully parsed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub client_address: String,
    /// Authenticated user, `None` when the log carries `-`.
    pub user: Option<String>,
    /// Request time in the zone offset written in the log.
    pub timestamp: DateTime<FixedOffset>,
    pub method: String,
    pub path: String,
    pub protocol: String,
    pub status_code: u16,
    pub response_bytes: u64,
    /// Empty for the basic layout.
    pub referrer: String,
    /// Empty for the basic layout.
    pub user_agent: String,
    pub line_number: u64,
}

impl Record {
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// 2xx or 3xx.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    pub fn status_class(&self) -> &'static str {
        match self.status_code / 100 {
            2 => "2xx",
            3 => "3xx",
            4 => "4xx",
            5 => "5xx",
            _ => "other",
        }
    }

    pub fn response_kib(&self) -> f64 {
        self.response_bytes as f64 / 1024.0
    }

    pub fn response_mib(&self) -> f64 {
        self.response_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Check the required fields and the status code range.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.client_address.is_empty() {
            return Err(RecordValidationError::Empty("client_address"));
        }
        if self.method.is_empty() {
            return Err(RecordValidationError::Empty("method"));
        }
        if self.path.is_empty() {
            return Err(RecordValidationError::Empty("path"));
        }
        if !(100..=599).contains(&self.status_code) {
            return Err(RecordValidationError::StatusOutOfRange(self.status_code));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("status code {0} outside 100-599")]
    StatusOutOfRange(u16),
}
