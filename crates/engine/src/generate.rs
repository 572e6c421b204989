//! Generate — synthetic access logs for tests and benchmarks.
//!
//! Lines come from a seeded RNG, so the same seed always yields the same
//! file. Each valid line is returned together with the field values used
//! to build it, which lets tests check a parse against known input.

use std::io::{self, Write};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::parser::timestamp::format_timestamp;
use crate::parser::LogLayout;

const PATHS: &[&str] = &[
    "/",
    "/index.html",
    "/about.html",
    "/contact.html",
    "/products",
    "/products/item1",
    "/products/item2",
    "/api/users",
    "/api/orders",
    "/static/css/style.css",
    "/static/js/app.js",
    "/images/logo.png",
    "/favicon.ico",
    "/robots.txt",
    "/sitemap.xml",
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Googlebot/2.1 (+http://www.google.com/bot.html)",
    "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)",
];

const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS"];

// Weighted towards 200.
const NORMAL_STATUS: &[u16] = &[200, 200, 200, 200, 201, 204, 301, 302, 304];
const ERROR_STATUS: &[u16] = &[400, 401, 403, 404, 500, 502, 503];

const REFERRERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://www.facebook.com/",
    "https://twitter.com/",
    "https://www.linkedin.com/",
    "-",
];

/// Lines no layout accepts.
pub const INVALID_LINES: &[&str] = &[
    "This is not a valid log line",
    "",
    "123.456.789.0",
    "[01/Jan/2024:00:00:00 +0000]",
    "GET /path HTTP/1.1",
    "Invalid timestamp format",
    "Missing required fields",
];

/// 2024-01-01T00:00:00Z
const DEFAULT_START_SECS: i64 = 1_704_067_200;

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub layout: LogLayout,
    /// Chance that a valid line carries a 4xx/5xx status.
    pub error_rate: f64,
    /// Chance that a line is drawn from [`INVALID_LINES`].
    pub invalid_rate: f64,
    /// Timestamp of the first line; each later line is one second on.
    pub start: DateTime<FixedOffset>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            layout: LogLayout::Extended,
            error_rate: 0.05,
            invalid_rate: 0.01,
            start: DateTime::<Utc>::UNIX_EPOCH.fixed_offset() + Duration::seconds(DEFAULT_START_SECS),
        }
    }
}

/// Field values a valid line was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFields {
    pub client_address: String,
    pub timestamp: DateTime<FixedOffset>,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub response_bytes: u64,
    /// `None` for the basic layout.
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLine {
    pub text: String,
    /// `None` when the line was drawn from the invalid pool.
    pub fields: Option<GeneratedFields>,
}

impl GeneratedLine {
    pub fn is_valid(&self) -> bool {
        self.fields.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerateSummary {
    pub lines: u64,
    pub valid: u64,
    pub invalid: u64,
    pub bytes: u64,
}

pub struct LogGenerator {
    rng: StdRng,
    options: GeneratorOptions,
    emitted: u64,
}

impl LogGenerator {
    pub fn new(seed: u64, layout: LogLayout) -> Self {
        Self::with_options(
            seed,
            GeneratorOptions {
                layout,
                ..Default::default()
            },
        )
    }

    pub fn with_options(seed: u64, options: GeneratorOptions) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            options,
            emitted: 0,
        }
    }

    pub fn layout(&self) -> LogLayout {
        self.options.layout
    }

    /// Next line, invalid with probability `invalid_rate`.
    pub fn next_line(&mut self) -> GeneratedLine {
        if self.rng.random_bool(self.options.invalid_rate.clamp(0.0, 1.0)) {
            self.emitted += 1;
            return GeneratedLine {
                text: self.invalid_line().to_string(),
                fields: None,
            };
        }
        self.valid_line()
    }

    /// Next line, always valid for the configured layout.
    pub fn valid_line(&mut self) -> GeneratedLine {
        let timestamp = self.options.start + Duration::seconds(self.emitted as i64);
        self.emitted += 1;

        let client_address = format!(
            "{}.{}.{}.{}",
            self.rng.random_range(0..=255u8),
            self.rng.random_range(0..=255u8),
            self.rng.random_range(0..=255u8),
            self.rng.random_range(0..=255u8),
        );
        let path = self.pick(PATHS).to_string();
        let method = self.pick(METHODS).to_string();

        let is_error = self.rng.random_bool(self.options.error_rate.clamp(0.0, 1.0));
        let status_code = if is_error {
            self.pick(ERROR_STATUS)
        } else {
            self.pick(NORMAL_STATUS)
        };
        let response_bytes = self.rng.random_range(100..102_500u64);

        let (referrer, user_agent) = match self.options.layout {
            LogLayout::Basic => (None, None),
            LogLayout::Extended => (
                Some(self.pick(REFERRERS).to_string()),
                Some(self.pick(USER_AGENTS).to_string()),
            ),
        };

        let mut text = format!(
            "{} - - [{}] \"{} {} HTTP/1.1\" {} {}",
            client_address,
            format_timestamp(&timestamp),
            method,
            path,
            status_code,
            response_bytes
        );
        if let (Some(referrer), Some(user_agent)) = (&referrer, &user_agent) {
            text.push_str(&format!(" \"{}\" \"{}\"", referrer, user_agent));
        }

        GeneratedLine {
            text,
            fields: Some(GeneratedFields {
                client_address,
                timestamp,
                method,
                path,
                status_code,
                response_bytes,
                referrer,
                user_agent,
            }),
        }
    }

    pub fn invalid_line(&mut self) -> &'static str {
        self.pick(INVALID_LINES)
    }

    /// Write `lines` lines, each newline-terminated.
    pub fn write_to<W: Write>(&mut self, mut out: W, lines: u64) -> io::Result<GenerateSummary> {
        let mut summary = GenerateSummary::default();
        for _ in 0..lines {
            let line = self.next_line();
            if line.is_valid() {
                summary.valid += 1;
            } else {
                summary.invalid += 1;
            }
            out.write_all(line.text.as_bytes())?;
            out.write_all(b"\n")?;
            summary.lines += 1;
            summary.bytes += line.text.len() as u64 + 1;
        }
        out.flush()?;
        Ok(summary)
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.random_range(0..items.len())]
    }
}
