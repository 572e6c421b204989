//! Bot detection from user-agent strings.
//!
//! Keyword groups are checked in a fixed priority order; the first group
//! with a case-insensitive substring hit decides the category. Generic
//! crawler markers such as `bot` are checked last so that `googlebot`
//! lands in the search-engine group.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Bot categories in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BotCategory {
    #[serde(rename = "search engine")]
    SearchEngine,
    #[serde(rename = "social media")]
    SocialMedia,
    #[serde(rename = "monitoring")]
    Monitoring,
    #[serde(rename = "seo tool")]
    SeoTool,
    #[serde(rename = "security scanner")]
    SecurityScanner,
    #[serde(rename = "crawler")]
    Crawler,
}

impl BotCategory {
    pub const ALL: [BotCategory; 6] = [
        BotCategory::SearchEngine,
        BotCategory::SocialMedia,
        BotCategory::Monitoring,
        BotCategory::SeoTool,
        BotCategory::SecurityScanner,
        BotCategory::Crawler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BotCategory::SearchEngine => "search engine",
            BotCategory::SocialMedia => "social media",
            BotCategory::Monitoring => "monitoring",
            BotCategory::SeoTool => "seo tool",
            BotCategory::SecurityScanner => "security scanner",
            BotCategory::Crawler => "crawler",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn default_keywords(self) -> &'static [&'static str] {
        match self {
            BotCategory::SearchEngine => &[
                "googlebot", "bingbot", "slurp", "duckduckbot", "baiduspider",
                "yandexbot", "yandex", "sogou", "exabot",
            ],
            BotCategory::SocialMedia => &[
                "facebookexternalhit", "twitterbot", "linkedinbot", "pinterest",
                "slackbot", "telegrambot", "whatsapp", "discordbot",
            ],
            BotCategory::Monitoring => &[
                "pingdom", "uptimerobot", "statuscake", "monitor", "site24x7",
                "newrelic", "datadog", "nagios",
            ],
            BotCategory::SeoTool => &[
                "semrush", "ahrefs", "mj12bot", "majestic", "screaming frog",
                "seokicks", "seoscan",
            ],
            BotCategory::SecurityScanner => &[
                "nessus", "nikto", "nmap", "masscan", "acunetix", "qualys",
                "securityscanner", "vulnscanner",
            ],
            BotCategory::Crawler => &[
                "bot", "crawler", "spider", "scraper", "scraping", "python-requests",
                "curl", "wget", "httpclient", "scrapy", "beautifulsoup", "mechanize",
                "pycurl", "libwww", "okhttp", "go-http-client",
            ],
        }
    }
}

impl fmt::Display for BotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BotCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['_', '-'], " ");
        BotCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown bot category '{}'", s))
    }
}

/// Verdict for one user-agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub is_bot: bool,
    pub category: Option<BotCategory>,
}

impl Classification {
    pub const HUMAN: Classification = Classification {
        is_bot: false,
        category: None,
    };

    fn bot(category: BotCategory) -> Self {
        Self {
            is_bot: true,
            category: Some(category),
        }
    }
}

/// Running classification counters. Safe under concurrent increments; all
/// operations are `Relaxed`, so a snapshot taken mid-update may be torn.
#[derive(Debug, Default)]
pub struct BotCounters {
    total: AtomicU64,
    bots: AtomicU64,
    humans: AtomicU64,
    by_category: [AtomicU64; 6],
}

impl BotCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&self, verdict: Classification) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match verdict.category {
            Some(category) if verdict.is_bot => {
                self.bots.fetch_add(1, Ordering::Relaxed);
                self.by_category[category.index()].fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.humans.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> BotSnapshot {
        let total_classified = self.total.load(Ordering::Relaxed);
        let bot_count = self.bots.load(Ordering::Relaxed);
        let human_count = self.humans.load(Ordering::Relaxed);

        let counts_by_category = BotCategory::ALL
            .into_iter()
            .map(|c| (c, self.by_category[c.index()].load(Ordering::Relaxed)))
            .filter(|(_, n)| *n > 0)
            .collect();

        BotSnapshot {
            total_classified,
            bot_count,
            human_count,
            percentage_bot: if total_classified > 0 {
                bot_count as f64 / total_classified as f64 * 100.0
            } else {
                0.0
            },
            counts_by_category,
        }
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.bots.store(0, Ordering::Relaxed);
        self.humans.store(0, Ordering::Relaxed);
        for counter in &self.by_category {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A read-only view of the classification counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BotSnapshot {
    pub total_classified: u64,
    pub bot_count: u64,
    pub human_count: u64,
    /// `100 * bot_count / total_classified`, 0 when nothing was classified.
    pub percentage_bot: f64,
    /// Only categories with at least one hit.
    pub counts_by_category: BTreeMap<BotCategory, u64>,
}

impl BotSnapshot {
    /// The `k` busiest categories, largest first. Ties go to the category
    /// with the higher match priority.
    pub fn top_categories(&self, k: usize) -> Vec<(BotCategory, u64)> {
        let mut entries: Vec<(BotCategory, u64)> =
            self.counts_by_category.iter().map(|(c, n)| (*c, *n)).collect();

        // At most six entries; a selection pass is enough.
        for i in 0..entries.len() {
            let mut best = i;
            for j in (i + 1)..entries.len() {
                let (cat, n) = entries[j];
                if n > entries[best].1 || (n == entries[best].1 && cat < entries[best].0) {
                    best = j;
                }
            }
            entries.swap(i, best);
        }

        entries.truncate(k);
        entries
    }
}

/// User-agent classifier with live-editable keyword groups.
#[derive(Debug)]
pub struct BotClassifier {
    groups: RwLock<[Vec<String>; 6]>,
    counters: BotCounters,
}

impl BotClassifier {
    pub fn new() -> Self {
        let groups = BotCategory::ALL.map(|c| {
            c.default_keywords()
                .iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
        });
        Self {
            groups: RwLock::new(groups),
            counters: BotCounters::new(),
        }
    }

    /// Classify without touching the counters.
    pub fn inspect(&self, user_agent: &str) -> Classification {
        if user_agent.is_empty() || user_agent == "-" {
            return Classification::HUMAN;
        }

        let lower = user_agent.to_lowercase();
        let groups = self.groups.read();

        for category in BotCategory::ALL {
            if groups[category.index()]
                .iter()
                .any(|keyword| lower.contains(keyword.as_str()))
            {
                return Classification::bot(category);
            }
        }

        Classification::HUMAN
    }

    /// Classify and count the verdict.
    pub fn classify(&self, user_agent: &str) -> Classification {
        let verdict = self.inspect(user_agent);
        self.counters.record(verdict);
        verdict
    }

    pub fn snapshot(&self) -> BotSnapshot {
        self.counters.snapshot()
    }

    /// Zero the counters; keyword groups are kept.
    pub fn reset(&self) {
        self.counters.reset();
    }

    /// Add a keyword to a group. Matching is case-insensitive.
    pub fn add_keyword(&self, category: BotCategory, keyword: &str) {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return;
        }
        let mut groups = self.groups.write();
        let group = &mut groups[category.index()];
        if !group.contains(&keyword) {
            group.push(keyword);
        }
    }

    /// Remove a keyword from whichever groups hold it.
    pub fn remove_keyword(&self, keyword: &str) {
        let keyword = keyword.trim().to_lowercase();
        let mut groups = self.groups.write();
        for group in groups.iter_mut() {
            group.retain(|k| *k != keyword);
        }
    }

    pub fn keywords(&self, category: BotCategory) -> Vec<String> {
        self.groups.read()[category.index()].clone()
    }
}

impl Default for BotClassifier {
    fn default() -> Self {
        Self::new()
    }
}
