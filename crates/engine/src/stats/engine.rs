use ahash::AHashMap;
use tracing::debug;

use super::bots::{BotClassifier, BotCounters, Classification};
use super::model::{ClientStat, PathStat, StatisticsSnapshot, StatusHistogram};
use super::topn::TopNSelector;
use super::DEFAULT_TOP_N;
use crate::parser::Record;

#[derive(Debug, Default)]
struct ClientAcc<'a> {
    address: &'a str,
    requests: u64,
    bytes: u64,
}

#[derive(Debug, Default)]
struct PathAcc<'a> {
    path: &'a str,
    requests: u64,
    bytes: u64,
    errors: u64,
}

/// Single-pass aggregation over parsed records.
///
/// Accumulators are kept in first-seen order and ranked by index, so two
/// calls over the same records produce identical snapshots, ties included.
#[derive(Debug)]
pub struct StatisticsEngine {
    top_n: usize,
    classifier: BotClassifier,
}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self::with_top_n(DEFAULT_TOP_N)
    }

    pub fn with_top_n(top_n: usize) -> Self {
        Self {
            top_n,
            classifier: BotClassifier::new(),
        }
    }

    /// Use a classifier with custom keyword groups. Only its keywords are
    /// used; its own counters are left alone.
    pub fn with_classifier(mut self, classifier: BotClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn classifier(&self) -> &BotClassifier {
        &self.classifier
    }

    pub fn calculate(&self, records: &[Record]) -> StatisticsSnapshot {
        if records.is_empty() {
            return StatisticsSnapshot::default();
        }

        let mut client_slots: AHashMap<&str, usize> = AHashMap::new();
        let mut clients: Vec<ClientAcc<'_>> = Vec::new();
        let mut path_slots: AHashMap<&str, usize> = AHashMap::new();
        let mut paths: Vec<PathAcc<'_>> = Vec::new();
        let mut verdicts: AHashMap<&str, Classification> = AHashMap::new();

        let bots = BotCounters::new();
        let mut status_codes = StatusHistogram::default();
        let mut total_bytes: u64 = 0;

        for record in records {
            total_bytes = total_bytes.saturating_add(record.response_bytes);

            let address = record.client_address.as_str();
            let slot = *client_slots.entry(address).or_insert_with(|| {
                clients.push(ClientAcc {
                    address,
                    ..Default::default()
                });
                clients.len() - 1
            });
            let client = &mut clients[slot];
            client.requests += 1;
            client.bytes = client.bytes.saturating_add(record.response_bytes);

            let path = record.path.as_str();
            let slot = *path_slots.entry(path).or_insert_with(|| {
                paths.push(PathAcc {
                    path,
                    ..Default::default()
                });
                paths.len() - 1
            });
            let acc = &mut paths[slot];
            acc.requests += 1;
            acc.bytes = acc.bytes.saturating_add(record.response_bytes);
            if record.is_error() {
                acc.errors += 1;
            }

            status_codes.record(record.status_code);

            let user_agent = record.user_agent.as_str();
            let verdict = *verdicts
                .entry(user_agent)
                .or_insert_with(|| self.classifier.inspect(user_agent));
            bots.record(verdict);
        }

        let total_requests = records.len() as u64;

        let mut client_rank = TopNSelector::new(self.top_n);
        for (slot, acc) in clients.iter().enumerate() {
            client_rank.update(slot, acc.requests);
        }
        let top_clients = client_rank
            .results()
            .into_iter()
            .map(|entry| {
                let acc = &clients[entry.key];
                ClientStat {
                    address: acc.address.to_string(),
                    request_count: entry.count,
                    total_bytes: acc.bytes,
                }
            })
            .collect();

        let mut path_rank = TopNSelector::new(self.top_n);
        for (slot, acc) in paths.iter().enumerate() {
            path_rank.update(slot, acc.requests);
        }
        let top_paths = path_rank
            .results()
            .into_iter()
            .map(|entry| {
                let acc = &paths[entry.key];
                PathStat {
                    path: acc.path.to_string(),
                    request_count: entry.count,
                    average_size: acc.bytes / acc.requests.max(1),
                    error_rate: acc.errors as f64 / acc.requests.max(1) as f64 * 100.0,
                }
            })
            .collect();

        let snapshot = StatisticsSnapshot {
            total_requests,
            unique_client_count: clients.len() as u64,
            unique_path_count: paths.len() as u64,
            total_bytes,
            average_response_size: total_bytes / total_requests,
            top_clients,
            top_paths,
            status_codes,
            bot: bots.snapshot(),
        };

        debug!(
            total_requests = snapshot.total_requests,
            unique_clients = snapshot.unique_client_count,
            unique_paths = snapshot.unique_path_count,
            bot_requests = snapshot.bot.bot_count,
            "Statistics calculated"
        );

        snapshot
    }
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::BotCategory;
    use chrono::DateTime;

    fn record(client: &str, path: &str, status_code: u16, bytes: u64, user_agent: &str) -> Record {
        Record {
            client_address: client.to_string(),
            user: None,
            timestamp: DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap(),
            method: "GET".to_string(),
            path: path.to_string(),
            protocol: "HTTP/1.1".to_string(),
            status_code,
            response_bytes: bytes,
            referrer: "-".to_string(),
            user_agent: user_agent.to_string(),
            line_number: 0,
        }
    }

    fn five_records() -> Vec<Record> {
        vec![
            record("127.0.0.1", "/", 200, 1024, "Mozilla/5.0"),
            record("127.0.0.1", "/about", 200, 512, "Mozilla/5.0"),
            record("192.168.1.100", "/", 404, 1024, "Googlebot/2.1"),
            record("192.168.1.100", "/api", 500, 1024, "curl/8.0"),
            record("10.0.0.1", "/", 301, 1024, "-"),
        ]
    }

    // ── Aggregation ─────────────────────────────────────────────

    #[test]
    fn test_empty_input_is_zeroed() {
        let snapshot = StatisticsEngine::new().calculate(&[]);
        assert_eq!(snapshot, StatisticsSnapshot::default());
        assert_eq!(snapshot.average_response_size, 0);
    }

    #[test]
    fn test_five_record_totals() {
        let snapshot = StatisticsEngine::new().calculate(&five_records());

        assert_eq!(snapshot.total_requests, 5);
        assert_eq!(snapshot.unique_client_count, 3);
        assert_eq!(snapshot.unique_path_count, 3);
        assert_eq!(snapshot.total_bytes, 4608);
        assert_eq!(snapshot.average_response_size, 921);

        assert_eq!(snapshot.top_clients.len(), 3);
        assert_eq!(snapshot.top_clients[0].request_count, 2);
        assert_eq!(snapshot.top_clients[1].request_count, 2);
        assert_eq!(snapshot.top_clients[2].address, "10.0.0.1");
    }

    #[test]
    fn test_client_bytes_follow_ranking() {
        let snapshot = StatisticsEngine::new().calculate(&five_records());
        let local = snapshot
            .top_clients
            .iter()
            .find(|c| c.address == "127.0.0.1")
            .unwrap();
        assert_eq!(local.total_bytes, 1536);
    }

    #[test]
    fn test_path_stats() {
        let snapshot = StatisticsEngine::new().calculate(&five_records());
        let root = &snapshot.top_paths[0];
        assert_eq!(root.path, "/");
        assert_eq!(root.request_count, 3);
        assert_eq!(root.average_size, 1024);
        assert!((root.error_rate - 100.0 / 3.0).abs() < 1e-9);

        let api = snapshot.top_paths.iter().find(|p| p.path == "/api").unwrap();
        assert_eq!(api.error_rate, 100.0);
    }

    #[test]
    fn test_status_histogram() {
        let snapshot = StatisticsEngine::new().calculate(&five_records());
        let status = &snapshot.status_codes;
        assert_eq!(status.success, 2);
        assert_eq!(status.redirection, 1);
        assert_eq!(status.client_error, 1);
        assert_eq!(status.server_error, 1);
        assert_eq!(status.count(200), 2);
    }

    #[test]
    fn test_bot_snapshot() {
        let snapshot = StatisticsEngine::new().calculate(&five_records());
        assert_eq!(snapshot.bot.total_classified, 5);
        assert_eq!(snapshot.bot.bot_count, 2);
        assert_eq!(snapshot.bot.human_count, 3);
        assert_eq!(snapshot.bot.percentage_bot, 40.0);
        assert_eq!(
            snapshot.bot.counts_by_category.get(&BotCategory::SearchEngine),
            Some(&1)
        );
    }

    // ── Ranking limits ──────────────────────────────────────────

    #[test]
    fn test_top_n_limits_rankings() {
        let records: Vec<Record> = (0..25)
            .map(|i| record(&format!("10.0.0.{}", i), &format!("/p{}", i), 200, 1, ""))
            .collect();
        let snapshot = StatisticsEngine::with_top_n(4).calculate(&records);
        assert_eq!(snapshot.top_clients.len(), 4);
        assert_eq!(snapshot.top_paths.len(), 4);
        assert_eq!(snapshot.unique_client_count, 25);
    }

    #[test]
    fn test_default_top_n() {
        assert_eq!(StatisticsEngine::new().top_n(), 10);
    }

    // ── Idempotence ─────────────────────────────────────────────

    #[test]
    fn test_calculate_twice_is_identical() {
        let mut records = five_records();
        for i in 0..50 {
            records.push(record(&format!("172.16.0.{}", i % 7), "/x", 200, i, "bingbot"));
        }
        let engine = StatisticsEngine::new();
        let first = engine.calculate(&records);
        let second = engine.calculate(&records);
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_classifier_keywords() {
        let classifier = BotClassifier::new();
        classifier.add_keyword(BotCategory::Monitoring, "mozilla");
        let engine = StatisticsEngine::new().with_classifier(classifier);

        let snapshot = engine.calculate(&five_records());
        assert_eq!(
            snapshot.bot.counts_by_category.get(&BotCategory::Monitoring),
            Some(&2)
        );
        assert_eq!(engine.classifier().snapshot().total_classified, 0);
    }
}
