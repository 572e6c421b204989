use std::collections::BTreeMap;

use serde::Serialize;

use super::bots::BotSnapshot;

/// Aggregate view over one set of parsed records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_requests: u64,
    pub unique_client_count: u64,
    pub unique_path_count: u64,
    pub total_bytes: u64,
    /// `total_bytes / total_requests`, rounded down; 0 when empty.
    pub average_response_size: u64,
    pub top_clients: Vec<ClientStat>,
    pub top_paths: Vec<PathStat>,
    pub status_codes: StatusHistogram,
    pub bot: BotSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientStat {
    pub address: String,
    pub request_count: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStat {
    pub path: String,
    pub request_count: u64,
    pub average_size: u64,
    /// Share of requests with status >= 400, as a percentage.
    pub error_rate: f64,
}

/// Status codes by exact value and by class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusHistogram {
    /// 2xx
    pub success: u64,
    /// 3xx
    pub redirection: u64,
    /// 4xx
    pub client_error: u64,
    /// 5xx
    pub server_error: u64,
    pub details: BTreeMap<u16, u64>,
}

impl StatusHistogram {
    pub fn record(&mut self, status_code: u16) {
        *self.details.entry(status_code).or_insert(0) += 1;
        match status_code / 100 {
            2 => self.success += 1,
            3 => self.redirection += 1,
            4 => self.client_error += 1,
            5 => self.server_error += 1,
            _ => {}
        }
    }

    pub fn count(&self, status_code: u16) -> u64 {
        self.details.get(&status_code).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.details.values().sum()
    }
}
