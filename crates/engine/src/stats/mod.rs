//! Stats — aggregation over parsed records.
//!
//! - `topn.rs`: bounded top-N ranking (indexed min-heap)
//! - `bots.rs`: user-agent bot classification and its counters
//! - `engine.rs`: single-pass statistics calculation
//! - `model.rs`: snapshot types handed to callers

pub mod bots;
pub mod engine;
pub mod model;
pub mod topn;

pub use bots::{BotCategory, BotClassifier, BotCounters, BotSnapshot, Classification};
pub use engine::StatisticsEngine;
pub use model::{ClientStat, PathStat, StatisticsSnapshot, StatusHistogram};
pub use topn::{RankedEntity, TopNSelector};

/// Entries kept in each ranking unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 10;
