//! mqstats - runtime statistics engine for a topic/channel message broker.
//!
//! Tracks, per topic:
//! - Message-size and write-latency histograms (lock-free atomic buckets)
//! - A rolling 24-hour publish-volume window (hour-of-day indexed)
//! - Bounded per-publisher counters with best-effort stale eviction
//!
//! and assembles point-in-time, name-sorted snapshots of the whole
//! topic/channel/client tree for external inspection (admin API, dashboard).

pub mod config;
pub mod detail;
pub mod error;
pub mod histogram;
pub mod hourly;
pub mod pub_clients;
pub mod registry;
pub mod snapshot;
pub mod sweeper;

pub use crate::config::StatsConfig;
pub use crate::detail::TopicDetailStats;
pub use crate::error::{Error, Result};
pub use crate::pub_clients::ClientPubStats;
pub use crate::registry::{Channel, ClientStatsSource, Topic, TopicRegistry};
pub use crate::snapshot::{ChannelStats, ClientStats, Percentile, QuantileResult, TopicStats};
pub use crate::sweeper::HourlySweeper;
