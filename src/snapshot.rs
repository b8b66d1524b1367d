//! Point-in-time statistics snapshots.
//!
//! Walks the registry's topic -> channel -> client tree and materializes
//! an immutable, name-sorted `TopicStats` sequence. Each level's lock is
//! held only long enough to copy handles out, so a snapshot is consistent
//! per level but may interleave with concurrent topic/channel churn; a
//! globally atomic view would need a broker-wide stop-the-world lock.
//!
//! The records serialize to the JSON shape an admin endpoint exposes.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::DateTime;
use serde::Serialize;

use crate::pub_clients::ClientPubStats;
use crate::registry::{Channel, Topic, TopicRegistry};

/// One percentile of a pre-computed quantile estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Percentile {
    pub quantile: f64,
    pub value: f64,
}

/// Output of an external quantile estimator, passed through opaquely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuantileResult {
    pub count: i64,
    pub percentiles: Vec<Percentile>,
}

/// Flat per-connection record supplied by the broker's client object.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientStats {
    pub name: String,
    pub client_id: String,
    pub hostname: String,
    pub version: String,
    pub remote_address: String,
    pub state: i32,
    pub ready_count: i64,
    pub in_flight_count: i64,
    pub message_count: u64,
    pub finish_count: u64,
    pub requeue_count: u64,
    pub timeout_count: i64,
    pub deferred_count: i64,
    pub connect_ts: i64,
    pub sample_rate: i32,
    pub deflate: bool,
    pub snappy: bool,
    pub user_agent: String,
    pub tls: bool,
    pub tls_cipher_suite: String,
    pub tls_version: String,
    pub tls_negotiated_protocol: String,
    pub tls_negotiated_protocol_is_mutual: bool,
}

/// Frozen statistics for one channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStats {
    pub channel_name: String,
    pub depth: i64,
    pub depth_size: i64,
    pub depth_ts: String,
    pub backend_depth: i64,
    /// Bytes consumed on this channel over the past hour. Not tracked per
    /// channel by the window; emitted zeroed for endpoint compatibility.
    pub hourly_subsize: i64,
    pub in_flight_count: i64,
    pub deferred_count: i64,
    pub message_count: u64,
    pub requeue_count: u64,
    pub timeout_count: u64,
    pub clients: Vec<ClientStats>,
    pub paused: bool,
    pub e2e_processing_latency: Option<QuantileResult>,
}

impl ChannelStats {
    fn new(channel: &Channel, clients: Vec<ClientStats>) -> Self {
        let depth_ts = channel.depth_ts.load(Ordering::Relaxed);
        Self {
            channel_name: channel.name().to_string(),
            depth: channel.depth.load(Ordering::Relaxed),
            depth_size: channel.depth_size.load(Ordering::Relaxed),
            depth_ts: DateTime::from_timestamp_nanos(depth_ts).to_string(),
            backend_depth: channel.backend_depth.load(Ordering::Relaxed),
            hourly_subsize: 0,
            in_flight_count: channel.in_flight_count.load(Ordering::Relaxed),
            deferred_count: channel.deferred_count.load(Ordering::Relaxed),
            message_count: channel.message_count.load(Ordering::Relaxed),
            requeue_count: channel.requeue_count.load(Ordering::Relaxed),
            timeout_count: channel.timeout_count.load(Ordering::Relaxed),
            clients,
            paused: channel.is_paused(),
            e2e_processing_latency: channel.e2e_latency(),
        }
    }
}

/// Frozen statistics for one topic partition.
#[derive(Debug, Clone, Serialize)]
pub struct TopicStats {
    pub topic_name: String,
    pub topic_full_name: String,
    pub topic_partition: String,
    pub channels: Vec<ChannelStats>,
    pub depth: i64,
    pub backend_depth: i64,
    pub backend_start: i64,
    pub message_count: u64,
    pub is_leader: bool,
    pub hourly_pubsize: i64,
    #[serde(rename = "client_pub_stats")]
    pub clients: Vec<ClientPubStats>,
    pub msg_size_stats: Vec<i64>,
    pub msg_write_latency_stats: Vec<i64>,
    pub e2e_processing_latency: Option<QuantileResult>,
}

impl TopicStats {
    fn new(topic: &Topic, channels: Vec<ChannelStats>) -> Self {
        let detail = &topic.detail_stats;
        Self {
            topic_name: topic.name().to_string(),
            topic_full_name: topic.full_name().to_string(),
            topic_partition: topic.partition().to_string(),
            channels,
            depth: topic.total_data_size(),
            backend_depth: topic.total_data_size(),
            backend_start: topic.queue_read_start.load(Ordering::Relaxed),
            message_count: topic.total_msg_count(),
            is_leader: !topic.is_write_disabled(),
            hourly_pubsize: detail.hourly_pub_size().iter().sum(),
            clients: detail.pub_client_stats(),
            msg_size_stats: detail.msg_size_stats().to_vec(),
            msg_write_latency_stats: detail.msg_write_latency_stats().to_vec(),
            e2e_processing_latency: topic.e2e_latency(),
        }
    }
}

impl TopicRegistry {
    /// Snapshot every topic, sorted by full name.
    pub fn stats(&self) -> Vec<TopicStats> {
        assemble(self.topic_handles())
    }

    /// Snapshot the partitions of one base topic name, sorted by full
    /// name. An unknown name yields an empty vec.
    pub fn topic_stats(&self, name: &str) -> Vec<TopicStats> {
        assemble(self.topic_handles_by_name(name))
    }
}

fn assemble(mut topics: Vec<Arc<Topic>>) -> Vec<TopicStats> {
    topics.sort_by(|a, b| a.full_name().cmp(b.full_name()));
    let mut out = Vec::with_capacity(topics.len());
    for topic in &topics {
        let mut channels = topic.channel_handles();
        channels.sort_by(|a, b| a.name().cmp(b.name()));
        let mut channel_stats = Vec::with_capacity(channels.len());
        for channel in &channels {
            let clients: Vec<_> = channel
                .client_sources()
                .iter()
                .map(|c| c.stats())
                .collect();
            channel_stats.push(ChannelStats::new(channel, clients));
        }
        out.push(TopicStats::new(topic, channel_stats));
    }
    out
}
