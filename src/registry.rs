//! Broker topic/channel/client registry.
//!
//! An explicit ownership tree: the registry owns its topics, a topic owns
//! its channels and its detail stats, a channel owns its consumer client
//! list. Each level is guarded by its own `RwLock`, acquired only long
//! enough to copy handles out (see `snapshot` for the walk).
//!
//! Counters live here as atomics posted by the broker's data path; this
//! crate only reads them.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};

use crate::detail::TopicDetailStats;
use crate::snapshot::{ClientStats, QuantileResult};

/// Supplies the flat per-connection stats record for a consumer client.
/// Implemented by the broker's client object; opaque to this crate beyond
/// inclusion in snapshots.
pub trait ClientStatsSource: Send + Sync {
    fn stats(&self) -> ClientStats;
}

/// A named consumer group attached to a topic.
pub struct Channel {
    name: String,
    pub depth: AtomicI64,
    pub depth_size: AtomicI64,
    /// Timestamp (Unix ns) of the message at the current depth head.
    pub depth_ts: AtomicI64,
    pub backend_depth: AtomicI64,
    pub in_flight_count: AtomicI64,
    pub deferred_count: AtomicI64,
    pub message_count: AtomicU64,
    pub requeue_count: AtomicU64,
    pub timeout_count: AtomicU64,
    paused: AtomicBool,
    clients: RwLock<Vec<Arc<dyn ClientStatsSource>>>,
    /// End-to-end processing latency, pre-computed by an external
    /// quantile estimator and passed through to snapshots.
    e2e_latency: Mutex<Option<QuantileResult>>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depth: AtomicI64::new(0),
            depth_size: AtomicI64::new(0),
            depth_ts: AtomicI64::new(0),
            backend_depth: AtomicI64::new(0),
            in_flight_count: AtomicI64::new(0),
            deferred_count: AtomicI64::new(0),
            message_count: AtomicU64::new(0),
            requeue_count: AtomicU64::new(0),
            timeout_count: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            clients: RwLock::new(Vec::new()),
            e2e_latency: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn add_client(&self, client: Arc<dyn ClientStatsSource>) {
        self.clients.write().push(client);
    }

    /// Copy of the client handle list, taken under the read lock.
    pub fn client_sources(&self) -> Vec<Arc<dyn ClientStatsSource>> {
        self.clients.read().clone()
    }

    pub fn set_e2e_latency(&self, result: QuantileResult) {
        *self.e2e_latency.lock() = Some(result);
    }

    pub fn e2e_latency(&self) -> Option<QuantileResult> {
        self.e2e_latency.lock().clone()
    }
}

/// A named, partitioned message stream accepting publishes.
pub struct Topic {
    name: String,
    partition: i32,
    full_name: String,
    pub total_data_size: AtomicI64,
    pub total_msg_count: AtomicU64,
    pub queue_read_start: AtomicI64,
    write_disabled: AtomicBool,
    pub detail_stats: TopicDetailStats,
    channels: RwLock<AHashMap<String, Arc<Channel>>>,
    /// Aggregated end-to-end latency across the topic's channels,
    /// pre-computed by an external quantile estimator.
    e2e_latency: Mutex<Option<QuantileResult>>,
}

impl Topic {
    /// `init_pub_size` seeds the hourly window with the cumulative publish
    /// size already persisted for this topic partition.
    pub fn new(name: impl Into<String>, partition: i32, init_pub_size: i64) -> Self {
        let name = name.into();
        let full_name = format!("{}-{}", name, partition);
        Self {
            name,
            partition,
            full_name,
            total_data_size: AtomicI64::new(init_pub_size),
            total_msg_count: AtomicU64::new(0),
            queue_read_start: AtomicI64::new(0),
            write_disabled: AtomicBool::new(false),
            detail_stats: TopicDetailStats::new(init_pub_size),
            channels: RwLock::new(AHashMap::new()),
            e2e_latency: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Composite `name-partition` string; snapshot sort key.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn total_data_size(&self) -> i64 {
        self.total_data_size.load(Ordering::Relaxed)
    }

    pub fn total_msg_count(&self) -> u64 {
        self.total_msg_count.load(Ordering::Relaxed)
    }

    pub fn is_write_disabled(&self) -> bool {
        self.write_disabled.load(Ordering::Relaxed)
    }

    pub fn set_write_disabled(&self, disabled: bool) {
        self.write_disabled.store(disabled, Ordering::Relaxed);
    }

    pub fn set_e2e_latency(&self, result: QuantileResult) {
        *self.e2e_latency.lock() = Some(result);
    }

    pub fn e2e_latency(&self) -> Option<QuantileResult> {
        self.e2e_latency.lock().clone()
    }

    pub fn get_or_create_channel(&self, name: &str) -> Arc<Channel> {
        if let Some(c) = self.channels.read().get(name) {
            return Arc::clone(c);
        }
        let mut channels = self.channels.write();
        Arc::clone(
            channels
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Channel::new(name))),
        )
    }

    pub fn remove_channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.write().remove(name)
    }

    /// Copy of the channel handles, taken under the read lock.
    pub fn channel_handles(&self) -> Vec<Arc<Channel>> {
        self.channels.read().values().cloned().collect()
    }
}

/// Registry of all live topics, keyed by base name with one entry per
/// partition.
#[derive(Default)]
pub struct TopicRegistry {
    topics: RwLock<AHashMap<String, Vec<Arc<Topic>>>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic partition, replacing any existing handle for the
    /// same partition.
    pub fn register_topic(&self, topic: Arc<Topic>) {
        let mut topics = self.topics.write();
        let parts = topics.entry(topic.name().to_string()).or_default();
        parts.retain(|t| t.partition() != topic.partition());
        parts.push(topic);
    }

    pub fn remove_topic(&self, name: &str, partition: i32) -> Option<Arc<Topic>> {
        let mut topics = self.topics.write();
        let parts = topics.get_mut(name)?;
        let idx = parts.iter().position(|t| t.partition() == partition)?;
        let removed = parts.remove(idx);
        if parts.is_empty() {
            topics.remove(name);
        }
        Some(removed)
    }

    pub fn get_topic(&self, name: &str, partition: i32) -> Option<Arc<Topic>> {
        self.topics
            .read()
            .get(name)?
            .iter()
            .find(|t| t.partition() == partition)
            .cloned()
    }

    /// Copy of every topic handle, taken under the read lock.
    pub fn topic_handles(&self) -> Vec<Arc<Topic>> {
        self.topics
            .read()
            .values()
            .flat_map(|parts| parts.iter().cloned())
            .collect()
    }

    /// Copy of the topic handles for one base name, all partitions.
    pub fn topic_handles_by_name(&self, name: &str) -> Vec<Arc<Topic>> {
        self.topics
            .read()
            .get(name)
            .map(|parts| parts.to_vec())
            .unwrap_or_default()
    }

    /// Drive every topic's rolling hourly window with its current
    /// cumulative data size. Must only be called from the single sweeper
    /// thread; handles are copied out first so no registry lock is held
    /// while windows update.
    pub fn update_topic_history_stats(&self) {
        for topic in self.topic_handles() {
            let pub_size = topic.total_data_size();
            topic.detail_stats.update_hourly_size(pub_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let registry = TopicRegistry::new();
        registry.register_topic(Arc::new(Topic::new("orders", 0, 0)));
        registry.register_topic(Arc::new(Topic::new("orders", 1, 0)));

        assert!(registry.get_topic("orders", 0).is_some());
        assert!(registry.get_topic("orders", 2).is_none());
        assert_eq!(registry.topic_handles().len(), 2);
        assert_eq!(registry.topic_handles_by_name("orders").len(), 2);
        assert!(registry.topic_handles_by_name("missing").is_empty());
    }

    #[test]
    fn test_register_replaces_partition() {
        let registry = TopicRegistry::new();
        registry.register_topic(Arc::new(Topic::new("orders", 0, 0)));
        let replacement = Arc::new(Topic::new("orders", 0, 42));
        registry.register_topic(Arc::clone(&replacement));

        let handles = registry.topic_handles();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].total_data_size(), 42);
    }

    #[test]
    fn test_remove_topic() {
        let registry = TopicRegistry::new();
        registry.register_topic(Arc::new(Topic::new("orders", 0, 0)));
        assert!(registry.remove_topic("orders", 0).is_some());
        assert!(registry.remove_topic("orders", 0).is_none());
        assert!(registry.topic_handles().is_empty());
    }

    #[test]
    fn test_topic_full_name() {
        let t = Topic::new("orders", 3, 0);
        assert_eq!(t.full_name(), "orders-3");
        assert_eq!(t.name(), "orders");
        assert_eq!(t.partition(), 3);
    }

    #[test]
    fn test_channel_management() {
        let t = Topic::new("orders", 0, 0);
        let c1 = t.get_or_create_channel("workers");
        let c2 = t.get_or_create_channel("workers");
        assert!(Arc::ptr_eq(&c1, &c2));
        assert_eq!(t.channel_handles().len(), 1);
        assert!(t.remove_channel("workers").is_some());
        assert!(t.channel_handles().is_empty());
    }

    #[test]
    fn test_history_stats_sweep() {
        let registry = TopicRegistry::new();
        let topic = Arc::new(Topic::new("orders", 0, 0));
        registry.register_topic(Arc::clone(&topic));

        topic.total_data_size.store(500, Ordering::Relaxed);
        registry.update_topic_history_stats();
        let total: i64 = topic.detail_stats.hourly_pub_size().iter().sum();
        assert_eq!(total, 500);
    }
}
