//! Per-topic detail statistics facade.
//!
//! One instance per topic, living exactly as long as the topic. Composes
//! the message histograms, the rolling hourly window and the bounded
//! publisher map behind the entry points the broker calls:
//! - `update_msg_stats` / `update_pub_client_stats`: publish hot path
//! - `update_hourly_size`: the periodic sweeper, once per interval
//!
//! Read accessors hand out defensive copies only; no lock guard or live
//! array ever escapes.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

use crate::histogram::{TopicMsgStats, BUCKET_COUNT};
use crate::hourly::{local_hour, HourlyPubWindow, HOURS};
use crate::pub_clients::{ClientPubStats, PubClientMap};

/// Unix timestamp in seconds.
fn unix_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Aggregated statistics detail for one topic.
pub struct TopicDetailStats {
    msg_stats: TopicMsgStats,
    hourly: Mutex<HourlyPubWindow>,
    pub_clients: Mutex<PubClientMap>,
    write_err_count: AtomicI64,
}

impl TopicDetailStats {
    /// `init_pub_size` is the topic's already-persisted cumulative publish
    /// size, seeding the hourly window so the first tick records no jump.
    pub fn new(init_pub_size: i64) -> Self {
        Self {
            msg_stats: TopicMsgStats::new(),
            hourly: Mutex::new(HourlyPubWindow::new(local_hour(), init_pub_size)),
            pub_clients: Mutex::new(PubClientMap::new()),
            write_err_count: AtomicI64::new(0),
        }
    }

    /// Record one accepted message: size in bytes, write latency in
    /// microseconds. Non-positive fields are skipped.
    #[inline]
    pub fn update_msg_stats(&self, size: i64, latency_us: i64) {
        self.msg_stats.record(size, latency_us);
    }

    /// Record a publish (or publish error) from a remote publisher.
    /// May stall up to the sweep budget when the map is at capacity.
    pub fn update_pub_client_stats(
        &self,
        remote: &str,
        agent: &str,
        protocol: &str,
        count: i64,
        has_err: bool,
    ) {
        self.pub_clients
            .lock()
            .record(remote, agent, protocol, count, has_err, unix_ts());
    }

    /// Drop the publisher record when its connection is torn down.
    pub fn remove_pub_stats(&self, remote: &str) {
        self.pub_clients.lock().remove(remote);
    }

    #[inline]
    pub fn incr_write_err(&self) {
        self.write_err_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_err_count(&self) -> i64 {
        self.write_err_count.load(Ordering::Relaxed)
    }

    /// Fold the topic's current cumulative publish size into the hourly
    /// window. Called by the sweeper thread only; see the single-writer
    /// contract in `hourly`.
    pub fn update_hourly_size(&self, cur_pub_size: i64) {
        self.hourly.lock().update(local_hour(), cur_pub_size);
    }

    pub fn msg_size_stats(&self) -> [i64; BUCKET_COUNT] {
        self.msg_stats.size_stats()
    }

    pub fn msg_write_latency_stats(&self) -> [i64; BUCKET_COUNT] {
        self.msg_stats.write_latency_stats()
    }

    pub fn hourly_pub_size(&self) -> [i64; HOURS] {
        self.hourly.lock().buckets()
    }

    pub fn pub_client_stats(&self) -> Vec<ClientPubStats> {
        self.pub_clients.lock().snapshot()
    }
}
