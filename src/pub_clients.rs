//! Bounded per-publisher statistics map.
//!
//! Tracks publish/error counters per remote publisher address, capped at
//! [`MAX_TRACKED_PUB_CLIENTS`] live entries per topic. When an insert
//! would exceed the cap, a time-boxed sweep evicts entries idle for more
//! than an hour and the new client is silently not tracked this round.
//! Best effort by design: bounded memory wins over long-tail stat
//! completeness, and the underlying publish is never affected.

use std::time::Instant;

use ahash::AHashMap;
use log::info;
use serde::Serialize;

/// Maximum tracked publisher addresses per topic.
pub const MAX_TRACKED_PUB_CLIENTS: usize = 1000;

/// Wall-clock budget for one stale-entry sweep.
pub const SWEEP_TIME_BUDGET: std::time::Duration = std::time::Duration::from_millis(200);

/// Entries idle longer than this are evicted by the sweep.
pub const STALE_PUB_CLIENT_SECS: i64 = 60 * 60;

/// Publish counters for one remote publisher address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientPubStats {
    pub remote_address: String,
    pub user_agent: String,
    pub protocol: String,
    pub pub_count: i64,
    pub err_count: i64,
    pub last_pub_ts: i64,
}

/// Capacity-bounded map from remote address to publish counters.
///
/// Not internally synchronized; the owning [`TopicDetailStats`] guards it
/// with a single mutex held for the full duration of every operation.
///
/// [`TopicDetailStats`]: crate::detail::TopicDetailStats
#[derive(Debug, Default)]
pub struct PubClientMap {
    clients: AHashMap<String, ClientPubStats>,
}

impl PubClientMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Record one publish (or publish error) from `remote`.
    ///
    /// Unknown addresses are inserted while the map is below capacity. At
    /// capacity, a bounded sweep runs instead and the event is dropped for
    /// tracking purposes only; counters for known addresses always update.
    pub fn record(
        &mut self,
        remote: &str,
        agent: &str,
        protocol: &str,
        count: i64,
        has_err: bool,
        now_ts: i64,
    ) {
        if !self.clients.contains_key(remote) && self.clients.len() >= MAX_TRACKED_PUB_CLIENTS {
            // Too many publishers on this topic; evict what we can within
            // the budget and skip tracking this one.
            self.sweep_stale(now_ts);
            return;
        }
        let stats = self
            .clients
            .entry(remote.to_string())
            .or_insert_with(|| ClientPubStats {
                remote_address: remote.to_string(),
                user_agent: agent.to_string(),
                protocol: protocol.to_string(),
                ..Default::default()
            });
        if has_err {
            stats.err_count += 1;
        } else {
            stats.pub_count += count;
            stats.last_pub_ts = now_ts;
        }
    }

    /// Drop the entry for a disconnected publisher.
    pub fn remove(&mut self, remote: &str) {
        self.clients.remove(remote);
    }

    /// Value copies of all current records, iteration order unspecified.
    pub fn snapshot(&self) -> Vec<ClientPubStats> {
        self.clients.values().cloned().collect()
    }

    /// Scan for up to [`SWEEP_TIME_BUDGET`], evicting entries whose last
    /// publish is more than [`STALE_PUB_CLIENT_SECS`] old.
    fn sweep_stale(&mut self, now_ts: i64) {
        let scan_start = Instant::now();
        let mut scanned = 0usize;
        let mut cleaned = 0usize;
        self.clients.retain(|_, stats| {
            if scan_start.elapsed() > SWEEP_TIME_BUDGET {
                return true;
            }
            scanned += 1;
            if now_ts - stats.last_pub_ts > STALE_PUB_CLIENT_SECS {
                cleaned += 1;
                false
            } else {
                true
            }
        });
        info!(
            "pub stats sweep cost {:?}, scan: {}, clean: {}, left: {}",
            scan_start.elapsed(),
            scanned,
            cleaned,
            self.clients.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn fill(map: &mut PubClientMap, n: usize, last_pub_ts: i64) {
        for i in 0..n {
            map.record(&format!("10.0.0.{}:{}", i / 250, i), "agent", "tcp", 1, false, last_pub_ts);
        }
    }

    #[test]
    fn test_record_new_and_existing() {
        let mut map = PubClientMap::new();
        map.record("127.0.0.1:5150", "pub-client/1.0", "tcp", 3, false, NOW);
        map.record("127.0.0.1:5150", "pub-client/1.0", "tcp", 2, false, NOW + 5);
        let snap = map.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].pub_count, 5);
        assert_eq!(snap[0].err_count, 0);
        assert_eq!(snap[0].last_pub_ts, NOW + 5);
    }

    #[test]
    fn test_error_does_not_stamp_last_pub() {
        let mut map = PubClientMap::new();
        map.record("127.0.0.1:5150", "a", "tcp", 1, false, NOW);
        map.record("127.0.0.1:5150", "a", "tcp", 7, true, NOW + 100);
        let snap = map.snapshot();
        assert_eq!(snap[0].pub_count, 1);
        assert_eq!(snap[0].err_count, 1);
        assert_eq!(snap[0].last_pub_ts, NOW);
    }

    #[test]
    fn test_cap_rejects_fresh_map() {
        let mut map = PubClientMap::new();
        fill(&mut map, MAX_TRACKED_PUB_CLIENTS, NOW);
        assert_eq!(map.len(), MAX_TRACKED_PUB_CLIENTS);

        let start = Instant::now();
        map.record("192.168.1.1:5000", "a", "tcp", 1, false, NOW);
        // Nothing stale, so nothing evicted and the newcomer is dropped.
        assert_eq!(map.len(), MAX_TRACKED_PUB_CLIENTS);
        assert!(map.snapshot().iter().all(|s| s.remote_address != "192.168.1.1:5000"));
        assert!(start.elapsed() < SWEEP_TIME_BUDGET + std::time::Duration::from_millis(50));
    }

    #[test]
    fn test_cap_update_existing_still_allowed() {
        let mut map = PubClientMap::new();
        fill(&mut map, MAX_TRACKED_PUB_CLIENTS, NOW);
        map.record("10.0.0.0:0", "agent", "tcp", 4, false, NOW + 1);
        let snap = map.snapshot();
        let s = snap.iter().find(|s| s.remote_address == "10.0.0.0:0").unwrap();
        assert_eq!(s.pub_count, 5);
    }

    #[test]
    fn test_sweep_evicts_stale() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut map = PubClientMap::new();
        fill(&mut map, MAX_TRACKED_PUB_CLIENTS - 1, NOW);
        map.record("10.9.9.9:1", "agent", "tcp", 1, false, NOW - STALE_PUB_CLIENT_SECS - 10);
        assert_eq!(map.len(), MAX_TRACKED_PUB_CLIENTS);

        // Triggers the sweep; the stale entry goes, the newcomer is still
        // not inserted this round.
        map.record("192.168.1.1:5000", "a", "tcp", 1, false, NOW);
        assert_eq!(map.len(), MAX_TRACKED_PUB_CLIENTS - 1);
        assert!(map.snapshot().iter().all(|s| s.remote_address != "10.9.9.9:1"));
        assert!(map.snapshot().iter().all(|s| s.remote_address != "192.168.1.1:5000"));

        // Below the cap again, a later publish inserts normally.
        map.record("192.168.1.1:5000", "a", "tcp", 1, false, NOW);
        assert_eq!(map.len(), MAX_TRACKED_PUB_CLIENTS);
    }

    #[test]
    fn test_remove() {
        let mut map = PubClientMap::new();
        map.record("127.0.0.1:5150", "a", "tcp", 1, false, NOW);
        map.remove("127.0.0.1:5150");
        assert!(map.is_empty());
        // Removing an absent key is a no-op.
        map.remove("127.0.0.1:5150");
    }

    #[test]
    fn test_serialized_field_names() {
        let mut map = PubClientMap::new();
        map.record("127.0.0.1:5150", "a", "tcp", 1, false, NOW);
        let json = serde_json::to_value(&map.snapshot()[0]).unwrap();
        assert_eq!(json["remote_address"], "127.0.0.1:5150");
        assert_eq!(json["pub_count"], 1);
        assert_eq!(json["err_count"], 0);
        assert_eq!(json["last_pub_ts"], NOW);
    }
}
