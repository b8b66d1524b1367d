//! Per-topic message size and write latency histograms.
//!
//! Fixed 16-bucket counter arrays updated with atomic increments on the
//! publish hot path. No locks; safe from any number of concurrent callers.

use std::sync::atomic::{AtomicI64, Ordering};

/// Number of buckets in each histogram.
pub const BUCKET_COUNT: usize = 16;

/// Message size and write latency distributions for one topic.
///
/// Size buckets: <100B, <1KB, 2KB, 4KB, 8KB, ... 4MB and above.
/// Latency buckets: <1024us, 2ms, 4ms, 8ms, ... 8s and above.
#[derive(Debug, Default)]
pub struct TopicMsgStats {
    msg_size_stats: [AtomicI64; BUCKET_COUNT],
    msg_write_latency_stats: [AtomicI64; BUCKET_COUNT],
}

/// Bucket index for a message size in bytes.
#[inline]
pub fn size_bucket(size: i64) -> usize {
    let bucket = if size < 100 {
        0
    } else if size < 1024 {
        1
    } else {
        (size / 1024).ilog2() as usize + 2
    };
    bucket.min(BUCKET_COUNT - 1)
}

/// Bucket index for a write latency in microseconds.
#[inline]
pub fn latency_bucket(latency_us: i64) -> usize {
    let bucket = if latency_us < 1024 {
        0
    } else {
        (latency_us / 1024).ilog2() as usize + 1
    };
    bucket.min(BUCKET_COUNT - 1)
}

impl TopicMsgStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_size(&self, size: i64) {
        self.msg_size_stats[size_bucket(size)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_latency(&self, latency_us: i64) {
        self.msg_write_latency_stats[latency_bucket(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    /// Record one message event. A non-positive field is skipped so callers
    /// can report size-only or latency-only events without polluting
    /// bucket 0 of the other histogram; if both are non-positive, nothing
    /// is recorded.
    pub fn record(&self, size: i64, latency_us: i64) {
        if size <= 0 && latency_us <= 0 {
            return;
        }
        if size > 0 {
            self.record_size(size);
        }
        if latency_us > 0 {
            self.record_latency(latency_us);
        }
    }

    /// Copy of the size histogram.
    pub fn size_stats(&self) -> [i64; BUCKET_COUNT] {
        let mut out = [0i64; BUCKET_COUNT];
        for (slot, counter) in out.iter_mut().zip(self.msg_size_stats.iter()) {
            *slot = counter.load(Ordering::Relaxed);
        }
        out
    }

    /// Copy of the write latency histogram.
    pub fn write_latency_stats(&self) -> [i64; BUCKET_COUNT] {
        let mut out = [0i64; BUCKET_COUNT];
        for (slot, counter) in out.iter_mut().zip(self.msg_write_latency_stats.iter()) {
            *slot = counter.load(Ordering::Relaxed);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bucket_boundaries() {
        assert_eq!(size_bucket(0), 0);
        assert_eq!(size_bucket(99), 0);
        assert_eq!(size_bucket(100), 1);
        assert_eq!(size_bucket(1023), 1);
        assert_eq!(size_bucket(1024), 2);
        assert_eq!(size_bucket(2047), 2);
        assert_eq!(size_bucket(2048), 3);
        assert_eq!(size_bucket(4 * 1024), 4);
        assert_eq!(size_bucket(1024 * 1024), 12);
        assert_eq!(size_bucket(4 * 1024 * 1024), 14);
    }

    #[test]
    fn test_size_bucket_clamped_and_monotonic() {
        let mut prev = 0;
        for shift in 0..40 {
            let size = 1i64 << shift;
            let b = size_bucket(size);
            assert!(b < BUCKET_COUNT);
            assert!(b >= prev, "bucket decreased at size {}", size);
            prev = b;
        }
        assert_eq!(size_bucket(i64::MAX), BUCKET_COUNT - 1);
    }

    #[test]
    fn test_latency_bucket_boundaries() {
        assert_eq!(latency_bucket(0), 0);
        assert_eq!(latency_bucket(1023), 0);
        assert_eq!(latency_bucket(1024), 1);
        assert_eq!(latency_bucket(2048), 2);
        assert_eq!(latency_bucket(1024 * 1024), 11);
        assert_eq!(latency_bucket(8 * 1024 * 1024), 14);
        assert_eq!(latency_bucket(i64::MAX), BUCKET_COUNT - 1);
    }

    #[test]
    fn test_latency_bucket_monotonic() {
        let mut prev = 0;
        for shift in 0..40 {
            let b = latency_bucket(1i64 << shift);
            assert!(b < BUCKET_COUNT);
            assert!(b >= prev);
            prev = b;
        }
    }

    #[test]
    fn test_record_both_positive() {
        let stats = TopicMsgStats::new();
        stats.record(500, 500);
        assert_eq!(stats.size_stats()[1], 1);
        assert_eq!(stats.write_latency_stats()[0], 1);
    }

    #[test]
    fn test_record_latency_only() {
        let stats = TopicMsgStats::new();
        stats.record(0, 500);
        assert_eq!(stats.size_stats(), [0i64; BUCKET_COUNT]);
        assert_eq!(stats.write_latency_stats()[0], 1);
    }

    #[test]
    fn test_record_size_only() {
        let stats = TopicMsgStats::new();
        stats.record(500, 0);
        assert_eq!(stats.size_stats()[1], 1);
        assert_eq!(stats.write_latency_stats(), [0i64; BUCKET_COUNT]);
    }

    #[test]
    fn test_record_neither() {
        let stats = TopicMsgStats::new();
        stats.record(0, 0);
        stats.record(-5, -1);
        assert_eq!(stats.size_stats(), [0i64; BUCKET_COUNT]);
        assert_eq!(stats.write_latency_stats(), [0i64; BUCKET_COUNT]);
    }

    #[test]
    fn test_concurrent_records() {
        use std::sync::Arc;
        let stats = Arc::new(TopicMsgStats::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    stats.record(512, 2048);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.size_stats()[1], 4000);
        assert_eq!(stats.write_latency_stats()[2], 4000);
    }
}
