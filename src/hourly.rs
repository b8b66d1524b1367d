//! Rolling hourly publish-volume window.
//!
//! 24 buckets indexed by wall-clock hour-of-day. The updater receives the
//! topic's cumulative published byte count and attributes the delta since
//! the previous call to the current hour's bucket. Driving a replica with
//! the same cumulative counter as the leader converges both to the same
//! per-hour deltas without replicating the deltas themselves.
//!
//! Single-writer: the read-modify-write across `last_hour`,
//! `last_pub_size` and the bucket slot is not atomic as a unit, so
//! `update` takes `&mut self` and the one production caller is the
//! sweeper thread (see `sweeper`), behind the owning facade's mutex.

use chrono::Timelike;

/// Number of hour-of-day slots.
pub const HOURS: usize = 24;

/// Current wall-clock hour of day (0-23, local time).
pub fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

/// Per-topic rolling window of hourly published byte counts.
#[derive(Debug)]
pub struct HourlyPubWindow {
    last_hour: u32,
    last_pub_size: i64,
    buckets: [i64; HOURS],
}

impl HourlyPubWindow {
    /// Seed with the topic's already-persisted cumulative publish size so
    /// the first update does not record the topic's whole history as one
    /// spurious delta.
    pub fn new(now_hour: u32, init_pub_size: i64) -> Self {
        Self {
            last_hour: now_hour,
            last_pub_size: init_pub_size,
            buckets: [0; HOURS],
        }
    }

    /// Fold the delta since the last observed cumulative size into the
    /// current hour's bucket, rolling the window forward first if the
    /// wall-clock hour advanced.
    ///
    /// The comparison is strict on hour-of-day, so a rollover across
    /// midnight (23 -> 0) is not detected and the delta stays in bucket
    /// 23 until the hour climbs above 23's successor the next day. Kept
    /// as observed behavior; consumers depend on the output shape.
    pub fn update(&mut self, now_hour: u32, cur_pub_size: i64) {
        let mut bucket = self.last_hour as usize % HOURS;
        if now_hour > self.last_hour {
            bucket = (bucket + 1) % HOURS;
            self.buckets[bucket] = 0;
            self.last_hour = now_hour;
        }
        self.buckets[bucket] += cur_pub_size - self.last_pub_size;
        self.last_pub_size = cur_pub_size;
    }

    /// Copy of all 24 hourly buckets.
    pub fn buckets(&self) -> [i64; HOURS] {
        self.buckets
    }

    /// Total bytes across the whole window.
    pub fn total(&self) -> i64 {
        self.buckets.iter().sum()
    }
}
