//! Synthetic record batches for the write phase.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use logstore_client::LogEvent;
use rand::distr::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Number of records in a batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Source of record timestamps, in nanoseconds since the Unix epoch.
pub trait Clock: fmt::Debug + Send {
    /// Returns the current time.
    fn now_nanos(&self) -> i64;
}

/// A [`Clock`] reading the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since_epoch| i64::try_from(since_epoch.as_nanos()).unwrap_or(i64::MAX))
            .unwrap_or_default()
    }
}

/// Produces reusable batches of fixed-size records.
///
/// All records of a batch share one payload buffer. Between writes only the timestamps change,
/// see [`refresh_timestamps`](Self::refresh_timestamps).
#[derive(Debug)]
pub struct RecordFactory<C = SystemClock> {
    record_size: usize,
    batch_size: usize,
    clock: C,
    rng: SmallRng,
    /// The last timestamp handed out, so that refreshes never repeat one.
    last_timestamp: i64,
}

impl RecordFactory {
    /// Creates a factory for records of `record_size` bytes, timestamped by the system clock.
    pub fn new(record_size: usize) -> Self {
        Self::with_clock(record_size, SystemClock)
    }
}

impl<C: Clock> RecordFactory<C> {
    /// Creates a factory for records of `record_size` bytes, timestamped by `clock`.
    pub fn with_clock(record_size: usize, clock: C) -> Self {
        Self {
            record_size,
            batch_size: DEFAULT_BATCH_SIZE,
            clock,
            rng: SmallRng::from_os_rng(),
            last_timestamp: i64::MIN,
        }
    }

    /// Sets the number of records per batch. A batch holds at least one record.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Seeds the payload generator, making payload contents reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// The payload size of every record.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Creates a new batch with fresh, strictly increasing timestamps.
    pub fn make_batch(&mut self) -> Vec<LogEvent> {
        let payload: Vec<u8> = (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(self.record_size)
            .collect();
        let payload = Bytes::from(payload);

        let mut batch = vec![LogEvent::new(0, payload); self.batch_size];
        self.refresh_timestamps(&mut batch);
        batch
    }

    /// Rewrites all timestamps of `batch` to a strictly increasing sequence starting at "now".
    ///
    /// If the clock has not moved past the previous refresh, the sequence continues after the
    /// last timestamp handed out instead.
    pub fn refresh_timestamps(&mut self, batch: &mut [LogEvent]) {
        let mut timestamp = self
            .clock
            .now_nanos()
            .max(self.last_timestamp.saturating_add(1));

        for event in batch.iter_mut() {
            event.timestamp = timestamp;
            timestamp = timestamp.saturating_add(1);
        }

        if !batch.is_empty() {
            self.last_timestamp = timestamp - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// A clock that never advances.
    #[derive(Debug)]
    struct FrozenClock(i64);

    impl Clock for FrozenClock {
        fn now_nanos(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn batch_has_fixed_size_payloads() {
        let mut factory = RecordFactory::new(100);
        let batch = factory.make_batch();

        assert_eq!(batch.len(), DEFAULT_BATCH_SIZE);
        assert!(batch.iter().all(|event| event.message.len() == 100));
        assert!(batch.iter().all(|event| event.message == batch[0].message));
    }

    #[test]
    fn empty_payloads_are_fine() {
        let mut factory = RecordFactory::new(0).batch_size(3);
        let batch = factory.make_batch();

        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|event| event.message.is_empty()));
    }

    #[test]
    fn timestamps_start_at_now() {
        let mut factory = RecordFactory::with_clock(8, FrozenClock(1_000)).batch_size(4);
        let batch = factory.make_batch();

        let timestamps: Vec<_> = batch.iter().map(|event| event.timestamp).collect();
        assert_eq!(timestamps, vec![1_000, 1_001, 1_002, 1_003]);
    }

    #[test]
    fn refreshes_never_repeat_a_timestamp() {
        let mut factory = RecordFactory::with_clock(8, FrozenClock(1_000)).batch_size(50);
        let mut batch = factory.make_batch();
        let mut seen: HashSet<i64> = batch.iter().map(|event| event.timestamp).collect();

        for _ in 0..2 {
            factory.refresh_timestamps(&mut batch);
            assert!(batch.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
            for event in &batch {
                assert!(seen.insert(event.timestamp));
            }
        }
    }

    #[test]
    fn system_clock_refresh_is_strictly_increasing() {
        let mut factory = RecordFactory::new(1);
        let mut batch = factory.make_batch();

        factory.refresh_timestamps(&mut batch);
        factory.refresh_timestamps(&mut batch);

        assert!(batch.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn seeded_payloads_are_reproducible() {
        let first = RecordFactory::new(32).seed(7).batch_size(1).make_batch();
        let second = RecordFactory::new(32).seed(7).batch_size(1).make_batch();

        assert_eq!(first[0].message, second[0].message);
    }
}
