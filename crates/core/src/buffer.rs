//! Rolling window of battery level samples.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::Sample;

/// Time-ordered samples for the active session, pruned by age.
///
/// The buffer is unbounded by count. Every retained sample is within
/// `window` of the newest one, and the newest sample is never pruned.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    window: Duration,
}

impl SampleBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window,
        }
    }

    /// Appends a sample and prunes relative to its timestamp.
    ///
    /// Samples with the same timestamp as the newest one are accepted.
    /// Samples older than the newest one are dropped and `false` is returned.
    pub fn append(&mut self, sample: Sample) -> bool {
        if let Some(last) = self.samples.back() {
            if sample.timestamp < last.timestamp {
                return false;
            }
        }
        self.samples.push_back(sample);
        self.prune(sample.timestamp);
        true
    }

    /// Removes samples older than the window, keeping at least the newest.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let window_ms = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);

        while self.samples.len() > 1 {
            let Some(front) = self.samples.front() else {
                break;
            };
            let age_ms = (now - front.timestamp).num_milliseconds();
            if age_ms > window_ms {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn buffer() -> SampleBuffer {
        SampleBuffer::new(Duration::from_secs(90))
    }

    #[test]
    fn test_empty_buffer_has_no_endpoints() {
        let buffer = buffer();
        assert!(buffer.is_empty());
        assert!(buffer.oldest().is_none());
        assert!(buffer.newest().is_none());
    }

    #[test]
    fn test_append_prunes_stale_samples() {
        let mut buffer = buffer();
        buffer.append(Sample::new(at(0), 0.50));
        buffer.append(Sample::new(at(60), 0.51));
        buffer.append(Sample::new(at(120), 0.52));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.oldest().unwrap().timestamp, at(60));
        assert_eq!(buffer.newest().unwrap().timestamp, at(120));
    }

    #[test]
    fn test_sample_exactly_at_window_edge_is_kept() {
        let mut buffer = buffer();
        buffer.append(Sample::new(at(0), 0.50));
        buffer.append(Sample::new(at(90), 0.51));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_equal_timestamps_are_appended() {
        let mut buffer = buffer();
        assert!(buffer.append(Sample::new(at(10), 0.50)));
        assert!(buffer.append(Sample::new(at(10), 0.51)));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_out_of_order_sample_is_dropped() {
        let mut buffer = buffer();
        buffer.append(Sample::new(at(10), 0.50));
        assert!(!buffer.append(Sample::new(at(5), 0.49)));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.newest().unwrap().level, 0.50);
    }

    #[test]
    fn test_newest_sample_survives_stale_prune() {
        let mut buffer = buffer();
        buffer.append(Sample::new(at(0), 0.40));
        buffer.append(Sample::new(at(5), 0.41));

        buffer.prune(at(1_000));

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.newest().unwrap().timestamp, at(5));
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut buffer = buffer();
        for i in 0..30 {
            buffer.append(Sample::new(at(i * 5), 0.40 + i as f64 * 0.001));
        }

        buffer.prune(at(200));
        let once: Vec<Sample> = buffer.iter().copied().collect();
        buffer.prune(at(200));
        let twice: Vec<Sample> = buffer.iter().copied().collect();

        assert_eq!(once, twice);
        assert!(once.iter().all(|s| (at(200) - s.timestamp).num_seconds() <= 90));
    }

    #[test]
    fn test_clear_empties_buffer() {
        let mut buffer = buffer();
        buffer.append(Sample::new(at(0), 0.50));
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
