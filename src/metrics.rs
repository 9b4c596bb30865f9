//! Traffic-rate sampling
//!
//! [`TrafficSampler`] counts appended frames per direction and, once per
//! sampling period, turns the counts into a [`MetricSample`] stored in a
//! bounded window. The session actor is the only caller, so a take-and-reset
//! can never race with an append.

use std::collections::VecDeque;

use crate::types::{Direction, MetricSample};

/// Default number of samples kept
pub const DEFAULT_WINDOW: usize = 20;

/// Inbound/outbound counters since the last sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficCounter {
    inbound: u32,
    outbound: u32,
}

impl TrafficCounter {
    pub fn record(&mut self, direction: Direction) {
        match direction {
            Direction::Inbound => self.inbound = self.inbound.saturating_add(1),
            Direction::Outbound => self.outbound = self.outbound.saturating_add(1),
        }
    }

    /// Return `(inbound, outbound)` and reset both to zero
    pub fn take(&mut self) -> (u32, u32) {
        let counts = (self.inbound, self.outbound);
        *self = Self::default();
        counts
    }
}

/// Sliding window of the most recent samples, oldest first
#[derive(Debug, Clone)]
pub struct MetricWindow {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

impl Default for MetricWindow {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_WINDOW)
    }
}

impl MetricWindow {
    /// A capacity of zero is raised to one
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, sample: MetricSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Counter plus window
#[derive(Debug, Clone, Default)]
pub struct TrafficSampler {
    counter: TrafficCounter,
    window: MetricWindow,
}

impl TrafficSampler {
    pub fn new(window: usize) -> Self {
        Self { counter: TrafficCounter::default(), window: MetricWindow::with_capacity(window) }
    }

    pub fn record(&mut self, direction: Direction) {
        self.counter.record(direction);
    }

    /// Close the current bucket
    pub fn sample(&mut self, at_ms: i64, latency_ms: u32) -> MetricSample {
        let (inbound, outbound) = self.counter.take();
        let sample = MetricSample { at_ms, inbound, outbound, latency_ms };
        self.window.push(sample);
        sample
    }

    pub fn window(&self) -> &MetricWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(at_ms: i64) -> MetricSample {
        MetricSample { at_ms, inbound: 0, outbound: 0, latency_ms: 5 }
    }

    #[test]
    fn window_keeps_most_recent_twenty() {
        let mut window = MetricWindow::default();
        for at in 0..25 {
            window.push(sample(at));
        }
        let kept: Vec<_> = window.samples().iter().map(|s| s.at_ms).collect();
        assert_eq!(kept, (5..25).collect::<Vec<_>>());
    }

    #[test]
    fn zero_capacity_is_raised() {
        let mut window = MetricWindow::with_capacity(0);
        window.push(sample(1));
        window.push(sample(2));
        assert_eq!(window.len(), 1);
        assert_eq!(window.latest().map(|s| s.at_ms), Some(2));
    }

    #[test]
    fn sampling_resets_counters() {
        let mut sampler = TrafficSampler::new(DEFAULT_WINDOW);
        sampler.record(Direction::Inbound);
        sampler.record(Direction::Inbound);
        sampler.record(Direction::Outbound);

        let first = sampler.sample(1_000, 7);
        assert_eq!((first.inbound, first.outbound), (2, 1));

        let second = sampler.sample(2_000, 9);
        assert_eq!((second.inbound, second.outbound), (0, 0));
        assert_eq!(sampler.window().len(), 2);
    }
}
