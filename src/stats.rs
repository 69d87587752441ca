//! Summary statistics over the per-call latencies of one evaluation.

use std::time::Duration;

use hdrhistogram::Histogram;

/// Histogram upper bound: 10 minutes in microseconds
const MAX_TRACKABLE_US: u64 = 600_000_000;

/// Latency summary for a measured row
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyStats {
    pub count: usize,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    /// Mean absolute difference between consecutive samples
    pub jitter: Duration,
    pub p50: Duration,
    pub p95: Duration,
}

impl LatencyStats {
    /// Summarize samples in call order; `None` for an empty slice
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let min = samples.iter().copied().min()?;
        let max = samples.iter().copied().max()?;
        let mean = mean(samples);

        let jitter = if samples.len() < 2 {
            Duration::ZERO
        } else {
            let diffs: Vec<Duration> = samples
                .windows(2)
                .map(|pair| abs_diff(pair[0], pair[1]))
                .collect();
            self::mean(&diffs)
        };

        // Histogram buckets report their upper edge, keep quantiles inside the sample range
        let (p50, p95) = percentiles(samples).unwrap_or((mean, max));
        let p50 = p50.clamp(min, max);
        let p95 = p95.clamp(min, max);

        Some(Self {
            count: samples.len(),
            min,
            max,
            mean,
            jitter,
            p50,
            p95,
        })
    }
}

/// Arithmetic mean; zero for an empty slice
pub fn mean(samples: &[Duration]) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let total: u128 = samples.iter().map(Duration::as_nanos).sum();
    Duration::from_nanos((total / samples.len() as u128) as u64)
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}

fn percentiles(samples: &[Duration]) -> Option<(Duration, Duration)> {
    let mut hist = Histogram::<u64>::new_with_bounds(1, MAX_TRACKABLE_US, 3).ok()?;
    for sample in samples {
        let us = (sample.as_micros() as u64).clamp(1, MAX_TRACKABLE_US);
        hist.record(us).ok()?;
    }

    let p50 = Duration::from_micros(hist.value_at_quantile(0.50));
    let p95 = Duration::from_micros(hist.value_at_quantile(0.95));
    Some((p50, p95))
}
