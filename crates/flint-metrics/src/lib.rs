//! Latency tracking for the replay and benchmark drivers.

use hdrhistogram::Histogram;

/// Nanosecond latency histogram (3 significant digits).
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new(3).expect("histogram construction cannot fail"),
        }
    }

    /// Record one latency sample in nanoseconds.
    #[inline(always)]
    pub fn record(&mut self, nanos: u64) {
        let _ = self.histogram.record(nanos);
    }

    pub fn p50(&self) -> u64 {
        self.histogram.value_at_quantile(0.50)
    }

    pub fn p99(&self) -> u64 {
        self.histogram.value_at_quantile(0.99)
    }

    pub fn p999(&self) -> u64 {
        self.histogram.value_at_quantile(0.999)
    }

    pub fn max(&self) -> u64 {
        self.histogram.max()
    }

    pub fn mean(&self) -> f64 {
        self.histogram.mean()
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    /// One-line distribution summary for bench output.
    pub fn summary(&self) -> String {
        format!(
            "p50={} p99={} p99.9={} max={} mean={:.0} (n={})",
            format_nanos(self.p50()),
            format_nanos(self.p99()),
            format_nanos(self.p999()),
            format_nanos(self.max()),
            self.mean(),
            self.count(),
        )
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic clock with nanosecond conversion, cheap enough to read per
/// event.
pub struct BenchClock {
    clock: quanta::Clock,
}

impl BenchClock {
    pub fn new() -> Self {
        Self {
            clock: quanta::Clock::new(),
        }
    }

    /// Raw timestamp; convert pairs with [`delta_nanos`](Self::delta_nanos).
    #[inline(always)]
    pub fn now(&self) -> u64 {
        self.clock.raw()
    }

    #[inline(always)]
    pub fn delta_nanos(&self, start: u64, end: u64) -> u64 {
        self.clock.delta_as_nanos(start, end)
    }
}

impl Default for BenchClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable nanoseconds.
pub fn format_nanos(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{nanos}ns")
    } else if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}
