use std::time::Duration;

/// Collects per-cycle latencies for one run and summarizes them
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    intervals: Vec<Duration>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_interval(&mut self, dt: Duration) {
        self.intervals.push(dt);
    }

    pub fn p50(&self) -> Duration {
        self.percentile(0.50)
    }

    pub fn p95(&self) -> Duration {
        self.percentile(0.95)
    }

    /// Linear interpolation between the closest ranks; zero when empty.
    pub fn percentile(&self, p: f64) -> Duration {
        let mut sorted = self.intervals.clone();
        sorted.sort_unstable();
        percentile_of_sorted(&sorted, p)
    }
}

fn percentile_of_sorted(sorted: &[Duration], p: f64) -> Duration {
    let Some(last) = sorted.len().checked_sub(1) else {
        return Duration::ZERO;
    };

    let rank = last as f64 * p.clamp(0.0, 1.0);
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(last);
    if lo == hi {
        return sorted[lo];
    }

    let weight = rank - lo as f64;
    let secs = sorted[lo].as_secs_f64() * (1.0 - weight) + sorted[hi].as_secs_f64() * weight;
    Duration::from_secs_f64(secs)
}

/// Bytes per second over `elapsed`; zero when no time has passed.
pub fn throughput_bytes_per_sec(total_bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    total_bytes as f64 / secs
}
