use std::time::{Duration, Instant};

/// How far (in periods) the schedule may fall behind before it is dropped
/// and restarted from the current time.
pub const MAX_LAG_PERIODS: u32 = 10;

/// Fixed-rate scheduler with bounded drift correction.
///
/// Ticks are scheduled on an absolute timeline (`start + k * period`), so
/// jitter in one cycle is absorbed by the next sleep instead of accumulating.
/// When the caller falls more than [`MAX_LAG_PERIODS`] behind, missed ticks
/// are dropped rather than replayed in a burst.
#[derive(Debug, Clone)]
pub struct Pacer {
    period: Option<Duration>,
    next_tick: Instant,
    started: bool,
    resyncs: u64,
}

impl Pacer {
    /// Create a pacer for `rate_hz` ticks per second.
    /// A rate of zero, a negative rate or a non-finite rate disables pacing,
    /// as does a rate so low that its period does not fit in a `Duration`.
    pub fn new(rate_hz: f64) -> Self {
        let period = if rate_hz.is_finite() && rate_hz > 0.0 {
            let period = Duration::try_from_secs_f64(1.0 / rate_hz).ok();
            if period.is_none() {
                log::warn!("rate {} Hz has no representable period, pacing disabled", rate_hz);
            }
            period
        } else {
            None
        };

        Self {
            period,
            next_tick: Instant::now(),
            started: false,
            resyncs: 0,
        }
    }

    /// A pacer that never sleeps
    pub fn disabled() -> Self {
        Self::new(0.0)
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn is_enabled(&self) -> bool {
        self.period.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Anchor the schedule at the current time; the first tick is one period away.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.next_tick = now;
        self.started = true;
        if let Some(period) = self.period {
            self.advance_from(now, period);
        }
    }

    /// Block until the next scheduled tick, then advance the schedule.
    ///
    /// No-op when pacing is disabled or `start()` was never called.
    pub fn sleep_until_next(&mut self) {
        let Some(period) = self.period else {
            return;
        };
        if !self.started {
            return;
        }

        let now = Instant::now();
        if self.next_tick > now {
            std::thread::sleep(self.next_tick - now);
        }

        let scheduled = self.next_tick;
        self.advance_from(scheduled, period);

        let now = Instant::now();
        let behind = now.saturating_duration_since(self.next_tick);
        let too_far = period
            .checked_mul(MAX_LAG_PERIODS)
            .map_or(false, |limit| behind > limit);
        if too_far {
            self.advance_from(now, period);
            self.resyncs += 1;
        }
    }

    /// Schedule the next tick one period after `from`. A tick past the end of
    /// the clock range can never be reached, so pacing is switched off.
    fn advance_from(&mut self, from: Instant, period: Duration) {
        match from.checked_add(period) {
            Some(tick) => self.next_tick = tick,
            None => {
                log::warn!("pacer period {:?} overflows the clock, pacing disabled", period);
                self.period = None;
            }
        }
    }

    /// The instant the next `sleep_until_next` call will wait for
    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    /// How far the schedule currently trails real time (zero when ahead)
    pub fn lag(&self) -> Duration {
        Instant::now().saturating_duration_since(self.next_tick)
    }

    /// Number of times the schedule was dropped and restarted after overload
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::disabled()
    }
}
