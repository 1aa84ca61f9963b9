use std::io;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::console::Console;

/// Cadence of the "s left" progress lines
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// How often the timer looks at the token between reports
const POLL_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerExit {
    /// The full duration elapsed
    Expired,
    /// The token was signaled first
    Stopped,
}

/// Bounds a session: counts down, then signals the token.
pub struct TimerTask {
    duration: Duration,
    token: CancellationToken,
    console: Console,
}

impl TimerTask {
    pub fn new(duration: Duration, token: CancellationToken, console: Console) -> Self {
        Self {
            duration,
            token,
            console,
        }
    }

    pub fn spawn(self) -> io::Result<JoinHandle<TimerExit>> {
        std::thread::Builder::new()
            .name("scopegen-timer".to_string())
            .spawn(move || self.run())
    }

    /// Run to completion on the current thread.
    ///
    /// The token is signaled on every exit, including when it was already set.
    pub fn run(self) -> TimerExit {
        let start = Instant::now();
        // A deadline past the end of the clock is never reached
        let deadline = start.checked_add(self.duration);
        let mut next_report = start;

        let exit = loop {
            let now = Instant::now();
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(now),
                None => self.duration.saturating_sub(now - start),
            };
            if remaining.is_zero() {
                break TimerExit::Expired;
            }
            if self.token.is_signaled() {
                break TimerExit::Stopped;
            }

            if now >= next_report {
                let secs_left = remaining.as_secs_f64().ceil() as u64;
                self.console.line(format!("[timer] {} s left", secs_left));
                next_report += REPORT_INTERVAL;
            }

            std::thread::sleep(POLL_SLICE.min(remaining));
        };

        self.console.line("[timer] done");
        self.token.signal();
        exit
    }
}
