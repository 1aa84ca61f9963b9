use std::fmt;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::console::Console;
use crate::device::{Device, IoResult};
use crate::gen::WaveformGenerator;
use crate::pacer::Pacer;
use crate::session::capture::CaptureSink;
use crate::session::config::{JobConfig, JobMode};
use crate::stats::{throughput_bytes_per_sec, RunStats};

/// Why a worker left its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The cancellation token was signaled (stop or timer expiry)
    Cancelled,
    /// The loop or byte budget ran out
    BudgetExhausted,
    /// An acquisition read returned no data and no error
    EndOfStream,
    /// The device could not be opened; the loop never ran
    OpenFailed,
    /// A read or write failed with fatal I/O errors enabled
    FatalIo,
}

impl ExitReason {
    pub fn name(&self) -> &'static str {
        match self {
            ExitReason::Cancelled => "cancelled",
            ExitReason::BudgetExhausted => "budget",
            ExitReason::EndOfStream => "eof",
            ExitReason::OpenFailed => "open-failed",
            ExitReason::FatalIo => "fatal-io",
        }
    }
}

/// Summary of one worker run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: JobMode,
    pub exit: ExitReason,
    /// Total bytes moved, or the open failure
    pub result: IoResult,
    pub cycles: u64,
    pub io_errors: u64,
    pub last_error: Option<String>,
    pub p50: Duration,
    pub p95: Duration,
    pub elapsed: Duration,
    pub throughput: f64,
}

impl RunReport {
    fn open_failed(mode: JobMode, reason: String, elapsed: Duration) -> Self {
        Self {
            mode,
            exit: ExitReason::OpenFailed,
            result: IoResult::failed(reason.clone()),
            cycles: 0,
            io_errors: 1,
            last_error: Some(reason),
            p50: Duration::ZERO,
            p95: Duration::ZERO,
            elapsed,
            throughput: 0.0,
        }
    }

    pub fn bytes(&self) -> usize {
        self.result.count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode={} exit={} {} cycles={} errors={} p50={:.3}ms p95={:.3}ms elapsed={:.3}s throughput={:.1}B/s",
            self.mode,
            self.exit.name(),
            self.result,
            self.cycles,
            self.io_errors,
            self.p50.as_secs_f64() * 1e3,
            self.p95.as_secs_f64() * 1e3,
            self.elapsed.as_secs_f64(),
            self.throughput,
        )
    }
}

/// Closes the device when dropped, so every exit path (including a panic
/// inside the loop) releases it exactly once.
struct DeviceGuard {
    device: Box<dyn Device>,
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.device.close();
        log::debug!("{} device closed", self.device.kind());
    }
}

/// Paced read or write loop bound to one device for one run.
pub struct Worker {
    mode: JobMode,
    device: Box<dyn Device>,
    locator: String,
    chunk: usize,
    rate: Option<f64>,
    sample_budget: Option<u64>,
    loop_budget: Option<u64>,
    generator: Option<WaveformGenerator>,
    capture_path: Option<String>,
    echo: bool,
    fatal_io_errors: bool,
    token: CancellationToken,
    console: Console,
}

impl Worker {
    pub fn new(
        mode: JobMode,
        config: &JobConfig,
        device: Box<dyn Device>,
        locator: impl Into<String>,
        token: CancellationToken,
        console: Console,
    ) -> Self {
        let generator = match mode {
            JobMode::Generate => Some(WaveformGenerator::new(config.waveform(), config.amplitude)),
            JobMode::Acquire => None,
        };

        Self {
            mode,
            device,
            locator: locator.into(),
            chunk: config.chunk_size(),
            rate: config.rate,
            sample_budget: config.sample_count,
            loop_budget: config.loop_count,
            generator,
            capture_path: config.capture_path(mode).map(str::to_string),
            echo: config.echo,
            fatal_io_errors: config.fatal_io_errors,
            token,
            console,
        }
    }

    /// Open the device, loop until cancelled or out of budget, then close it.
    ///
    /// The token is signaled on the way out so a companion timer stops too.
    pub fn run(self) -> RunReport {
        let token = self.token.clone();
        let report = self.run_inner();
        token.signal();
        report
    }

    fn run_inner(self) -> RunReport {
        let Worker {
            mode,
            device,
            locator,
            chunk,
            rate,
            sample_budget,
            loop_budget,
            mut generator,
            capture_path,
            echo,
            fatal_io_errors,
            token,
            console,
        } = self;

        let started = Instant::now();
        let mut guard = DeviceGuard { device };
        let kind = guard.device.kind();

        if let Err(e) = guard.device.open(&locator) {
            log::error!("{} open failed: {}", kind, e);
            return RunReport::open_failed(mode, e.to_string(), started.elapsed());
        }
        log::info!("{} worker running on {} '{}' (chunk={})", mode, kind, locator, chunk);

        let mut sink = capture_path.and_then(|path| match CaptureSink::create(&path, rate) {
            Ok(sink) => Some(sink),
            Err(e) => {
                log::warn!("capture to '{}' disabled: {}", path, e);
                None
            }
        });

        let mut pacer = Pacer::new(rate.unwrap_or(0.0));
        let mut stats = RunStats::new();
        let mut buf = vec![0u8; chunk];
        let mut total: u64 = 0;
        let mut cycles: u64 = 0;
        let mut io_errors: u64 = 0;
        let mut last_error: Option<String> = None;

        pacer.start();

        let nothing_to_do = loop_budget == Some(0) || sample_budget == Some(0);
        let exit = if nothing_to_do {
            ExitReason::BudgetExhausted
        } else {
            loop {
                let cycle_start = Instant::now();
                let want = match sample_budget {
                    Some(budget) => (budget.saturating_sub(total)).min(chunk as u64) as usize,
                    None => chunk,
                };

                let result = match mode {
                    JobMode::Acquire => guard.device.read(&mut buf[..want]),
                    JobMode::Generate => {
                        buf.clear();
                        if let Some(gen) = generator.as_mut() {
                            gen.fill(&mut buf, want);
                        }
                        guard.device.write(&buf)
                    }
                };
                stats.mark_interval(cycle_start.elapsed());
                cycles += 1;

                if result.is_ok() {
                    let n = result.count().min(want);
                    total += n as u64;

                    if mode == JobMode::Acquire && n > 0 {
                        let data = &buf[..n];
                        if echo {
                            console.line(format!(
                                "[scope] +{:.3}s  {}",
                                started.elapsed().as_secs_f64(),
                                hex_dump(data)
                            ));
                        }
                        if let Some(capture) = sink.as_mut() {
                            if let Err(e) = capture.append(data) {
                                log::warn!("capture write failed, disabling capture: {}", e);
                                sink = None;
                            }
                        }
                    }
                } else {
                    io_errors += 1;
                    log::warn!("{} cycle {}: {}", mode, cycles, result);
                    last_error = result.error.clone();
                    if fatal_io_errors {
                        break ExitReason::FatalIo;
                    }
                }

                if token.is_signaled() {
                    break ExitReason::Cancelled;
                }

                if mode == JobMode::Acquire && result.is_ok() && result.bytes == 0 && want > 0 {
                    break ExitReason::EndOfStream;
                }

                let loops_done = loop_budget.map_or(false, |loops| cycles >= loops);
                let bytes_done = sample_budget.map_or(false, |budget| total >= budget);
                if loops_done || bytes_done {
                    break ExitReason::BudgetExhausted;
                }

                pacer.sleep_until_next();
            }
        };

        if let Some(capture) = sink.take() {
            if let Err(e) = capture.finish() {
                log::warn!("failed to finish capture: {}", e);
            }
        }

        let elapsed = started.elapsed();
        if pacer.resyncs() > 0 {
            log::debug!("pacer dropped its schedule {} times", pacer.resyncs());
        }
        log::info!("{} worker exiting ({})", mode, exit.name());

        RunReport {
            mode,
            exit,
            result: IoResult {
                bytes: total as i64,
                error: last_error.clone(),
            },
            cycles,
            io_errors,
            last_error,
            p50: stats.p50(),
            p95: stats.p95(),
            elapsed,
            throughput: throughput_bytes_per_sec(total, elapsed),
        }
    }
}

/// Space separated lowercase hex, as printed by the scope view
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[]), "");
        assert_eq!(hex_dump(&[0x00, 0xab, 0x7f]), "00 ab 7f");
    }
}
