//! Session controller: runs at most one background acquisition or generation
//! job, plus one-shot jobs on the caller's thread.
//!
//! A background job is a worker thread, an optional timer thread and the
//! cancellation token they share. The controller keeps the join handles and
//! the token; `stop` signals the token and waits (bounded) for the worker.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::console::Console;
use crate::device::{default_factory, DeviceFactory};
use crate::error::{SessionError, SessionResult};

pub mod capture;
pub mod config;
pub mod timer;
pub mod worker;

pub use self::config::{JobConfig, JobMode, WaitSpec, LOOP_WAIT_PROXY};
pub use self::timer::{TimerExit, TimerTask};
pub use self::worker::{ExitReason, RunReport, Worker};

/// How long `stop` waits for the worker before abandoning it
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a `stop` command
#[derive(Debug)]
pub enum StopOutcome {
    /// No job was running
    Idle,
    /// The worker closed its device and exited
    Stopped(RunReport),
    /// The worker did not finish within the timeout and was left detached
    Abandoned,
    /// The worker thread panicked; its device guard still closed the device
    Crashed,
}

struct ActiveJob {
    mode: JobMode,
    token: CancellationToken,
    worker: JoinHandle<RunReport>,
    done_rx: Receiver<()>,
    timer: Option<JoinHandle<TimerExit>>,
}

pub struct Session {
    job: Option<ActiveJob>,
    console: Console,
    factory: DeviceFactory,
    stop_timeout: Duration,
}

impl Session {
    pub fn new(console: Console) -> Self {
        Self {
            job: None,
            console,
            factory: default_factory(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Use a custom device constructor instead of locator dispatch
    pub fn with_device_factory(mut self, factory: DeviceFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Whether a background worker is still running
    pub fn is_active(&self) -> bool {
        self.job
            .as_ref()
            .map_or(false, |job| !job.worker.is_finished())
    }

    /// Whether a background job is tracked, running or finished but not yet collected
    pub fn has_job(&self) -> bool {
        self.job.is_some()
    }

    /// Launch a background job and return immediately.
    ///
    /// Rejected with no side effects when the mode or duration is invalid, a
    /// locator is missing, the device cannot be built, or another job is still
    /// running.
    pub fn start(&mut self, config: &JobConfig) -> SessionResult<()> {
        let mode = config.job_mode()?;
        let duration = config.duration()?;
        self.reap_finished();
        if self.job.is_some() {
            return Err(SessionError::JobActive);
        }

        let locator = config.device_locator(mode)?.to_string();
        let device = (self.factory)(&locator, mode.direction())?;
        let token = CancellationToken::new();
        let worker = Worker::new(
            mode,
            config,
            device,
            locator,
            token.clone(),
            self.console.clone(),
        );

        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = std::thread::Builder::new()
            .name("scopegen-worker".to_string())
            .spawn(move || {
                let report = worker.run();
                let _ = done_tx.send(());
                report
            })
            .map_err(SessionError::Spawn)?;

        self.job = Some(ActiveJob {
            mode,
            token: token.clone(),
            worker: handle,
            done_rx,
            timer: None,
        });

        if let Some(duration) = duration {
            match TimerTask::new(duration, token, self.console.clone()).spawn() {
                Ok(timer) => {
                    if let Some(job) = self.job.as_mut() {
                        job.timer = Some(timer);
                    }
                }
                Err(e) => {
                    // Without a timer the session would be unbounded
                    log::error!("failed to spawn timer, stopping job: {}", e);
                    self.stop();
                    return Err(SessionError::Spawn(e));
                }
            }
        }

        self.console
            .line(format!("[session] START launched (mode={})", mode));
        Ok(())
    }

    /// Block the control flow for the requested time.
    ///
    /// `loops` is converted with [`LOOP_WAIT_PROXY`] per loop; it does not
    /// track the worker's actual progress.
    pub fn wait(&mut self, spec: &WaitSpec) -> SessionResult<Duration> {
        let duration = spec.duration()?;
        match spec.loops {
            Some(loops) => self
                .console
                .line(format!("[session] WAIT loops={} (simulated)", loops)),
            None => self
                .console
                .line(format!("[session] WAIT {:.3}s", duration.as_secs_f64())),
        }
        std::thread::sleep(duration);
        Ok(duration)
    }

    /// Signal the background job and wait for it, bounded by the stop timeout.
    ///
    /// Safe to call with nothing running.
    pub fn stop(&mut self) -> StopOutcome {
        let Some(job) = self.job.take() else {
            self.console.line("[session] nothing to stop");
            return StopOutcome::Idle;
        };

        self.console.line(format!(
            "[session] STOP waiting for background {} job...",
            job.mode
        ));
        job.token.signal();
        self.finish_job(job, self.stop_timeout, "STOP")
    }

    /// Run an acquisition on the calling thread until its budget runs out
    pub fn read(&mut self, config: &JobConfig) -> SessionResult<RunReport> {
        self.run_once(JobMode::Acquire, config)
    }

    /// Run a generation on the calling thread until its budget runs out
    pub fn write(&mut self, config: &JobConfig) -> SessionResult<RunReport> {
        self.run_once(JobMode::Generate, config)
    }

    fn run_once(&mut self, mode: JobMode, config: &JobConfig) -> SessionResult<RunReport> {
        if !config.has_budget() {
            return Err(SessionError::MissingBudget(mode.command()));
        }
        let duration = config.duration()?;

        let locator = config.device_locator(mode)?.to_string();
        let device = (self.factory)(&locator, mode.direction())?;
        let token = CancellationToken::new();

        let timer = match duration {
            Some(duration) => Some(
                TimerTask::new(duration, token.clone(), self.console.clone())
                    .spawn()
                    .map_err(SessionError::Spawn)?,
            ),
            None => None,
        };

        let report = Worker::new(
            mode,
            config,
            device,
            locator,
            token.clone(),
            self.console.clone(),
        )
        .run();

        token.signal();
        if let Some(timer) = timer {
            let _ = timer.join();
        }

        self.console.line(format!(
            "[session] {} complete: {}",
            mode.command().to_ascii_uppercase(),
            report
        ));
        Ok(report)
    }

    /// Collect a background job that already ended on its own
    fn reap_finished(&mut self) {
        let finished = self
            .job
            .as_ref()
            .map_or(false, |job| job.worker.is_finished());
        if !finished {
            return;
        }

        if let Some(job) = self.job.take() {
            job.token.signal();
            match self.finish_job(job, self.stop_timeout, "FINISHED") {
                StopOutcome::Stopped(report) => {
                    log::debug!("reaped finished job: {}", report);
                }
                other => log::warn!("reaped job ended as {:?}", other),
            }
        }
    }

    fn finish_job(&self, job: ActiveJob, timeout: Duration, label: &str) -> StopOutcome {
        let ActiveJob {
            mode,
            worker,
            done_rx,
            timer,
            ..
        } = job;

        match done_rx.recv_timeout(timeout) {
            // Disconnected means the worker thread ended without reporting
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("{} worker still running after {:?}", mode, timeout);
                self.console.line(format!(
                    "[session] {} timed out after {:.1}s; {} job abandoned",
                    label,
                    timeout.as_secs_f64(),
                    mode
                ));
                return StopOutcome::Abandoned;
            }
        }

        if let Some(timer) = timer {
            let _ = timer.join();
        }

        match worker.join() {
            Ok(report) => {
                self.console
                    .line(format!("[session] {} complete: {}", label, report));
                StopOutcome::Stopped(report)
            }
            Err(_) => {
                log::error!("{} worker panicked", mode);
                self.console
                    .line(format!("[session] {} job crashed", mode));
                StopOutcome::Crashed
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Console::stdout())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Threads are left to wind down on their own
        if let Some(job) = self.job.as_ref() {
            job.token.signal();
        }
    }
}
