use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::device::Direction;
use crate::error::SessionError;
use crate::gen::Waveform;

pub const DEFAULT_CHUNK: usize = 512;
pub const DEFAULT_AMPLITUDE: f64 = 1.0;

/// `wait { loops }` sleeps this long per loop. It approximates a worker loop
/// and is not tied to the worker's real pacing.
pub const LOOP_WAIT_PROXY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    /// Read chunks from the device
    Acquire,
    /// Write generated waveform chunks to the device
    Generate,
}

impl JobMode {
    pub fn name(&self) -> &'static str {
        match self {
            JobMode::Acquire => "acquire",
            JobMode::Generate => "generate",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            JobMode::Acquire => Direction::Input,
            JobMode::Generate => Direction::Output,
        }
    }

    /// Name of the one-shot command that runs this mode
    pub fn command(&self) -> &'static str {
        match self {
            JobMode::Acquire => "read",
            JobMode::Generate => "write",
        }
    }
}

impl FromStr for JobMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acquire" => Ok(JobMode::Acquire),
            "generate" => Ok(JobMode::Generate),
            other => Err(SessionError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of one acquisition or generation job.
///
/// Field names follow the script format (`in`, `out`, `fs`/`fo`, `n`,
/// `loops`, `wave`, `amp`); the long names are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub mode: Option<String>,
    #[serde(rename = "in", alias = "locator_in")]
    pub locator_in: Option<String>,
    #[serde(rename = "out", alias = "locator_out")]
    pub locator_out: Option<String>,
    /// Cycles per second; absent or zero runs unpaced
    #[serde(alias = "fs", alias = "fo")]
    pub rate: Option<f64>,
    pub chunk: usize,
    /// Total byte budget
    #[serde(rename = "n", alias = "sample_count")]
    pub sample_count: Option<u64>,
    #[serde(rename = "loops", alias = "loop_count")]
    pub loop_count: Option<u64>,
    /// Session length in seconds, enforced by a timer task
    #[serde(rename = "seconds", alias = "duration")]
    pub duration_secs: Option<f64>,
    #[serde(rename = "wave", alias = "wave_kind")]
    pub wave: Option<String>,
    #[serde(rename = "amp", alias = "amplitude")]
    pub amplitude: f64,
    /// Hex-dump every captured chunk to the console
    pub echo: bool,
    /// Abort the run on the first failed read or write
    #[serde(rename = "fatal_io")]
    pub fatal_io_errors: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            mode: None,
            locator_in: None,
            locator_out: None,
            rate: None,
            chunk: DEFAULT_CHUNK,
            sample_count: None,
            loop_count: None,
            duration_secs: None,
            wave: None,
            amplitude: DEFAULT_AMPLITUDE,
            echo: false,
            fatal_io_errors: false,
        }
    }
}

impl JobConfig {
    /// Acquisition from `locator`
    pub fn acquire(locator: impl Into<String>) -> Self {
        Self {
            mode: Some(JobMode::Acquire.name().to_string()),
            locator_in: Some(locator.into()),
            ..Self::default()
        }
    }

    /// Generation into `locator`
    pub fn generate(locator: impl Into<String>) -> Self {
        Self {
            mode: Some(JobMode::Generate.name().to_string()),
            locator_out: Some(locator.into()),
            ..Self::default()
        }
    }

    pub fn with_rate(mut self, rate_hz: f64) -> Self {
        self.rate = Some(rate_hz);
        self
    }

    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    pub fn with_sample_count(mut self, bytes: u64) -> Self {
        self.sample_count = Some(bytes);
        self
    }

    pub fn with_loops(mut self, loops: u64) -> Self {
        self.loop_count = Some(loops);
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_secs = Some(seconds);
        self
    }

    pub fn with_wave(mut self, waveform: Waveform, amplitude: f64) -> Self {
        self.wave = Some(waveform.name().to_string());
        self.amplitude = amplitude;
        self
    }

    /// Capture file for acquisition jobs
    pub fn with_capture(mut self, path: impl Into<String>) -> Self {
        self.locator_out = Some(path.into());
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_fatal_io_errors(mut self, fatal: bool) -> Self {
        self.fatal_io_errors = fatal;
        self
    }

    /// The configured mode; acquisition when none is given
    pub fn job_mode(&self) -> Result<JobMode, SessionError> {
        match self.mode.as_deref() {
            None => Ok(JobMode::Acquire),
            Some(mode) => mode.parse(),
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.wave
            .as_deref()
            .map(Waveform::parse_or_sine)
            .unwrap_or_default()
    }

    /// Bounded session length, if a positive one was configured.
    /// Zero, negative and NaN mean unbounded; a length too large for a
    /// `Duration` is rejected.
    pub fn duration(&self) -> Result<Option<Duration>, SessionError> {
        match self.duration_secs {
            Some(secs) if secs > 0.0 => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(|_| SessionError::InvalidDuration(secs)),
            _ => Ok(None),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk.max(1)
    }

    /// Whether anything besides an external stop will end the run
    pub fn has_budget(&self) -> bool {
        self.sample_count.is_some()
            || self.loop_count.is_some()
            || self.duration_secs.map_or(false, |secs| secs > 0.0)
    }

    /// Locator of the device the job runs against
    pub fn device_locator(&self, mode: JobMode) -> Result<&str, SessionError> {
        match mode {
            JobMode::Acquire => self
                .locator_in
                .as_deref()
                .ok_or(SessionError::MissingLocator("in")),
            JobMode::Generate => self
                .locator_out
                .as_deref()
                .ok_or(SessionError::MissingLocator("out")),
        }
    }

    /// Where an acquisition job stores what it reads
    pub fn capture_path(&self, mode: JobMode) -> Option<&str> {
        match mode {
            JobMode::Acquire => self.locator_out.as_deref(),
            JobMode::Generate => None,
        }
    }
}

/// Parameters of a `wait` command; exactly one of the two must be set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaitSpec {
    pub seconds: Option<f64>,
    #[serde(alias = "loop_count")]
    pub loops: Option<u64>,
}

impl WaitSpec {
    pub fn seconds(seconds: f64) -> Self {
        Self {
            seconds: Some(seconds),
            loops: None,
        }
    }

    pub fn loops(loops: u64) -> Self {
        Self {
            seconds: None,
            loops: Some(loops),
        }
    }

    /// How long the control flow should block
    pub fn duration(&self) -> Result<Duration, SessionError> {
        match (self.seconds, self.loops) {
            (Some(seconds), None) => {
                if seconds.is_nan() || seconds < 0.0 {
                    return Err(SessionError::WaitParameter("seconds must be a non-negative number"));
                }
                Duration::try_from_secs_f64(seconds)
                    .map_err(|_| SessionError::WaitParameter("seconds is too large"))
            }
            (None, Some(loops)) => Ok(LOOP_WAIT_PROXY.saturating_mul(loops.min(u32::MAX as u64) as u32)),
            (Some(_), Some(_)) => Err(SessionError::WaitParameter("both were given")),
            (None, None) => Err(SessionError::WaitParameter("neither was given")),
        }
    }
}
