//! Device abstraction for acquisition and generation.
//!
//! A device is a byte-oriented endpoint (flat file, microphone, demo clock)
//! selected from a locator string at construction time.

use std::fmt;
use std::sync::Arc;

use crate::error::DeviceResult;

pub mod file;
pub mod mock;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use self::file::FileDevice;
pub use self::mock::MockDevice;

#[cfg(feature = "microphone")]
pub use self::microphone::MicrophoneDevice;

/// Locator prefix (case-insensitive) that selects the microphone adapter
pub const MIC_PREFIX: &str = "mic";

/// Locator prefix that selects the demo clock device
pub const MOCK_PREFIX: &str = "mock://";

/// Outcome of a single device read or write.
///
/// Devices never fail through `Err` on the data path: a negative count or an
/// error string tells the caller what went wrong, and the caller decides
/// whether to keep going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoResult {
    pub bytes: i64,
    pub error: Option<String>,
}

impl IoResult {
    pub fn ok(bytes: usize) -> Self {
        Self {
            bytes: bytes as i64,
            error: None,
        }
    }

    /// A call that transferred nothing
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            bytes: -1,
            error: Some(error.into()),
        }
    }

    /// A count paired with a status string, for partial or degraded transfers
    pub fn with_status(bytes: i64, error: impl Into<String>) -> Self {
        Self {
            bytes,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.bytes >= 0 && self.error.as_deref().map_or(true, str::is_empty)
    }

    /// Byte count, with failures counted as zero
    pub fn count(&self) -> usize {
        self.bytes.max(0) as usize
    }
}

impl fmt::Display for IoResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error.as_deref() {
            Some(err) if !err.is_empty() => write!(f, "bytes={} err={}", self.bytes, err),
            _ => write!(f, "bytes={}", self.bytes),
        }
    }
}

/// Which way data flows through the device for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Trait every device adapter implements.
/// Send is required because a device is moved onto the worker thread.
pub trait Device: Send {
    /// Open the endpoint named by `locator`
    fn open(&mut self, locator: &str) -> DeviceResult<()>;

    /// Read up to `buf.len()` bytes into `buf`
    fn read(&mut self, buf: &mut [u8]) -> IoResult;

    /// Write `buf`, returning how many bytes were accepted
    fn write(&mut self, buf: &[u8]) -> IoResult;

    /// Release the endpoint. Idempotent, and must not panic or fail.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Short adapter name for log lines
    fn kind(&self) -> &'static str;
}

/// Builds a device for a locator; replaceable so tests can inject their own.
pub type DeviceFactory =
    Arc<dyn Fn(&str, Direction) -> DeviceResult<Box<dyn Device>> + Send + Sync>;

/// The factory used by sessions unless one is supplied
pub fn default_factory() -> DeviceFactory {
    Arc::new(for_locator)
}

pub fn is_microphone_locator(locator: &str) -> bool {
    locator
        .get(..MIC_PREFIX.len())
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(MIC_PREFIX))
}

/// Pick the adapter for `locator`:
/// - `mic...` selects the default microphone (requires the `microphone` feature)
/// - `mock://...` selects the demo clock device
/// - anything else is a flat file, read or written depending on `direction`
pub fn for_locator(locator: &str, direction: Direction) -> DeviceResult<Box<dyn Device>> {
    if is_microphone_locator(locator) {
        return microphone_device();
    }

    if locator.starts_with(MOCK_PREFIX) {
        return Ok(Box::new(MockDevice::new()));
    }

    Ok(Box::new(match direction {
        Direction::Input => FileDevice::reader(),
        Direction::Output => FileDevice::writer(),
    }))
}

#[cfg(feature = "microphone")]
fn microphone_device() -> DeviceResult<Box<dyn Device>> {
    Ok(Box::new(MicrophoneDevice::new()))
}

#[cfg(not(feature = "microphone"))]
fn microphone_device() -> DeviceResult<Box<dyn Device>> {
    Err(crate::error::DeviceError::Unavailable(
        "microphone support not compiled in (enable the `microphone` feature)".to_string(),
    ))
}
