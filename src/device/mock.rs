use std::time::{SystemTime, UNIX_EPOCH};

use super::{Device, IoResult};
use crate::error::DeviceResult;

/// Hardware-free stand-in for a serial sampler.
///
/// Reads return the low 16 bits of the wall clock in milliseconds, little
/// endian, repeated across the buffer (an odd tail gets the low byte);
/// writes are accepted and discarded.
#[derive(Debug, Default)]
pub struct MockDevice {
    open: bool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn clock_word() -> [u8; 2] {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        ((millis & 0xFFFF) as u16).to_le_bytes()
    }
}

impl Device for MockDevice {
    fn open(&mut self, _locator: &str) -> DeviceResult<()> {
        self.open = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> IoResult {
        if !self.open {
            return IoResult::failed("not-open");
        }

        let word = Self::clock_word();
        for (byte, value) in buf.iter_mut().zip(word.iter().cycle()) {
            *byte = *value;
        }
        IoResult::ok(buf.len())
    }

    fn write(&mut self, buf: &[u8]) -> IoResult {
        if !self.open {
            return IoResult::failed("not-open");
        }
        IoResult::ok(buf.len())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn kind(&self) -> &'static str {
        "mock"
    }
}
