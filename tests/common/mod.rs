// Shared test doubles for the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scopegen::device::{Device, DeviceFactory, Direction, IoResult};
use scopegen::error::{DeviceError, DeviceResult};

/// Counters shared between a test and the devices it hands to a session
#[derive(Clone, Default)]
pub struct Probe {
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub built: Arc<AtomicUsize>,
    pub written: Arc<Mutex<Vec<u8>>>,
}

impl Probe {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

/// In-memory device that records what happens to it
pub struct ProbeDevice {
    probe: Probe,
    fail_open: bool,
    io_delay: Duration,
    io_error: Option<String>,
    open: bool,
}

impl ProbeDevice {
    pub fn new(probe: Probe) -> Self {
        Self {
            probe,
            fail_open: false,
            io_delay: Duration::ZERO,
            io_error: None,
            open: false,
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Every read and write blocks for `delay`
    pub fn slow(mut self, delay: Duration) -> Self {
        self.io_delay = delay;
        self
    }

    /// Every read and write fails with `error`
    pub fn erroring(mut self, error: &str) -> Self {
        self.io_error = Some(error.to_string());
        self
    }
}

impl Device for ProbeDevice {
    fn open(&mut self, locator: &str) -> DeviceResult<()> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(DeviceError::open(locator, "no such device"));
        }
        self.open = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> IoResult {
        std::thread::sleep(self.io_delay);
        if !self.open {
            return IoResult::failed("not-open");
        }
        if let Some(error) = &self.io_error {
            return IoResult::failed(error.clone());
        }
        buf.fill(0x5a);
        IoResult::ok(buf.len())
    }

    fn write(&mut self, buf: &[u8]) -> IoResult {
        std::thread::sleep(self.io_delay);
        if !self.open {
            return IoResult::failed("not-open");
        }
        if let Some(error) = &self.io_error {
            return IoResult::failed(error.clone());
        }
        self.probe.written.lock().unwrap().extend_from_slice(buf);
        IoResult::ok(buf.len())
    }

    fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn kind(&self) -> &'static str {
        "probe"
    }
}

/// A factory that builds a fresh device from `make` for every job
pub fn probe_factory<F>(probe: Probe, make: F) -> DeviceFactory
where
    F: Fn(Probe) -> ProbeDevice + Send + Sync + 'static,
{
    Arc::new(
        move |_locator: &str, _direction: Direction| -> DeviceResult<Box<dyn Device>> {
            probe.built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(make(probe.clone())))
        },
    )
}
