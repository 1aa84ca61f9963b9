use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};

use super::{Device, Direction, IoResult};
use crate::error::{DeviceError, DeviceResult};

/// Flat-file transport. Opened read-only for acquisition, or created and
/// truncated for generation.
pub struct FileDevice {
    direction: Direction,
    file: Option<File>,
}

impl FileDevice {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            file: None,
        }
    }

    pub fn reader() -> Self {
        Self::new(Direction::Input)
    }

    pub fn writer() -> Self {
        Self::new(Direction::Output)
    }
}

impl Device for FileDevice {
    fn open(&mut self, locator: &str) -> DeviceResult<()> {
        self.close();

        let file = match self.direction {
            Direction::Input => File::open(locator),
            Direction::Output => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(locator),
        }
        .map_err(|e| DeviceError::open(locator, e))?;

        self.file = Some(file);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> IoResult {
        let Some(file) = self.file.as_mut() else {
            return IoResult::failed("not-open");
        };
        if self.direction != Direction::Input {
            return IoResult::failed("read-not-supported");
        }

        loop {
            match file.read(buf) {
                Ok(n) => return IoResult::ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return IoResult::failed(e.to_string()),
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> IoResult {
        let Some(file) = self.file.as_mut() else {
            return IoResult::failed("not-open");
        };
        if self.direction != Direction::Output {
            return IoResult::failed("write-not-supported");
        }

        match file.write_all(buf) {
            Ok(()) => IoResult::ok(buf.len()),
            Err(e) => IoResult::failed(e.to_string()),
        }
    }

    fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            if self.direction == Direction::Output {
                if let Err(e) = file.flush() {
                    log::warn!("file device flush on close failed: {}", e);
                }
            }
        }
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}
