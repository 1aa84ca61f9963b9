use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, Sample, SizedSample, Stream, StreamConfig,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::collections::VecDeque;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{Device, IoResult};
use crate::error::{DeviceError, DeviceResult};

/// Bytes per captured frame: one signed 16-bit sample, little endian
const BYTES_PER_FRAME: usize = 2;

/// Callback buffers queued between the audio thread and `read`
const QUEUE_DEPTH: usize = 256;

const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest a single read waits for audio before reporting a timeout
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default system input as an acquisition source.
///
/// The cpal stream lives on a dedicated capture thread (streams are not
/// `Send` on every host); the audio callback down-mixes to mono i16 and hands
/// byte buffers to `read` through a bounded channel.
pub struct MicrophoneDevice {
    capture: Option<Capture>,
    pending: VecDeque<u8>,
}

struct Capture {
    stop_tx: Sender<()>,
    data_rx: Receiver<Vec<u8>>,
    thread: JoinHandle<()>,
}

impl MicrophoneDevice {
    pub fn new() -> Self {
        Self {
            capture: None,
            pending: VecDeque::new(),
        }
    }

    /// Build and start the default input stream on the current thread
    fn build_input_stream(data_tx: Sender<Vec<u8>>) -> Result<(Stream, u32), anyhow::Error> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("Default input device is not available"))?;

        log::info!("Input device: {}", device.name()?);

        let supported_config = device.default_input_config()?;
        log::debug!("Default input config: {:?}", supported_config);

        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();

        let stream = match sample_format {
            cpal::SampleFormat::I8 => Self::make_stream::<i8>(&device, &config, data_tx)?,
            cpal::SampleFormat::I16 => Self::make_stream::<i16>(&device, &config, data_tx)?,
            cpal::SampleFormat::I32 => Self::make_stream::<i32>(&device, &config, data_tx)?,
            cpal::SampleFormat::I64 => Self::make_stream::<i64>(&device, &config, data_tx)?,
            cpal::SampleFormat::U8 => Self::make_stream::<u8>(&device, &config, data_tx)?,
            cpal::SampleFormat::U16 => Self::make_stream::<u16>(&device, &config, data_tx)?,
            cpal::SampleFormat::U32 => Self::make_stream::<u32>(&device, &config, data_tx)?,
            cpal::SampleFormat::U64 => Self::make_stream::<u64>(&device, &config, data_tx)?,
            cpal::SampleFormat::F32 => Self::make_stream::<f32>(&device, &config, data_tx)?,
            cpal::SampleFormat::F64 => Self::make_stream::<f64>(&device, &config, data_tx)?,
            sample_format => {
                return Err(anyhow::anyhow!("Unsupported sample format '{}'", sample_format))
            }
        };

        stream.play()?;
        Ok((stream, config.sample_rate.0))
    }

    /// Create a typed input stream that forwards the first channel as i16 bytes
    fn make_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        data_tx: Sender<Vec<u8>>,
    ) -> Result<Stream, anyhow::Error>
    where
        T: SizedSample,
        i16: FromSample<T>,
    {
        let num_channels = (config.channels as usize).max(1);

        let err_fn = |err| log::error!("Error on input sound stream: {}", err);

        let stream = device.build_input_stream(
            config,
            move |input: &[T], _: &cpal::InputCallbackInfo| {
                let mut bytes = Vec::with_capacity(input.len() / num_channels * BYTES_PER_FRAME);
                for frame in input.chunks(num_channels) {
                    let value = i16::from_sample(frame[0]);
                    bytes.extend_from_slice(&value.to_le_bytes());
                }
                // Reader fell behind; drop rather than block the audio thread
                if let Err(TrySendError::Full(_)) = data_tx.try_send(bytes) {
                    log::debug!("microphone queue full, dropping buffer");
                }
            },
            err_fn,
            None,
        )?;

        Ok(stream)
    }
}

impl Default for MicrophoneDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for MicrophoneDevice {
    /// The locator only selects this adapter; the default input is always used.
    fn open(&mut self, locator: &str) -> DeviceResult<()> {
        self.close();

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32, String>>(1);
        let (data_tx, data_rx) = crossbeam_channel::bounded::<Vec<u8>>(QUEUE_DEPTH);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread = std::thread::Builder::new()
            .name("scopegen-mic".to_string())
            .spawn(move || match Self::build_input_stream(data_tx) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    // Keep the stream alive until close() or the device is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })?;

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(sample_rate)) => {
                log::info!("microphone open at {} Hz", sample_rate);
                self.capture = Some(Capture {
                    stop_tx,
                    data_rx,
                    thread,
                });
                Ok(())
            }
            Ok(Err(reason)) => {
                let _ = thread.join();
                Err(DeviceError::open(locator, reason))
            }
            Err(_) => {
                let _ = stop_tx.send(());
                Err(DeviceError::open(locator, "timed out starting input stream"))
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> IoResult {
        let Some(capture) = self.capture.as_ref() else {
            return IoResult::failed("not-open-input");
        };

        let want = (buf.len() - buf.len() % BYTES_PER_FRAME).max(BYTES_PER_FRAME.min(buf.len()));
        let deadline = Instant::now() + READ_TIMEOUT;

        while self.pending.len() < want {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match capture.data_rx.recv_timeout(remaining) {
                Ok(bytes) => self.pending.extend(bytes),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    return IoResult::failed("read-error:input stream closed");
                }
            }
        }

        let n = want.min(self.pending.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }

        if n == 0 {
            IoResult::with_status(0, "read-timeout")
        } else {
            IoResult::ok(n)
        }
    }

    fn write(&mut self, _buf: &[u8]) -> IoResult {
        IoResult::failed("write-not-supported")
    }

    fn close(&mut self) {
        if let Some(capture) = self.capture.take() {
            let _ = capture.stop_tx.send(());
            if capture.thread.join().is_err() {
                log::warn!("microphone capture thread panicked");
            }
        }
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.capture.is_some()
    }

    fn kind(&self) -> &'static str {
        "microphone"
    }
}

impl Drop for MicrophoneDevice {
    fn drop(&mut self) {
        self.close();
    }
}
