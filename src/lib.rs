//! Paced acquisition and waveform generation against byte-oriented devices.
//!
//! The core pieces are a drift-corrected [`pacer::Pacer`], a one-way
//! [`cancel::CancellationToken`], the timer/worker tasks and the
//! [`session::Session`] controller that runs one background job at a time,
//! and a deterministic [`gen::WaveformGenerator`].

pub mod cancel;
pub mod console;
pub mod device;
pub mod error;
pub mod gen;
pub mod pacer;
pub mod script;
pub mod session;
pub mod stats;
pub mod utils;

pub use cancel::CancellationToken;
pub use console::Console;
pub use device::{Device, Direction, IoResult};
pub use error::{DeviceError, ScriptError, SessionError};
pub use gen::{Waveform, WaveformGenerator};
pub use pacer::Pacer;
pub use session::{JobConfig, JobMode, RunReport, Session, StopOutcome, WaitSpec};
