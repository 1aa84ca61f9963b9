pub mod generator;
pub mod waveform;

pub use self::generator::*;
pub use self::waveform::*;
