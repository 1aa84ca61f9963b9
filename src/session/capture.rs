use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Sample rate recorded in WAV captures when the job has no rate
#[cfg(feature = "wav")]
const DEFAULT_WAV_RATE: u32 = 44_100;

/// Destination for bytes read during acquisition
pub enum CaptureSink {
    Raw(BufWriter<File>),
    #[cfg(feature = "wav")]
    Wav(hound::WavWriter<BufWriter<File>>),
}

impl CaptureSink {
    /// Create (truncating) the capture file. Paths ending in `.wav` become
    /// 8-bit mono PCM when WAV support is built in; everything else is raw.
    pub fn create(path: &str, rate_hz: Option<f64>) -> io::Result<Self> {
        #[cfg(feature = "wav")]
        {
            if path.to_ascii_lowercase().ends_with(".wav") {
                return Self::create_wav(path, rate_hz);
            }
        }

        let _ = rate_hz;
        Ok(CaptureSink::Raw(BufWriter::new(File::create(path)?)))
    }

    #[cfg(feature = "wav")]
    fn create_wav(path: &str, rate_hz: Option<f64>) -> io::Result<Self> {
        let sample_rate = rate_hz
            .filter(|r| r.is_finite() && *r >= 1.0)
            .map(|r| r.round().min(u32::MAX as f64) as u32)
            .unwrap_or(DEFAULT_WAV_RATE);

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 8,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path, spec).map_err(wav_error)?;
        Ok(CaptureSink::Wav(writer))
    }

    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            CaptureSink::Raw(writer) => writer.write_all(bytes),
            #[cfg(feature = "wav")]
            CaptureSink::Wav(writer) => {
                for &byte in bytes {
                    // 8-bit WAV is stored unsigned; hound offsets i8 by 128
                    writer.write_sample((byte ^ 0x80) as i8).map_err(wav_error)?;
                }
                Ok(())
            }
        }
    }

    /// Flush buffered data and, for WAV, patch the header lengths
    pub fn finish(self) -> io::Result<()> {
        match self {
            CaptureSink::Raw(mut writer) => writer.flush(),
            #[cfg(feature = "wav")]
            CaptureSink::Wav(writer) => writer.finalize().map_err(wav_error),
        }
    }
}

#[cfg(feature = "wav")]
fn wav_error(err: hound::Error) -> io::Error {
    match err {
        hound::Error::IoError(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}
