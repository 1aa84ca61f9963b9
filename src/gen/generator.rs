use std::f64::consts::TAU;

use crate::gen::waveform::Waveform;

/// Virtual samples per waveform cycle. The step is fixed and does not follow
/// the job's configured rate.
pub const SAMPLES_PER_CYCLE: usize = 64;

/// Byte value a silent (zero amplitude) generator produces
pub const MID_SCALE: u8 = 128;

/// Phase-accumulator byte generator for unsigned 8-bit waveforms
#[derive(Debug, Clone)]
pub struct WaveformGenerator {
    waveform: Waveform,
    amplitude: f64,
    phase: f64,
    step: f64,
}

impl WaveformGenerator {
    /// Create a generator starting at phase zero.
    /// - waveform: shape to produce
    /// - amplitude: peak level, clamped to 0.0..=1.0
    pub fn new(waveform: Waveform, amplitude: f64) -> Self {
        let amplitude = if amplitude.is_nan() {
            0.0
        } else {
            amplitude.clamp(0.0, 1.0)
        };

        Self {
            waveform,
            amplitude,
            phase: 0.0,
            step: TAU / SAMPLES_PER_CYCLE as f64,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Current phase in radians, always in 0..2π
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Produce `n` bytes, one per virtual sample, continuing from the current phase.
    pub fn next_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n);
        self.fill(&mut out, n);
        out
    }

    /// Append `n` bytes to an existing buffer
    pub fn fill(&mut self, out: &mut Vec<u8>, n: usize) {
        out.reserve(n);
        for _ in 0..n {
            let value = self.value_at_phase();
            self.advance();
            out.push(self.to_byte(value));
        }
    }

    /// Waveform value in -1.0..=1.0 at the current phase
    fn value_at_phase(&self) -> f64 {
        match self.waveform {
            Waveform::Sine => self.phase.sin(),
            Waveform::Square => {
                if self.phase.sin() >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                let t = (self.phase / TAU).rem_euclid(1.0);
                4.0 * (t - 0.5).abs() - 1.0
            }
        }
    }

    fn advance(&mut self) {
        self.phase += self.step;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
    }

    fn to_byte(&self, value: f64) -> u8 {
        let unit = value * self.amplitude * 0.5 + 0.5;
        (unit * 255.0).round().clamp(0.0, 255.0) as u8
    }
}
