//! Anti-aliased tone oscillators using PolyBLEP.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Waveform shape of a tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OscillatorType {
    Sine,
    #[default]
    Square,
    Sawtooth,
    Triangle,
}

impl OscillatorType {
    /// Parse a waveform name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(OscillatorType::Sine),
            "square" => Some(OscillatorType::Square),
            "sawtooth" => Some(OscillatorType::Sawtooth),
            "triangle" => Some(OscillatorType::Triangle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OscillatorType::Sine => "sine",
            OscillatorType::Square => "square",
            OscillatorType::Sawtooth => "sawtooth",
            OscillatorType::Triangle => "triangle",
        }
    }
}

/// A band-limited oscillator producing one waveform at a fixed frequency.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub kind: OscillatorType,
    pub frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(kind: OscillatorType, frequency: f64, sample_rate: f64) -> Self {
        Oscillator {
            kind,
            frequency,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Phase increment per sample.
    fn phase_inc(&self) -> f64 {
        self.frequency.max(0.0) / self.sample_rate
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        let inc = self.phase_inc();
        let sample = match self.kind {
            OscillatorType::Sine => (2.0 * PI * self.phase).sin(),
            OscillatorType::Sawtooth => self.sawtooth(inc),
            OscillatorType::Square => self.square(inc),
            OscillatorType::Triangle => self.triangle(),
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }

    /// Naive ramp from -1 to +1, corrected at the wrap.
    fn sawtooth(&self, inc: f64) -> f64 {
        let naive = 2.0 * self.phase - 1.0;
        naive - poly_blep(self.phase, inc)
    }

    fn square(&self, inc: f64) -> f64 {
        let mut value = if self.phase < 0.5 { 1.0 } else { -1.0 };
        value += poly_blep(self.phase, inc);
        value -= poly_blep((self.phase + 0.5) % 1.0, inc);
        value
    }

    /// Piecewise linear: -1 → +1 over the first half cycle, back over the second.
    fn triangle(&self) -> f64 {
        if self.phase < 0.5 {
            4.0 * self.phase - 1.0
        } else {
            3.0 - 4.0 * self.phase
        }
    }
}

/// PolyBLEP (Polynomial Band-Limited Step) correction.
///
/// `t` is the phase [0, 1), `dt` is the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_and_unknown_names() {
        assert_eq!(OscillatorType::parse("sine"), Some(OscillatorType::Sine));
        assert_eq!(OscillatorType::parse("sawtooth"), Some(OscillatorType::Sawtooth));
        assert_eq!(OscillatorType::parse("organ"), None);
        assert_eq!(OscillatorType::default(), OscillatorType::Square);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&OscillatorType::Triangle).unwrap();
        assert_eq!(json, "\"triangle\"");
    }

    #[test]
    fn sine_zero_at_start() {
        let mut osc = Oscillator::new(OscillatorType::Sine, 440.0, 44100.0);
        let sample = osc.next_sample();
        assert!(sample.abs() < 1e-10, "Sine should start near 0, got {sample}");
    }

    #[test]
    fn all_waveforms_stay_bounded() {
        for kind in [
            OscillatorType::Sine,
            OscillatorType::Square,
            OscillatorType::Sawtooth,
            OscillatorType::Triangle,
        ] {
            let mut osc = Oscillator::new(kind, 659.25, 44100.0);
            for _ in 0..44100 {
                let s = osc.next_sample();
                assert!(s.abs() <= 1.5, "{kind:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn zero_frequency_is_silent_for_sine() {
        let mut osc = Oscillator::new(OscillatorType::Sine, 0.0, 44100.0);
        for _ in 0..100 {
            assert_eq!(osc.next_sample(), 0.0);
        }
    }

    #[test]
    fn square_has_positive_and_negative_halves() {
        let mut osc = Oscillator::new(OscillatorType::Square, 100.0, 8000.0);
        let samples: Vec<f64> = (0..80).map(|_| osc.next_sample()).collect();
        assert!(samples.iter().any(|&s| s > 0.9));
        assert!(samples.iter().any(|&s| s < -0.9));
    }
}
