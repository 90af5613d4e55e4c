//! Dynamics compressor shared by every voice of an instrument.
//!
//! Feed-forward design with threshold, ratio, soft knee, attack and release.
//! Defaults match the WebAudio `DynamicsCompressorNode`.

#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f64,

    /// Threshold in dB.
    pub threshold: f64,
    /// Compression ratio (12.0 = 12:1).
    pub ratio: f64,
    /// Knee width in dB (0 = hard knee).
    pub knee: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,

    // Envelope follower level (linear)
    envelope: f64,
}

impl Compressor {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            threshold: -24.0,
            ratio: 12.0,
            knee: 30.0,
            attack: 0.003,
            release: 0.25,
            envelope: 0.0,
        }
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain change in dB (zero or negative) for an input level in dB.
    fn compute_gain(&self, input_db: f64) -> f64 {
        let slope = 1.0 - 1.0 / self.ratio;
        if self.knee <= 0.0 {
            return if input_db <= self.threshold {
                0.0
            } else {
                (self.threshold - input_db) * slope
            };
        }

        let half_knee = self.knee / 2.0;
        let knee_start = self.threshold - half_knee;
        let knee_end = self.threshold + half_knee;
        if input_db <= knee_start {
            0.0
        } else if input_db >= knee_end {
            (self.threshold - input_db) * slope
        } else {
            // Quadratic blend across the knee
            let x = input_db - knee_start;
            -slope * x * x / (2.0 * self.knee)
        }
    }

    /// Process one mono sample.
    pub fn process(&mut self, input: f64) -> f64 {
        let level = input.abs();
        let coef = if level > self.envelope {
            (-1.0 / (self.attack * self.sample_rate)).exp()
        } else {
            (-1.0 / (self.release * self.sample_rate)).exp()
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let reduction_db = self.compute_gain(Self::linear_to_db(self.envelope));
        input * Self::db_to_linear(reduction_db)
    }

    /// Current gain reduction in dB (positive number).
    pub fn gain_reduction(&self) -> f64 {
        -self.compute_gain(Self::linear_to_db(self.envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_signal_passes_through() {
        let mut comp = Compressor::new(44100.0);
        for _ in 0..2000 {
            comp.process(0.01); // -40 dB, below the knee
        }
        let out = comp.process(0.01);
        assert!((out - 0.01).abs() < 1e-6, "Below knee output should equal input: {out}");
        assert!(comp.gain_reduction().abs() < 1e-9);
    }

    #[test]
    fn loud_signal_is_reduced() {
        let mut comp = Compressor::new(44100.0);
        for _ in 0..5000 {
            comp.process(1.0);
        }
        let out = comp.process(1.0);
        assert!(out < 0.5, "0 dB input should be compressed, got {out}");
        assert!(out > 0.0);
        assert!(comp.gain_reduction() > 6.0);
    }

    #[test]
    fn knee_is_continuous_at_its_edges() {
        let comp = Compressor::new(44100.0);
        let start = comp.threshold - comp.knee / 2.0;
        let end = comp.threshold + comp.knee / 2.0;
        assert!(comp.compute_gain(start + 1e-9).abs() < 1e-6);
        let inside = comp.compute_gain(end - 1e-9);
        let outside = comp.compute_gain(end + 1e-9);
        assert!((inside - outside).abs() < 1e-6, "{inside} vs {outside}");
    }
}
