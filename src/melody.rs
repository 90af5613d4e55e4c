//! Melody driver: steps an instrument through a sequence of pitches on a
//! fixed time grid.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::dsp::engine::OfflineEngine;
use crate::dsp::oscillator::OscillatorType;
use crate::engine::AudioEngine;
use crate::error::InstrumentError;
use crate::instrument::{Instrument, InstrumentConfig};
use crate::options::{FadeOutPlayMode, InstrumentOverrides};

/// Sequence entry meaning "rest".
pub const REST: &str = "0";

/// Pitch names on a fixed tick grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Melody {
    pub notes: Vec<String>,
    /// Time between steps in seconds.
    pub tick_seconds: f64,
}

impl Melody {
    pub fn new<S: Into<String>>(notes: impl IntoIterator<Item = S>, tick_seconds: f64) -> Self {
        Melody {
            notes: notes.into_iter().map(Into::into).collect(),
            tick_seconds,
        }
    }

    /// Opening bar of the Super Mario Bros. theme.
    pub fn mario() -> Self {
        Melody::new(
            [
                "E5", "E5", REST, "E5", REST, "C5", "E5", REST, "G5", REST, REST, REST, "G4",
                REST, REST, REST,
            ],
            0.2,
        )
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.notes.len() as f64 * self.tick_seconds
    }
}

/// Instrument settings the Mario theme is played with.
pub fn mario_options() -> InstrumentOverrides {
    InstrumentOverrides::pitch("E5")
        .with_frequency(650.0)
        .with_volume(0.6)
        .with_oscillator_type(OscillatorType::Square)
        .with_fade_out(FadeOutPlayMode::Stop)
}

/// Walks a [`Melody`], one step per tick. The caller owns the timing.
#[derive(Debug, Clone)]
pub struct MelodyDriver {
    melody: Melody,
    position: usize,
}

impl MelodyDriver {
    pub fn new(melody: Melody) -> Self {
        MelodyDriver { melody, position: 0 }
    }

    pub fn melody(&self) -> &Melody {
        &self.melody
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.melody.notes.len()
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Perform one step: stop the instrument, then play the current entry
    /// unless it is a rest. Returns `false` once the melody is exhausted.
    pub fn tick<E: AudioEngine>(
        &mut self,
        instrument: &mut Instrument<E>,
    ) -> Result<bool, InstrumentError> {
        let Some(note) = self.melody.notes.get(self.position) else {
            return Ok(false);
        };
        instrument.stop();
        if note != REST {
            instrument.play_with(&InstrumentOverrides::pitch(note.as_str()))?;
        }
        debug!("tick {}: {note}", self.position);
        self.position += 1;
        Ok(true)
    }
}

/// Render a melody offline to mono samples.
///
/// Each tick is followed by one tick of audio. After the last step the
/// instrument is stopped and the fade tail (if any) is rendered too.
pub fn render_melody(
    melody: &Melody,
    options: &InstrumentOverrides,
    config: &InstrumentConfig,
    sample_rate: f64,
) -> Vec<f32> {
    let engine = OfflineEngine::new(sample_rate);
    let mut instrument = Instrument::with_config(engine, options, *config);
    let mut driver = MelodyDriver::new(melody.clone());
    let tick_frames = (melody.tick_seconds.max(0.0) * sample_rate).round() as usize;

    let mut samples = Vec::with_capacity(tick_frames * (melody.len() + 1));
    // The offline engine is always supported, so ticks cannot fail.
    while let Ok(true) = driver.tick(&mut instrument) {
        samples.extend(instrument.engine_mut().render_frames(tick_frames));
        instrument.poll();
    }

    instrument.stop();
    if instrument.is_playing() {
        samples.extend(instrument.engine_mut().render(config.stop_fade_seconds));
        instrument.poll();
    }

    info!(
        "rendered {} steps into {} samples at {sample_rate} Hz",
        melody.len(),
        samples.len()
    );
    samples
}
