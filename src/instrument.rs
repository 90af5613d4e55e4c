//! Instrument: a single-voice tone player driving an [`AudioEngine`].
//!
//! Each note is an oscillator feeding its own gain node, which feeds a
//! compressor created once per instrument:
//!
//! ```text
//! oscillator -> gain -> compressor -> output
//! ```
//!
//! At most one voice exists at a time. Playing while a voice is sounding
//! hard-stops the old voice first. Fades are linear gain ramps to zero,
//! anchored at the gain's current value.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{AudioEngine, Destination, NodeId};
use crate::error::InstrumentError;
use crate::options::{InstrumentOptions, InstrumentOverrides, ResolvedOptions};
use crate::pitch::PitchTable;

/// Tuning and fade timings for an [`Instrument`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Frequency of A4 in Hz.
    pub tuning_pitch: f64,
    /// Length of the fade that follows note start in `play` mode.
    pub play_fade_seconds: f64,
    /// Length of the fade that replaces the cutoff in `stop` mode.
    pub stop_fade_seconds: f64,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        InstrumentConfig {
            tuning_pitch: 440.0,
            play_fade_seconds: 1.0,
            stop_fade_seconds: 0.3,
        }
    }
}

/// The sounding note.
#[derive(Debug)]
struct Voice {
    oscillator: NodeId,
    gain: NodeId,
    /// Options the note was played with; `stop` merges over these.
    options: InstrumentOptions,
    ramp_generation: u32,
    /// End time of the most recent gain ramp.
    ramp_ends_at: Option<f64>,
    /// A fade-out on stop is in flight and the oscillator's stop is scheduled.
    releasing: bool,
}

impl Voice {
    fn ramp_in_flight(&self, now: f64) -> bool {
        self.ramp_ends_at.is_some_and(|end| end > now)
    }
}

/// A single-voice tone player. Dropping it hard-stops the active voice and
/// disconnects the compressor.
pub struct Instrument<E: AudioEngine> {
    engine: E,
    base_options: InstrumentOptions,
    pitch_table: PitchTable,
    config: InstrumentConfig,
    compressor: NodeId,
    voice: Option<Voice>,
    last_options: Option<ResolvedOptions>,
}

impl<E: AudioEngine> Instrument<E> {
    pub fn new(engine: E, options: &InstrumentOverrides) -> Self {
        Self::with_config(engine, options, InstrumentConfig::default())
    }

    pub fn with_config(
        mut engine: E,
        options: &InstrumentOverrides,
        config: InstrumentConfig,
    ) -> Self {
        let compressor = engine.create_compressor();
        engine.connect(compressor, Destination::Output);

        Instrument {
            engine,
            base_options: InstrumentOptions::from_overrides(options),
            pitch_table: PitchTable::with_tuning(config.tuning_pitch),
            config,
            compressor,
            voice: None,
            last_options: None,
        }
    }

    /// Whether the engine can produce audio in this host.
    pub fn is_supported(&self) -> bool {
        self.engine.is_supported()
    }

    pub fn base_options(&self) -> &InstrumentOptions {
        &self.base_options
    }

    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The compressor every voice of this instrument feeds.
    pub fn compressor(&self) -> NodeId {
        self.compressor
    }

    pub fn is_playing(&self) -> bool {
        self.voice.is_some()
    }

    /// Whether the active voice is fading out after a stop.
    pub fn is_releasing(&self) -> bool {
        self.voice.as_ref().is_some_and(|v| v.releasing)
    }

    pub fn active_oscillator(&self) -> Option<NodeId> {
        self.voice.as_ref().map(|v| v.oscillator)
    }

    /// Number of fades scheduled on the active voice so far.
    pub fn fade_generation(&self) -> Option<u32> {
        self.voice.as_ref().map(|v| v.ramp_generation)
    }

    /// Options used by the most recent `play`, including silent ones.
    pub fn last_options(&self) -> Option<&ResolvedOptions> {
        self.last_options.as_ref()
    }

    /// Merge `overrides` over the base options and resolve the frequency.
    /// The base options are never modified.
    pub fn resolve_options(&self, overrides: &InstrumentOverrides) -> ResolvedOptions {
        ResolvedOptions::resolve(self.base_options.merged(overrides), &self.pitch_table)
    }

    pub fn play(&mut self) -> Result<(), InstrumentError> {
        self.play_with(&InstrumentOverrides::default())
    }

    /// Start a tone, replacing any voice that is still sounding.
    ///
    /// A configuration without a usable frequency is not an error: the old
    /// voice is still stopped and no new one is created.
    pub fn play_with(&mut self, overrides: &InstrumentOverrides) -> Result<(), InstrumentError> {
        if !self.engine.is_supported() {
            let e = InstrumentError::UnsupportedEnvironment;
            warn!("{e}");
            return Err(e);
        }

        self.poll();
        let resolved = self.resolve_options(overrides);

        if self.voice.is_some() {
            debug!("replacing active voice");
            self.release_voice_now();
        }

        self.last_options = Some(resolved.clone());
        if resolved.is_silent() {
            return Ok(());
        }

        let options = resolved.options;
        let now = self.engine.current_time();
        let oscillator = self
            .engine
            .create_oscillator(options.oscillator_type, resolved.frequency);
        let gain = self.engine.create_gain();
        self.engine.connect(oscillator, Destination::Node(gain));
        self.engine.connect(gain, Destination::Node(self.compressor));
        self.engine.set_gain(gain, options.volume);

        let fade_on_play = options.fades_on_play();
        let mut voice = Voice {
            oscillator,
            gain,
            options,
            ramp_generation: 0,
            ramp_ends_at: None,
            releasing: false,
        };
        if fade_on_play {
            Self::schedule_fade(&mut self.engine, &mut voice, self.config.play_fade_seconds);
        }
        self.engine.start(oscillator, now);

        debug!(
            "playing {} at {:.2} Hz, volume {}",
            voice.options.oscillator_type.as_str(),
            resolved.frequency,
            voice.options.volume
        );
        self.voice = Some(voice);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.stop_with(&InstrumentOverrides::default());
    }

    /// Stop the active voice, either at once or with a fade.
    ///
    /// With fade-on-stop the oscillator is scheduled to stop at the end of
    /// the ramp and the voice is cleared once the engine reports it ended.
    /// Stopping a voice that is already fading out again with fade-on-stop
    /// changes nothing; stopping it without a fade cuts it off.
    pub fn stop_with(&mut self, overrides: &InstrumentOverrides) {
        if self.voice.is_none() {
            return;
        }
        self.poll();
        let stop_fade = self.config.stop_fade_seconds;
        let Some(voice) = self.voice.as_mut() else {
            return;
        };

        let options = voice.options.merged(overrides);
        if !options.fades_on_stop() {
            self.release_voice_now();
            return;
        }
        if voice.releasing {
            debug!("voice already fading out");
            return;
        }

        let ends_at = Self::schedule_fade(&mut self.engine, voice, stop_fade);
        self.engine.stop(voice.oscillator, ends_at);
        voice.releasing = true;
        debug!("fading out until {ends_at:.3}s");
    }

    /// Process end-of-playback notifications from the engine.
    ///
    /// Only the notification for the active voice's own oscillator clears
    /// it; notifications for replaced voices are ignored.
    pub fn poll(&mut self) {
        for ended in self.engine.take_ended() {
            if !self.voice.as_ref().is_some_and(|v| v.oscillator == ended) {
                continue;
            }
            if let Some(voice) = self.voice.take() {
                self.engine.disconnect(voice.oscillator);
                self.engine.disconnect(voice.gain);
                debug!("voice {ended:?} ended");
            }
        }
    }

    /// Hold the gain at its current value and ramp it to zero over
    /// `duration`, replacing any ramp still in flight. Returns the ramp's
    /// end time.
    fn schedule_fade(engine: &mut E, voice: &mut Voice, duration: f64) -> f64 {
        let now = engine.current_time();
        let current = engine.gain_value(voice.gain);
        if voice.ramp_in_flight(now) {
            engine.cancel_scheduled_values(voice.gain, now);
        }

        let ends_at = now + duration.max(0.0);
        engine.set_value_at_time(voice.gain, current, now);
        engine.linear_ramp_to_value_at_time(voice.gain, 0.0, ends_at);

        voice.ramp_generation += 1;
        voice.ramp_ends_at = Some(ends_at);
        ends_at
    }

    /// Stop the active voice at the current time and drop it.
    fn release_voice_now(&mut self) {
        let Some(voice) = self.voice.take() else {
            return;
        };
        let now = self.engine.current_time();
        if voice.ramp_in_flight(now) {
            debug!("cancelling fade #{}", voice.ramp_generation);
            self.engine.cancel_scheduled_values(voice.gain, now);
        }
        self.engine.stop(voice.oscillator, now);
        self.engine.disconnect(voice.oscillator);
        self.engine.disconnect(voice.gain);
    }
}

impl<E: AudioEngine> Drop for Instrument<E> {
    fn drop(&mut self) {
        self.release_voice_now();
        self.engine.disconnect(self.compressor);
    }
}
