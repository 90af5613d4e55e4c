//! Instrument configuration: defaults, per-call overrides and how they merge.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::OscillatorType;
use crate::error::InstrumentError;
use crate::pitch::PitchTable;

pub const DEFAULT_VOLUME: f64 = 0.5;

/// When a fade envelope is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadeOutPlayMode {
    /// No ramp: play sustains, stop cuts immediately.
    #[default]
    Default,
    /// Fade to silence right after the note starts.
    Play,
    /// Fade to silence instead of cutting off on stop.
    Stop,
}

impl FadeOutPlayMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "default" => Some(FadeOutPlayMode::Default),
            "play" => Some(FadeOutPlayMode::Play),
            "stop" => Some(FadeOutPlayMode::Stop),
            _ => None,
        }
    }
}

/// A complete tone configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentOptions {
    /// Explicit tone frequency in Hz; 0 means "none".
    pub frequency: f64,
    /// Symbolic pitch resolved through the pitch table.
    pub pitch: Option<String>,
    pub oscillator_type: OscillatorType,
    /// Linear gain in (0, 1].
    pub volume: f64,
    pub is_fade_out: bool,
    pub fade_out_play_mode: FadeOutPlayMode,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        InstrumentOptions {
            frequency: 0.0,
            pitch: None,
            oscillator_type: OscillatorType::Square,
            volume: DEFAULT_VOLUME,
            is_fade_out: false,
            fade_out_play_mode: FadeOutPlayMode::Default,
        }
    }
}

impl InstrumentOptions {
    /// The documented defaults with `overrides` applied.
    pub fn from_overrides(overrides: &InstrumentOverrides) -> Self {
        Self::default().merged(overrides)
    }

    /// A copy of these options with every present override applied.
    ///
    /// An override carrying `frequency` without `pitch` clears `pitch`, so an
    /// explicit frequency always wins over a stale symbolic pitch.
    pub fn merged(&self, overrides: &InstrumentOverrides) -> InstrumentOptions {
        let mut out = self.clone();
        if let Some(frequency) = overrides.frequency {
            out.frequency = sanitize_frequency(frequency);
        }
        if let Some(pitch) = &overrides.pitch {
            out.pitch = (!pitch.is_empty()).then(|| pitch.clone());
        }
        if let Some(kind) = overrides.oscillator_type {
            out.oscillator_type = kind;
        }
        if let Some(volume) = overrides.volume {
            out.volume = sanitize_volume(volume);
        }
        if let Some(fade) = overrides.is_fade_out {
            out.is_fade_out = fade;
        }
        if let Some(mode) = overrides.fade_out_play_mode {
            out.fade_out_play_mode = mode;
        }
        if overrides.frequency.is_some() && overrides.pitch.is_none() {
            out.pitch = None;
        }
        out
    }

    pub fn fades_on_play(&self) -> bool {
        self.is_fade_out && self.fade_out_play_mode == FadeOutPlayMode::Play
    }

    pub fn fades_on_stop(&self) -> bool {
        self.is_fade_out && self.fade_out_play_mode == FadeOutPlayMode::Stop
    }

    /// Frequency to play: the pitch table entry if the pitch is known,
    /// otherwise the explicit frequency if positive.
    pub fn effective_frequency(&self, table: &PitchTable) -> Result<f64, InstrumentError> {
        if let Some(hz) = self.pitch.as_deref().and_then(|p| table.lookup(p)) {
            return Ok(hz);
        }
        if self.frequency > 0.0 {
            return Ok(self.frequency);
        }
        Err(InstrumentError::NoFrequencyResolved {
            pitch: self.pitch.clone(),
        })
    }
}

/// Options merged for one call, with the frequency that call will use.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub options: InstrumentOptions,
    /// Effective frequency in Hz; 0 means silence.
    pub frequency: f64,
}

impl ResolvedOptions {
    /// Resolve the effective frequency, reporting a miss as silence.
    pub fn resolve(options: InstrumentOptions, table: &PitchTable) -> Self {
        let frequency = options.effective_frequency(table).unwrap_or_else(|e| {
            warn!("{e}");
            0.0
        });
        ResolvedOptions { options, frequency }
    }

    pub fn is_silent(&self) -> bool {
        self.frequency <= 0.0
    }
}

/// A partial set of options. Absent fields leave the base value untouched.
///
/// Decoding from JSON is forgiving: out-of-domain values are replaced by
/// their defaults instead of failing the whole object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentOverrides {
    #[serde(default, deserialize_with = "lenient::frequency", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, deserialize_with = "lenient::pitch", skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    #[serde(default, deserialize_with = "lenient::oscillator_type", skip_serializing_if = "Option::is_none")]
    pub oscillator_type: Option<OscillatorType>,
    #[serde(default, deserialize_with = "lenient::volume", skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub is_fade_out: Option<bool>,
    #[serde(default, deserialize_with = "lenient::play_mode", skip_serializing_if = "Option::is_none")]
    pub fade_out_play_mode: Option<FadeOutPlayMode>,
}

impl InstrumentOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Overrides that only set a pitch, as the melody driver issues them.
    pub fn pitch(pitch: impl Into<String>) -> Self {
        Self::new().with_pitch(pitch)
    }

    pub fn with_pitch(mut self, pitch: impl Into<String>) -> Self {
        self.pitch = Some(pitch.into());
        self
    }

    pub fn with_frequency(mut self, hz: f64) -> Self {
        self.frequency = Some(hz);
        self
    }

    pub fn with_oscillator_type(mut self, kind: OscillatorType) -> Self {
        self.oscillator_type = Some(kind);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_fade_out(mut self, mode: FadeOutPlayMode) -> Self {
        self.is_fade_out = Some(true);
        self.fade_out_play_mode = Some(mode);
        self
    }

    pub fn without_fade_out(mut self) -> Self {
        self.is_fade_out = Some(false);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn report_invalid(field: &'static str, value: impl ToString) {
    let e = InstrumentError::InvalidConfigValue {
        field,
        value: value.to_string(),
    };
    debug!("{e}");
}

fn sanitize_frequency(hz: f64) -> f64 {
    if hz.is_finite() && hz >= 0.0 {
        hz
    } else {
        report_invalid("frequency", hz);
        0.0
    }
}

fn sanitize_volume(volume: f64) -> f64 {
    if volume > 0.0 && volume <= 1.0 {
        volume
    } else {
        report_invalid("volume", volume);
        DEFAULT_VOLUME
    }
}

/// Field decoders that coerce bad values instead of rejecting the object.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{report_invalid, DEFAULT_VOLUME, FadeOutPlayMode};
    use crate::dsp::oscillator::OscillatorType;

    fn raw<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.filter(|v| !v.is_null()))
    }

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn frequency<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(raw(d)?.map(|v| {
            number(&v).filter(|hz| *hz >= 0.0).unwrap_or_else(|| {
                report_invalid("frequency", &v);
                0.0
            })
        }))
    }

    pub fn volume<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(raw(d)?.map(|v| {
            number(&v)
                .filter(|vol| *vol > 0.0 && *vol <= 1.0)
                .unwrap_or_else(|| {
                    report_invalid("volume", &v);
                    DEFAULT_VOLUME
                })
        }))
    }

    pub fn pitch<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(raw(d)?.map(|v| match v {
            Value::String(s) => s,
            other => {
                report_invalid("pitch", &other);
                String::new()
            }
        }))
    }

    /// Booleans, or the truthiness of numbers and strings.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(raw(d)?.map(|v| match v {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
            Value::String(s) => !s.is_empty(),
            other => {
                report_invalid("isFadeOut", &other);
                false
            }
        }))
    }

    pub fn oscillator_type<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<OscillatorType>, D::Error> {
        Ok(raw(d)?.map(|v| {
            v.as_str().and_then(OscillatorType::parse).unwrap_or_else(|| {
                report_invalid("oscillatorType", &v);
                OscillatorType::default()
            })
        }))
    }

    pub fn play_mode<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<FadeOutPlayMode>, D::Error> {
        Ok(raw(d)?.map(|v| {
            v.as_str().and_then(FadeOutPlayMode::parse).unwrap_or_else(|| {
                report_invalid("fadeOutPlayMode", &v);
                FadeOutPlayMode::default()
            })
        }))
    }
}
