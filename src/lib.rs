pub mod dsp;
pub mod engine;
pub mod error;
pub mod instrument;
pub mod melody;
pub mod options;
pub mod pitch;

pub use dsp::oscillator::OscillatorType;
pub use error::InstrumentError;
pub use instrument::{Instrument, InstrumentConfig};
pub use options::{FadeOutPlayMode, InstrumentOptions, InstrumentOverrides};

use crate::melody::Melody;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the chiptone-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render the built-in Mario theme to WAV bytes.
#[wasm_bindgen]
pub fn render_mario_wav(sample_rate: u32) -> Vec<u8> {
    dsp::renderer::render_melody_wav(
        &Melody::mario(),
        &melody::mario_options(),
        &InstrumentConfig::default(),
        sample_rate,
    )
}

/// WASM-exposed: render a melody to WAV bytes.
///
/// `notes` is an array of pitch names (`"0"` rests), `options` an
/// instrument options object using the camelCase field names.
#[wasm_bindgen]
pub fn render_melody_wav(
    notes: JsValue,
    tick_ms: f64,
    options: JsValue,
    sample_rate: u32,
) -> Result<Vec<u8>, JsValue> {
    let notes: Vec<String> =
        serde_wasm_bindgen::from_value(notes).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let options: InstrumentOverrides = if options.is_undefined() || options.is_null() {
        InstrumentOverrides::default()
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&format!("{e}")))?
    };
    let melody = Melody::new(notes, tick_ms / 1000.0);
    Ok(dsp::renderer::render_melody_wav(
        &melody,
        &options,
        &InstrumentConfig::default(),
        sample_rate,
    ))
}
