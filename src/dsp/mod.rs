//! DSP Engine: pure Rust signal graph for offline rendering.
//!
//! The same instrument code drives either this engine (tests, WAV export,
//! WASM) or any other [`AudioEngine`](crate::engine::AudioEngine).

pub mod compressor;
pub mod engine;
pub mod oscillator;
pub mod param;
pub mod renderer;
