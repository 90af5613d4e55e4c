//! The audio engine capability an instrument drives.
//!
//! An engine owns a graph of nodes (oscillators, gains, compressors) that
//! ends at an output device, exposes a monotonic clock, and accepts
//! scheduled commands against that clock. Rendering happens on the engine's
//! side; callers only issue commands.

pub mod recording;

pub use recording::{EngineCall, RecordingEngine};

use crate::dsp::oscillator::OscillatorType;

/// Handle to a node created by an [`AudioEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Where a node's signal goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Node(NodeId),
    /// The engine's output device.
    Output,
}

pub trait AudioEngine {
    /// Whether this host can actually produce audio.
    fn is_supported(&self) -> bool {
        true
    }

    /// Engine clock in seconds.
    fn current_time(&self) -> f64;

    fn create_oscillator(&mut self, kind: OscillatorType, frequency: f64) -> NodeId;

    /// Create a gain node. Its initial value is 1.0.
    fn create_gain(&mut self) -> NodeId;

    fn create_compressor(&mut self) -> NodeId;

    fn connect(&mut self, from: NodeId, to: Destination);

    /// Remove a node and all of its connections.
    fn disconnect(&mut self, node: NodeId);

    fn start(&mut self, oscillator: NodeId, at: f64);

    /// Schedule an oscillator to stop. Once the stop is reached the engine
    /// reports the oscillator through [`take_ended`](Self::take_ended).
    fn stop(&mut self, oscillator: NodeId, at: f64);

    /// Value of a gain node at the current time.
    fn gain_value(&self, gain: NodeId) -> f64;

    fn set_gain(&mut self, gain: NodeId, value: f64);

    fn set_value_at_time(&mut self, gain: NodeId, value: f64, at: f64);

    fn linear_ramp_to_value_at_time(&mut self, gain: NodeId, value: f64, at: f64);

    fn cancel_scheduled_values(&mut self, gain: NodeId, from: f64);

    /// Drain the oscillators that finished playing since the last call.
    fn take_ended(&mut self) -> Vec<NodeId>;
}

/// Lets an instrument drive an engine it borrows, so the engine outlives it.
impl<E: AudioEngine + ?Sized> AudioEngine for &mut E {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn create_oscillator(&mut self, kind: OscillatorType, frequency: f64) -> NodeId {
        (**self).create_oscillator(kind, frequency)
    }

    fn create_gain(&mut self) -> NodeId {
        (**self).create_gain()
    }

    fn create_compressor(&mut self) -> NodeId {
        (**self).create_compressor()
    }

    fn connect(&mut self, from: NodeId, to: Destination) {
        (**self).connect(from, to)
    }

    fn disconnect(&mut self, node: NodeId) {
        (**self).disconnect(node)
    }

    fn start(&mut self, oscillator: NodeId, at: f64) {
        (**self).start(oscillator, at)
    }

    fn stop(&mut self, oscillator: NodeId, at: f64) {
        (**self).stop(oscillator, at)
    }

    fn gain_value(&self, gain: NodeId) -> f64 {
        (**self).gain_value(gain)
    }

    fn set_gain(&mut self, gain: NodeId, value: f64) {
        (**self).set_gain(gain, value)
    }

    fn set_value_at_time(&mut self, gain: NodeId, value: f64, at: f64) {
        (**self).set_value_at_time(gain, value, at)
    }

    fn linear_ramp_to_value_at_time(&mut self, gain: NodeId, value: f64, at: f64) {
        (**self).linear_ramp_to_value_at_time(gain, value, at)
    }

    fn cancel_scheduled_values(&mut self, gain: NodeId, from: f64) {
        (**self).cancel_scheduled_values(gain, from)
    }

    fn take_ended(&mut self) -> Vec<NodeId> {
        (**self).take_ended()
    }
}

/// Engine for hosts without audio support. Every command is ignored.
#[derive(Debug, Default)]
pub struct NullEngine {
    next_id: u32,
}

impl NullEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }
}

impl AudioEngine for NullEngine {
    fn is_supported(&self) -> bool {
        false
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn create_oscillator(&mut self, _kind: OscillatorType, _frequency: f64) -> NodeId {
        self.allocate()
    }

    fn create_gain(&mut self) -> NodeId {
        self.allocate()
    }

    fn create_compressor(&mut self) -> NodeId {
        self.allocate()
    }

    fn connect(&mut self, _from: NodeId, _to: Destination) {}

    fn disconnect(&mut self, _node: NodeId) {}

    fn start(&mut self, _oscillator: NodeId, _at: f64) {}

    fn stop(&mut self, _oscillator: NodeId, _at: f64) {}

    fn gain_value(&self, _gain: NodeId) -> f64 {
        0.0
    }

    fn set_gain(&mut self, _gain: NodeId, _value: f64) {}

    fn set_value_at_time(&mut self, _gain: NodeId, _value: f64, _at: f64) {}

    fn linear_ramp_to_value_at_time(&mut self, _gain: NodeId, _value: f64, _at: f64) {}

    fn cancel_scheduled_values(&mut self, _gain: NodeId, _from: f64) {}

    fn take_ended(&mut self) -> Vec<NodeId> {
        Vec::new()
    }
}
