//! Engine double that records every command instead of making sound.

use std::collections::{BTreeMap, HashMap};

use crate::dsp::oscillator::OscillatorType;
use crate::dsp::param::Param;

use super::{AudioEngine, Destination, NodeId};

/// One command received by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    CreateOscillator { id: NodeId, kind: OscillatorType, frequency: f64 },
    CreateGain { id: NodeId },
    CreateCompressor { id: NodeId },
    Connect { from: NodeId, to: Destination },
    Disconnect { node: NodeId },
    Start { oscillator: NodeId, at: f64 },
    Stop { oscillator: NodeId, at: f64 },
    SetGain { gain: NodeId, value: f64 },
    SetValueAtTime { gain: NodeId, value: f64, at: f64 },
    LinearRampToValueAtTime { gain: NodeId, value: f64, at: f64 },
    CancelScheduledValues { gain: NodeId, from: f64 },
}

/// Records commands, keeps a manually driven clock, and evaluates gain
/// automation so `gain_value` answers like a real engine.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Vec<EngineCall>,
    time: f64,
    next_id: u32,
    gains: HashMap<NodeId, Param>,
    /// Oscillator -> scheduled stop time, for oscillators not yet ended.
    pending_stops: BTreeMap<NodeId, f64>,
    ended: Vec<NodeId>,
    supported: bool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        RecordingEngine {
            supported: true,
            ..Default::default()
        }
    }

    /// A recording engine that claims the host has no audio support.
    pub fn unsupported() -> Self {
        RecordingEngine {
            supported: false,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Move the clock to `time`, ending every oscillator whose scheduled
    /// stop has been reached.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
        let due: Vec<NodeId> = self
            .pending_stops
            .iter()
            .filter(|&(_, &at)| at <= time)
            .map(|(&id, _)| id)
            .collect();
        for id in due {
            self.end_oscillator(id);
        }
    }

    /// Fire the end-of-playback notification for an oscillator right now.
    pub fn end_oscillator(&mut self, oscillator: NodeId) {
        self.pending_stops.remove(&oscillator);
        self.ended.push(oscillator);
    }

    /// Oscillators created so far, in creation order.
    pub fn oscillators(&self) -> Vec<NodeId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::CreateOscillator { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn allocate(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }
}

impl AudioEngine for RecordingEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn create_oscillator(&mut self, kind: OscillatorType, frequency: f64) -> NodeId {
        let id = self.allocate();
        self.calls.push(EngineCall::CreateOscillator { id, kind, frequency });
        id
    }

    fn create_gain(&mut self) -> NodeId {
        let id = self.allocate();
        self.gains.insert(id, Param::new(1.0));
        self.calls.push(EngineCall::CreateGain { id });
        id
    }

    fn create_compressor(&mut self) -> NodeId {
        let id = self.allocate();
        self.calls.push(EngineCall::CreateCompressor { id });
        id
    }

    fn connect(&mut self, from: NodeId, to: Destination) {
        self.calls.push(EngineCall::Connect { from, to });
    }

    fn disconnect(&mut self, node: NodeId) {
        self.gains.remove(&node);
        self.calls.push(EngineCall::Disconnect { node });
    }

    fn start(&mut self, oscillator: NodeId, at: f64) {
        self.calls.push(EngineCall::Start { oscillator, at });
    }

    fn stop(&mut self, oscillator: NodeId, at: f64) {
        self.calls.push(EngineCall::Stop { oscillator, at });
        if at <= self.time {
            self.end_oscillator(oscillator);
        } else {
            self.pending_stops.insert(oscillator, at);
        }
    }

    fn gain_value(&self, gain: NodeId) -> f64 {
        self.gains.get(&gain).map_or(0.0, |p| p.value_at(self.time))
    }

    fn set_gain(&mut self, gain: NodeId, value: f64) {
        if let Some(p) = self.gains.get_mut(&gain) {
            p.set_value(value);
        }
        self.calls.push(EngineCall::SetGain { gain, value });
    }

    fn set_value_at_time(&mut self, gain: NodeId, value: f64, at: f64) {
        if let Some(p) = self.gains.get_mut(&gain) {
            p.set_value_at_time(value, at);
        }
        self.calls.push(EngineCall::SetValueAtTime { gain, value, at });
    }

    fn linear_ramp_to_value_at_time(&mut self, gain: NodeId, value: f64, at: f64) {
        if let Some(p) = self.gains.get_mut(&gain) {
            p.linear_ramp_to_value_at_time(value, at);
        }
        self.calls.push(EngineCall::LinearRampToValueAtTime { gain, value, at });
    }

    fn cancel_scheduled_values(&mut self, gain: NodeId, from: f64) {
        if let Some(p) = self.gains.get_mut(&gain) {
            p.cancel_scheduled_values(from);
        }
        self.calls.push(EngineCall::CancelScheduledValues { gain, from });
    }

    fn take_ended(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_stop_ends_when_clock_reaches_it() {
        let mut engine = RecordingEngine::new();
        let osc = engine.create_oscillator(OscillatorType::Sine, 440.0);
        engine.start(osc, 0.0);
        engine.stop(osc, 1.0);
        assert!(engine.take_ended().is_empty());

        engine.set_time(0.5);
        assert!(engine.take_ended().is_empty());

        engine.set_time(1.0);
        assert_eq!(engine.take_ended(), vec![osc]);
        assert!(engine.take_ended().is_empty(), "ended list is drained");
    }

    #[test]
    fn immediate_stop_ends_right_away() {
        let mut engine = RecordingEngine::new();
        let osc = engine.create_oscillator(OscillatorType::Square, 220.0);
        engine.stop(osc, 0.0);
        assert_eq!(engine.take_ended(), vec![osc]);
    }

    #[test]
    fn gain_value_follows_automation() {
        let mut engine = RecordingEngine::new();
        let gain = engine.create_gain();
        assert_eq!(engine.gain_value(gain), 1.0);
        engine.set_gain(gain, 0.5);
        engine.set_value_at_time(gain, 0.5, 0.0);
        engine.linear_ramp_to_value_at_time(gain, 0.0, 1.0);
        engine.set_time(0.5);
        assert!((engine.gain_value(gain) - 0.25).abs() < 1e-12);
        assert_eq!(engine.calls().len(), 4);
    }
}
