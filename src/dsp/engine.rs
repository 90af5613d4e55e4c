//! Offline audio engine: renders a node graph to mono samples.
//!
//! The graph holds oscillators, automatable gains and compressors wired
//! towards the output. Rendering advances the engine clock one sample at a
//! time, so scheduled starts, stops and gain ramps resolve with sample
//! accuracy inside a block.

use std::collections::{BTreeMap, HashMap, VecDeque};

use log::{trace, warn};

use crate::engine::{AudioEngine, Destination, NodeId};

use super::compressor::Compressor;
use super::oscillator::{Oscillator, OscillatorType};
use super::param::Param;

#[derive(Debug)]
struct OscillatorNode {
    oscillator: Oscillator,
    start: Option<f64>,
    stop: Option<f64>,
    ended: bool,
}

#[derive(Debug)]
enum NodeKind {
    Oscillator(OscillatorNode),
    Gain(Param),
    Compressor(Compressor),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    outputs: Vec<Destination>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            outputs: Vec::new(),
        }
    }
}

/// An [`AudioEngine`] that renders into memory instead of a device.
#[derive(Debug)]
pub struct OfflineEngine {
    pub sample_rate: f64,
    /// Gain applied to the summed output before soft clipping.
    pub master_gain: f64,
    frame: u64,
    next_id: u32,
    nodes: BTreeMap<NodeId, Node>,
    ended: Vec<NodeId>,
}

impl OfflineEngine {
    pub fn new(sample_rate: f64) -> Self {
        OfflineEngine {
            sample_rate,
            master_gain: 1.0,
            frame: 0,
            next_id: 0,
            nodes: BTreeMap::new(),
            ended: Vec::new(),
        }
    }

    /// Number of live nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Render `seconds` of audio, advancing the clock.
    pub fn render(&mut self, seconds: f64) -> Vec<f32> {
        let frames = (seconds.max(0.0) * self.sample_rate).round() as usize;
        self.render_frames(frames)
    }

    /// Render exactly `frames` samples, advancing the clock.
    pub fn render_frames(&mut self, frames: usize) -> Vec<f32> {
        let order = self.processing_order();
        let index: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut inputs = vec![0.0_f64; order.len()];
        let mut out = Vec::with_capacity(frames);

        for _ in 0..frames {
            let t = self.current_time();
            inputs.iter_mut().for_each(|x| *x = 0.0);
            let mut mix = 0.0;

            for (i, id) in order.iter().enumerate() {
                let Some(node) = self.nodes.get_mut(id) else {
                    continue;
                };
                let y = match &mut node.kind {
                    NodeKind::Oscillator(osc) => {
                        Self::oscillator_sample(*id, osc, t, &mut self.ended)
                    }
                    NodeKind::Gain(param) => inputs[i] * param.value_at(t),
                    NodeKind::Compressor(comp) => comp.process(inputs[i]),
                };
                for dest in &node.outputs {
                    match dest {
                        Destination::Node(to) => {
                            if let Some(&j) = index.get(to) {
                                inputs[j] += y;
                            }
                        }
                        Destination::Output => mix += y,
                    }
                }
            }

            out.push(soft_clip(mix * self.master_gain) as f32);
            self.frame += 1;
        }
        out
    }

    fn oscillator_sample(
        id: NodeId,
        node: &mut OscillatorNode,
        t: f64,
        ended: &mut Vec<NodeId>,
    ) -> f64 {
        if node.ended {
            return 0.0;
        }
        match node.start {
            Some(start) if t >= start => {}
            _ => return 0.0,
        }
        if let Some(stop) = node.stop {
            if t >= stop {
                node.ended = true;
                ended.push(id);
                trace!("oscillator {id:?} ended at {t:.4}s");
                return 0.0;
            }
        }
        node.oscillator.next_sample()
    }

    /// Nodes ordered so every node comes after all of its inputs.
    fn processing_order(&self) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> =
            self.nodes.keys().map(|id| (*id, 0)).collect();
        for node in self.nodes.values() {
            for dest in &node.outputs {
                if let Destination::Node(to) = dest {
                    if let Some(d) = in_degree.get_mut(to) {
                        *d += 1;
                    }
                }
            }
        }

        let mut ready: VecDeque<NodeId> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(id, _)| *id)
            .collect();
        ready.make_contiguous().sort();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            for dest in &node.outputs {
                if let Destination::Node(to) = dest {
                    if let Some(d) = in_degree.get_mut(to) {
                        *d -= 1;
                        if *d == 0 {
                            ready.push_back(*to);
                        }
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            warn!(
                "signal graph has a cycle; {} node(s) will not be rendered",
                self.nodes.len() - order.len()
            );
        }
        order
    }

    fn allocate(&mut self, kind: NodeKind) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, Node::new(kind));
        id
    }

    fn param_mut(&mut self, gain: NodeId) -> Option<&mut Param> {
        match self.nodes.get_mut(&gain).map(|n| &mut n.kind) {
            Some(NodeKind::Gain(param)) => Some(param),
            _ => {
                warn!("node {gain:?} is not a gain");
                None
            }
        }
    }

    fn oscillator_mut(&mut self, id: NodeId) -> Option<&mut OscillatorNode> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Oscillator(osc)) => Some(osc),
            _ => {
                warn!("node {id:?} is not an oscillator");
                None
            }
        }
    }
}

impl AudioEngine for OfflineEngine {
    fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    fn create_oscillator(&mut self, kind: OscillatorType, frequency: f64) -> NodeId {
        let oscillator = Oscillator::new(kind, frequency, self.sample_rate);
        let id = self.allocate(NodeKind::Oscillator(OscillatorNode {
            oscillator,
            start: None,
            stop: None,
            ended: false,
        }));
        trace!("created {} oscillator {id:?} at {frequency:.2} Hz", kind.as_str());
        id
    }

    fn create_gain(&mut self) -> NodeId {
        self.allocate(NodeKind::Gain(Param::new(1.0)))
    }

    fn create_compressor(&mut self) -> NodeId {
        let comp = Compressor::new(self.sample_rate);
        self.allocate(NodeKind::Compressor(comp))
    }

    fn connect(&mut self, from: NodeId, to: Destination) {
        if let Destination::Node(target) = to {
            if !self.nodes.contains_key(&target) {
                warn!("cannot connect {from:?} to missing node {target:?}");
                return;
            }
        }
        match self.nodes.get_mut(&from) {
            Some(node) => {
                if !node.outputs.contains(&to) {
                    node.outputs.push(to);
                }
                trace!("connected {from:?} -> {to:?}");
            }
            None => warn!("cannot connect missing node {from:?}"),
        }
    }

    fn disconnect(&mut self, node: NodeId) {
        if self.nodes.remove(&node).is_some() {
            for other in self.nodes.values_mut() {
                other.outputs.retain(|d| *d != Destination::Node(node));
            }
            trace!("disconnected {node:?}");
        }
    }

    fn start(&mut self, oscillator: NodeId, at: f64) {
        if let Some(osc) = self.oscillator_mut(oscillator) {
            osc.start = Some(at);
        }
    }

    fn stop(&mut self, oscillator: NodeId, at: f64) {
        let now = self.current_time();
        let Some(osc) = self.oscillator_mut(oscillator) else {
            return;
        };
        if osc.ended {
            return;
        }
        if at <= now {
            osc.ended = true;
            self.ended.push(oscillator);
        } else {
            osc.stop = Some(at);
        }
    }

    fn gain_value(&self, gain: NodeId) -> f64 {
        match self.nodes.get(&gain).map(|n| &n.kind) {
            Some(NodeKind::Gain(param)) => param.value_at(self.current_time()),
            _ => 0.0,
        }
    }

    fn set_gain(&mut self, gain: NodeId, value: f64) {
        if let Some(param) = self.param_mut(gain) {
            param.set_value(value);
        }
    }

    fn set_value_at_time(&mut self, gain: NodeId, value: f64, at: f64) {
        if let Some(param) = self.param_mut(gain) {
            param.set_value_at_time(value, at);
        }
    }

    fn linear_ramp_to_value_at_time(&mut self, gain: NodeId, value: f64, at: f64) {
        if let Some(param) = self.param_mut(gain) {
            param.linear_ramp_to_value_at_time(value, at);
        }
    }

    fn cancel_scheduled_values(&mut self, gain: NodeId, from: f64) {
        if let Some(param) = self.param_mut(gain) {
            param.cancel_scheduled_values(from);
        }
    }

    fn take_ended(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.ended)
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
    }

    /// oscillator -> gain -> output, started at t=0.
    fn simple_voice(engine: &mut OfflineEngine, volume: f64) -> (NodeId, NodeId) {
        let osc = engine.create_oscillator(OscillatorType::Square, 440.0);
        let gain = engine.create_gain();
        engine.set_gain(gain, volume);
        engine.connect(osc, Destination::Node(gain));
        engine.connect(gain, Destination::Output);
        engine.start(osc, 0.0);
        (osc, gain)
    }

    #[test]
    fn empty_graph_renders_silence() {
        let mut engine = OfflineEngine::new(8000.0);
        let out = engine.render(0.5);
        assert_eq!(out.len(), 4000);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!((engine.current_time() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn connected_oscillator_is_audible() {
        let mut engine = OfflineEngine::new(8000.0);
        simple_voice(&mut engine, 0.5);
        let out = engine.render(0.1);
        assert!(peak(&out) > 0.3, "expected audible output, peak {}", peak(&out));
        assert!(peak(&out) <= 1.0);
    }

    #[test]
    fn master_gain_scales_output() {
        let mut loud = OfflineEngine::new(8000.0);
        simple_voice(&mut loud, 0.5);
        let mut quiet = OfflineEngine::new(8000.0);
        quiet.master_gain = 0.25;
        simple_voice(&mut quiet, 0.5);
        let (loud, quiet) = (peak(&loud.render(0.05)), peak(&quiet.render(0.05)));
        assert!(quiet < loud * 0.5, "quiet {quiet} vs loud {loud}");

        let mut muted = OfflineEngine::new(8000.0);
        muted.master_gain = 0.0;
        simple_voice(&mut muted, 0.5);
        assert!(muted.render(0.05).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn unconnected_oscillator_is_silent() {
        let mut engine = OfflineEngine::new(8000.0);
        let osc = engine.create_oscillator(OscillatorType::Sine, 440.0);
        engine.start(osc, 0.0);
        let out = engine.render(0.1);
        assert_eq!(peak(&out), 0.0);
    }

    #[test]
    fn scheduled_stop_silences_and_reports_end() {
        let mut engine = OfflineEngine::new(8000.0);
        let (osc, _) = simple_voice(&mut engine, 0.5);
        engine.stop(osc, 0.05);

        let out = engine.render(0.1);
        assert!(peak(&out[..300]) > 0.3);
        assert_eq!(peak(&out[410..]), 0.0, "oscillator should be stopped");
        assert_eq!(engine.take_ended(), vec![osc]);
        assert!(engine.take_ended().is_empty());
    }

    #[test]
    fn stop_in_the_past_ends_immediately() {
        let mut engine = OfflineEngine::new(8000.0);
        let (osc, _) = simple_voice(&mut engine, 0.5);
        engine.render(0.01);
        engine.stop(osc, 0.0);
        assert_eq!(engine.take_ended(), vec![osc]);
        engine.stop(osc, 0.0);
        assert!(engine.take_ended().is_empty(), "end is reported once");
    }

    #[test]
    fn gain_ramp_fades_to_silence() {
        let mut engine = OfflineEngine::new(8000.0);
        let (_, gain) = simple_voice(&mut engine, 0.8);
        engine.set_value_at_time(gain, 0.8, 0.0);
        engine.linear_ramp_to_value_at_time(gain, 0.0, 0.1);

        let out = engine.render(0.2);
        let early = peak(&out[..200]);
        let late = peak(&out[700..800]);
        assert!(early > late, "fade should decay: {early} vs {late}");
        assert_eq!(peak(&out[801..]), 0.0);
        assert_eq!(engine.gain_value(gain), 0.0);
    }

    #[test]
    fn compressor_in_path_limits_peaks() {
        let mut engine = OfflineEngine::new(8000.0);
        let comp = engine.create_compressor();
        engine.connect(comp, Destination::Output);
        let osc = engine.create_oscillator(OscillatorType::Square, 220.0);
        let gain = engine.create_gain();
        engine.connect(osc, Destination::Node(gain));
        engine.connect(gain, Destination::Node(comp));
        engine.start(osc, 0.0);

        let out = engine.render(0.5);
        let tail = peak(&out[3000..]);
        assert!(tail > 0.0);
        assert!(tail < 0.5, "compressor should tame a full-scale square, got {tail}");
    }

    #[test]
    fn disconnect_removes_node_and_edges() {
        let mut engine = OfflineEngine::new(8000.0);
        let (osc, gain) = simple_voice(&mut engine, 0.5);
        assert_eq!(engine.node_count(), 2);
        engine.disconnect(gain);
        assert_eq!(engine.node_count(), 1);
        let out = engine.render(0.05);
        assert_eq!(peak(&out), 0.0);
        engine.disconnect(osc);
        assert_eq!(engine.node_count(), 0);
    }

    #[test]
    fn delayed_start_waits_for_its_time() {
        let mut engine = OfflineEngine::new(8000.0);
        let osc = engine.create_oscillator(OscillatorType::Square, 440.0);
        let gain = engine.create_gain();
        engine.connect(osc, Destination::Node(gain));
        engine.connect(gain, Destination::Output);
        engine.start(osc, 0.05);
        let out = engine.render(0.1);
        assert_eq!(peak(&out[..400]), 0.0);
        assert!(peak(&out[400..]) > 0.5);
    }
}
