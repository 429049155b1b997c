//! Audio processing context built on a `dasp_graph` node graph.
//!
//! Every node renders two fixed-size buffers per block: an audio bus and a
//! control bus. Nodes wired with [`AudioContext::connect`] write the audio
//! bus; nodes wired with [`AudioContext::connect_param`] write the control
//! bus, which the receiving node adds to its modulatable parameter (gain for
//! gain nodes, cutoff or pitch for filters and oscillators).

use std::fmt;
use std::sync::{Arc, Mutex};

use dasp_graph::{Buffer, Input, NodeData, Processor};
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use super::dsp::{self, Biquad, FilterKind};
use crate::error::GraphError;

/// Context shared between the control thread and the output stream
pub type SharedContext = Arc<Mutex<AudioContext>>;

/// Edge weight: `Some(param)` for modulation edges
type Graph = StableDiGraph<NodeData<Unit>, Option<ParamKind>>;

const AUDIO_BUS: usize = 0;
const CONTROL_BUS: usize = 1;

/// Handle to a node inside one [`AudioContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NodeIndex);

/// Automatable parameter slot on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Gain,
    Frequency,
}

impl ParamKind {
    fn name(self) -> &'static str {
        match self {
            Self::Gain => "gain",
            Self::Frequency => "frequency",
        }
    }
}

/// Destination of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    Param(NodeId, ParamKind),
}

/// Playback state of a source node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Idle,
    Playing,
    Stopped,
}

/// Parameter that glides linearly toward a target, one step per sample
#[derive(Debug, Clone, PartialEq)]
struct Param {
    current: f32,
    target: f32,
    step: f32,
    remaining: u64,
}

impl Param {
    fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    fn ramp_to(&mut self, target: f32, samples: u64) {
        self.target = target;
        if samples == 0 {
            self.current = target;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / samples as f32;
            self.remaining = samples;
        }
    }

    fn tick(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Unrouted,
    Audio,
    Control,
}

#[derive(Debug, Clone)]
enum UnitKind {
    Destination,
    Gain {
        gain: Param,
    },
    Oscillator {
        frequency: Param,
        phase: f32,
    },
    BufferSource {
        buffer: Arc<[f32]>,
        looping: bool,
        position: usize,
    },
    Filter {
        filter: Biquad,
        frequency: Param,
        q: f32,
    },
}

impl UnitKind {
    fn is_source(&self) -> bool {
        matches!(self, Self::Oscillator { .. } | Self::BufferSource { .. })
    }

    /// The one parameter the control bus feeds into
    fn modulated(&self) -> Option<ParamKind> {
        match self {
            Self::Gain { .. } => Some(ParamKind::Gain),
            Self::Oscillator { .. } | Self::Filter { .. } => Some(ParamKind::Frequency),
            Self::Destination | Self::BufferSource { .. } => None,
        }
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut Param> {
        match (self, kind) {
            (Self::Gain { gain }, ParamKind::Gain) => Some(gain),
            (Self::Oscillator { frequency, .. }, ParamKind::Frequency)
            | (Self::Filter { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            _ => None,
        }
    }

    fn param(&self, kind: ParamKind) -> Option<&Param> {
        match (self, kind) {
            (Self::Gain { gain }, ParamKind::Gain) => Some(gain),
            (Self::Oscillator { frequency, .. }, ParamKind::Frequency)
            | (Self::Filter { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            _ => None,
        }
    }
}

/// One graph node: a unit generator or processor
#[derive(Debug, Clone)]
struct Unit {
    kind: UnitKind,
    playback: Playback,
    route: Route,
    sample_rate: f32,
}

impl Unit {
    fn tick(&mut self, input: f32, modulation: f32) -> f32 {
        let playing = self.playback == Playback::Playing;
        match &mut self.kind {
            UnitKind::Destination => input,
            UnitKind::Gain { gain } => input * (gain.tick() + modulation),
            UnitKind::Oscillator { frequency, phase } => {
                let hz = frequency.tick() + modulation;
                if !playing {
                    return 0.0;
                }
                let out = dsp::sine(*phase);
                *phase = dsp::advance_phase(*phase, hz, self.sample_rate);
                out
            }
            UnitKind::BufferSource {
                buffer,
                looping,
                position,
            } => {
                if !playing || *position >= buffer.len() {
                    return 0.0;
                }
                let out = buffer[*position];
                *position += 1;
                if *looping && *position == buffer.len() {
                    *position = 0;
                }
                out
            }
            UnitKind::Filter {
                filter,
                frequency,
                q,
            } => {
                let hz = frequency.tick() + modulation;
                filter.tune(hz, *q, self.sample_rate);
                filter.process(input)
            }
        }
    }
}

impl dasp_graph::Node for Unit {
    fn process(&mut self, inputs: &[Input], output: &mut [Buffer]) {
        let mut audio = Buffer::SILENT;
        let mut control = Buffer::SILENT;
        for input in inputs {
            let buffers = input.buffers();
            for (sum, bus) in [(&mut audio, AUDIO_BUS), (&mut control, CONTROL_BUS)] {
                if let Some(buffer) = buffers.get(bus) {
                    for (acc, sample) in sum.iter_mut().zip(buffer.iter()) {
                        *acc += *sample;
                    }
                }
            }
        }

        let bus = match self.route {
            Route::Control => CONTROL_BUS,
            Route::Audio | Route::Unrouted => AUDIO_BUS,
        };
        for buffer in output.iter_mut() {
            buffer.fill(0.0);
        }
        let Some(out) = output.get_mut(bus) else {
            return;
        };
        let summed = audio.iter().zip(control.iter());
        for (sample, (&input, &modulation)) in out.iter_mut().zip(summed) {
            *sample = self.tick(input, modulation);
        }
    }
}

/// Audio graph plus its timeline
pub struct AudioContext {
    sample_rate: u32,
    frame: u64,
    graph: Graph,
    destination: NodeIndex,
    block: Buffer,
    cursor: usize,
    closed: bool,
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("sample_rate", &self.sample_rate)
            .field("frame", &self.frame)
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("closed", &self.closed)
            .finish()
    }
}

impl AudioContext {
    /// Create a context with its destination node
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let mut graph = Graph::default();
        let destination = graph.add_node(NodeData::new2(Unit {
            kind: UnitKind::Destination,
            playback: Playback::Idle,
            route: Route::Audio,
            sample_rate: sample_rate as f32,
        }));
        Self {
            sample_rate,
            frame: 0,
            graph,
            destination,
            block: Buffer::SILENT,
            cursor: Buffer::LEN,
            closed: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Context time in seconds (frames rendered so far)
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// The node whose input is the context's output
    pub fn destination(&self) -> NodeId {
        NodeId(self.destination)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices().map(NodeId)
    }

    /// Outgoing edges of `node`
    pub fn connections_from(&self, node: NodeId) -> Vec<Target> {
        self.graph
            .edges(node.0)
            .map(|edge| match *edge.weight() {
                Some(param) => Target::Param(NodeId(edge.target()), param),
                None => Target::Node(NodeId(edge.target())),
            })
            .collect()
    }

    pub fn create_gain(&mut self, gain: f32) -> Result<NodeId, GraphError> {
        self.add(UnitKind::Gain {
            gain: Param::new(gain),
        })
    }

    /// Sine oscillator; silent until started
    pub fn create_oscillator(&mut self, frequency_hz: f32) -> Result<NodeId, GraphError> {
        self.add(UnitKind::Oscillator {
            frequency: Param::new(frequency_hz),
            phase: 0.0,
        })
    }

    /// Buffer player; silent until started
    pub fn create_buffer_source(
        &mut self,
        buffer: Arc<[f32]>,
        looping: bool,
    ) -> Result<NodeId, GraphError> {
        self.add(UnitKind::BufferSource {
            buffer,
            looping,
            position: 0,
        })
    }

    pub fn create_filter(
        &mut self,
        kind: FilterKind,
        frequency_hz: f32,
        q: f32,
    ) -> Result<NodeId, GraphError> {
        self.add(UnitKind::Filter {
            filter: Biquad::new(kind),
            frequency: Param::new(frequency_hz),
            q,
        })
    }

    fn add(&mut self, kind: UnitKind) -> Result<NodeId, GraphError> {
        self.ensure_open()?;
        let index = self.graph.add_node(NodeData::new2(Unit {
            kind,
            playback: Playback::Idle,
            route: Route::Unrouted,
            sample_rate: self.sample_rate as f32,
        }));
        Ok(NodeId(index))
    }

    /// Feed `from`'s output into `to`'s audio input
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.link(from, to, None)
    }

    /// Add `from`'s output to parameter `param` of `to`
    pub fn connect_param(
        &mut self,
        from: NodeId,
        to: NodeId,
        param: ParamKind,
    ) -> Result<(), GraphError> {
        if self.unit(to)?.kind.modulated() != Some(param) {
            return Err(GraphError::UnknownParam {
                node: to,
                param: param.name(),
            });
        }
        self.link(from, to, Some(param))
    }

    fn link(
        &mut self,
        from: NodeId,
        to: NodeId,
        param: Option<ParamKind>,
    ) -> Result<(), GraphError> {
        self.ensure_open()?;
        self.unit(to)?;
        let route = if param.is_some() {
            Route::Control
        } else {
            Route::Audio
        };
        let current = self.unit(from)?.route;
        if current != Route::Unrouted && current != route {
            return Err(GraphError::MixedRouting(from));
        }
        if has_path_connecting(&self.graph, to.0, from.0, None) {
            return Err(GraphError::Cycle { from, to });
        }

        self.unit_mut(from)?.route = route;
        if self.graph.find_edge(from.0, to.0).is_none() {
            self.graph.add_edge(from.0, to.0, param);
        }
        Ok(())
    }

    /// Remove every outgoing connection of `node`
    pub fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.unit(node)?;
        let edges: Vec<_> = self.graph.edges(node.0).map(|edge| edge.id()).collect();
        for edge in edges {
            self.graph.remove_edge(edge);
        }
        Ok(())
    }

    /// Start a source node. Non-sources ignore this; stopped sources stay stopped.
    pub fn start(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.ensure_open()?;
        let unit = self.unit_mut(node)?;
        if unit.kind.is_source() && unit.playback == Playback::Idle {
            unit.playback = Playback::Playing;
        }
        Ok(())
    }

    /// Stop a source node permanently. Non-sources ignore this.
    pub fn stop(&mut self, node: NodeId) -> Result<(), GraphError> {
        let unit = self.unit_mut(node)?;
        if unit.kind.is_source() {
            unit.playback = Playback::Stopped;
        }
        Ok(())
    }

    pub fn playback(&self, node: NodeId) -> Result<Playback, GraphError> {
        Ok(self.unit(node)?.playback)
    }

    /// Current (unmodulated) value of a parameter
    pub fn param_value(&self, node: NodeId, param: ParamKind) -> Result<f32, GraphError> {
        self.unit(node)?
            .kind
            .param(param)
            .map(|p| p.current)
            .ok_or(GraphError::UnknownParam {
                node,
                param: param.name(),
            })
    }

    /// Ramp a parameter linearly from its current value to `target` over `duration_s`
    pub fn ramp_param(
        &mut self,
        node: NodeId,
        param: ParamKind,
        target: f32,
        duration_s: f64,
    ) -> Result<(), GraphError> {
        self.ensure_open()?;
        let samples = (duration_s.max(0.0) * self.sample_rate as f64).round() as u64;
        self.unit_mut(node)?
            .kind
            .param_mut(param)
            .ok_or(GraphError::UnknownParam {
                node,
                param: param.name(),
            })?
            .ramp_to(target, samples);
        Ok(())
    }

    /// Release the graph. Rendering yields silence from now on.
    pub fn close(&mut self) {
        self.closed = true;
        let nodes: Vec<_> = self.node_ids().collect();
        for node in nodes {
            // Ids come straight from the graph
            let _ = self.disconnect(node);
        }
    }

    /// Render mono samples into `out`, advancing the timeline
    pub fn render(&mut self, out: &mut [f32]) {
        self.frame += out.len() as u64;
        if self.closed {
            out.fill(0.0);
            return;
        }

        let mut processor: Option<Processor<Graph>> = None;
        for sample in out.iter_mut() {
            if self.cursor == Buffer::LEN {
                let capacity = self.graph.node_count();
                processor
                    .get_or_insert_with(|| Processor::with_capacity(capacity))
                    .process(&mut self.graph, self.destination);
                self.block = self.graph[self.destination].buffers[AUDIO_BUS].clone();
                self.cursor = 0;
            }
            *sample = self.block[self.cursor];
            self.cursor += 1;
        }
    }

    fn unit(&self, node: NodeId) -> Result<&Unit, GraphError> {
        self.graph
            .node_weight(node.0)
            .map(|data| &data.node)
            .ok_or(GraphError::UnknownNode(node))
    }

    fn unit_mut(&mut self, node: NodeId) -> Result<&mut Unit, GraphError> {
        self.graph
            .node_weight_mut(node.0)
            .map(|data| &mut data.node)
            .ok_or(GraphError::UnknownNode(node))
    }

    fn ensure_open(&self) -> Result<(), GraphError> {
        if self.closed {
            Err(GraphError::Closed)
        } else {
            Ok(())
        }
    }
}
