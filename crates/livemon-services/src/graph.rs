//! Signal graph: source, gain, compressor and destination nodes
//!
//! Each graph belongs to one processing context. Every node except the
//! destination has a single output link; the output callback walks the links
//! from the source and only produces sound when the walk reaches the
//! destination.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;
use livemon_core::{ParamKind, ParamSet, StartError};
use thiserror::Error;
use tracing::debug;

use crate::dsp::{apply_gain, Compressor, CompressorSettings};
use crate::meter::MeterState;

/// Most captured samples buffered ahead of the output before old ones are dropped
const MAX_PENDING: usize = 16_384;
const NO_LINK: u8 = u8::MAX;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node belongs to another graph")]
    ForeignNode,
    #[error("Cannot connect {from:?} to {to:?}")]
    InvalidLink { from: NodeId, to: NodeId },
}

impl From<GraphError> for StartError {
    fn from(err: GraphError) -> Self {
        StartError::Other(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    Source,
    Gain,
    Compressor,
    Destination,
}

impl NodeId {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Source),
            1 => Some(Self::Gain),
            2 => Some(Self::Compressor),
            3 => Some(Self::Destination),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        self as u8
    }

    /// Slot in the link table; the destination has no output
    fn link_slot(self) -> Option<usize> {
        match self {
            Self::Source => Some(0),
            Self::Gain => Some(1),
            Self::Compressor => Some(2),
            Self::Destination => None,
        }
    }
}

/// A live parameter value shared between the control thread and the audio callback
#[derive(Debug, Clone)]
pub struct AudioParam(Arc<AtomicU32>);

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Handles to the five live parameters of a connected chain
#[derive(Debug, Clone)]
pub struct LiveParams {
    pub gain: AudioParam,
    pub threshold: AudioParam,
    pub ratio: AudioParam,
    pub attack: AudioParam,
    pub release: AudioParam,
}

impl LiveParams {
    pub fn param(&self, kind: ParamKind) -> &AudioParam {
        match kind {
            ParamKind::Gain => &self.gain,
            ParamKind::Threshold => &self.threshold,
            ParamKind::Ratio => &self.ratio,
            ParamKind::Attack => &self.attack,
            ParamKind::Release => &self.release,
        }
    }

    /// Write every value of `values` to the live parameters
    pub fn apply(&self, values: &ParamSet) {
        for kind in ParamKind::ALL {
            self.param(kind).set(values.get(kind));
        }
    }
}

struct CompressorSlot {
    threshold: AudioParam,
    ratio: AudioParam,
    attack: AudioParam,
    release: AudioParam,
    dsp: Compressor,
}

impl CompressorSlot {
    fn settings(&self) -> CompressorSettings {
        CompressorSettings {
            threshold_db: self.threshold.get(),
            ratio: self.ratio.get(),
            attack_s: self.attack.get(),
            release_s: self.release.get(),
        }
    }
}

#[derive(Default)]
struct RenderState {
    feed: Option<Receiver<Vec<f32>>>,
    pending: VecDeque<f32>,
    gain: Option<AudioParam>,
    compressor: Option<CompressorSlot>,
    block: Vec<f32>,
}

impl RenderState {
    fn pull(&mut self, wanted: usize) {
        if let Some(feed) = &self.feed {
            while self.pending.len() < wanted {
                let Ok(chunk) = feed.try_recv() else { break };
                self.pending.extend(chunk);
            }
        }
        let excess = self.pending.len().saturating_sub(MAX_PENDING);
        self.pending.drain(..excess);
    }
}

struct GraphShared {
    sample_rate: u32,
    links: [AtomicU8; 3],
    render: Mutex<RenderState>,
    meter: Arc<MeterState>,
}

/// Audio graph owned by one processing context
#[derive(Clone)]
pub struct SignalGraph {
    shared: Arc<GraphShared>,
}

impl SignalGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            shared: Arc::new(GraphShared {
                sample_rate,
                links: [
                    AtomicU8::new(NO_LINK),
                    AtomicU8::new(NO_LINK),
                    AtomicU8::new(NO_LINK),
                ],
                render: Mutex::new(RenderState::default()),
                meter: Arc::new(MeterState::new()),
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    pub fn meter(&self) -> Arc<MeterState> {
        self.shared.meter.clone()
    }

    /// Wrap a capture feed of mono blocks. Replaces any earlier source.
    pub fn create_source(&self, feed: Receiver<Vec<f32>>) -> SourceNode {
        if let Ok(mut state) = self.shared.render.lock() {
            state.feed = Some(feed);
            state.pending.clear();
        }
        SourceNode { graph: self.clone() }
    }

    pub fn create_gain(&self) -> GainNode {
        let gain = AudioParam::new(1.0);
        if let Ok(mut state) = self.shared.render.lock() {
            state.gain = Some(gain.clone());
        }
        GainNode { graph: self.clone(), gain }
    }

    pub fn create_compressor(&self) -> CompressorNode {
        let defaults = ParamSet::default();
        let node = CompressorNode {
            graph: self.clone(),
            threshold: AudioParam::new(defaults.threshold),
            ratio: AudioParam::new(defaults.ratio),
            attack: AudioParam::new(defaults.attack),
            release: AudioParam::new(defaults.release),
        };
        if let Ok(mut state) = self.shared.render.lock() {
            state.compressor = Some(CompressorSlot {
                threshold: node.threshold.clone(),
                ratio: node.ratio.clone(),
                attack: node.attack.clone(),
                release: node.release.clone(),
                dsp: Compressor::new(self.shared.sample_rate as f32),
            });
        }
        node
    }

    pub fn destination(&self) -> Destination {
        Destination { graph: self.clone() }
    }

    /// Current output link of a node
    pub fn link(&self, from: NodeId) -> Option<NodeId> {
        let slot = from.link_slot()?;
        NodeId::from_raw(self.shared.links[slot].load(Ordering::SeqCst))
    }

    fn same_graph(&self, other: &SignalGraph) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn set_link(&self, from: NodeId, to: Option<NodeId>) {
        if let Some(slot) = from.link_slot() {
            let raw = to.map(NodeId::raw).unwrap_or(NO_LINK);
            self.shared.links[slot].store(raw, Ordering::SeqCst);
        }
    }

    /// Fill interleaved output frames from the source through the connected chain
    pub fn render(&self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = out.len() / channels;

        let Ok(mut state) = self.shared.render.lock() else {
            out.fill(0.0);
            return;
        };

        state.pull(frames);
        let available = state.pending.len().min(frames);
        let mut block = std::mem::take(&mut state.block);
        block.clear();
        block.extend(state.pending.drain(..available));
        block.resize(frames, 0.0);

        if !self.route(&mut state, &mut block) {
            out.fill(0.0);
            self.shared.meter.reset();
            state.block = block;
            return;
        }

        for (frame, &sample) in out.chunks_mut(channels).zip(block.iter()) {
            frame.fill(sample);
        }
        // a trailing partial frame gets no sample
        out[frames * channels..].fill(0.0);

        let peak = block.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        self.shared.meter.set_peak(peak);
        if peak > 1.0 {
            self.shared.meter.set_clipped();
        }
        let reduction = state.compressor.as_ref().map_or(0.0, |c| c.dsp.gain_reduction_db());
        self.shared.meter.set_gain_reduction_db(reduction);

        state.block = block;
    }

    /// Apply each linked stage in order; false unless the walk ends at the destination
    fn route(&self, state: &mut RenderState, block: &mut [f32]) -> bool {
        let mut node = self.link(NodeId::Source);
        // a chain can hold at most three hops
        for _ in 0..3 {
            match node {
                Some(NodeId::Gain) => {
                    let Some(gain) = &state.gain else { return false };
                    apply_gain(block, gain.get());
                    node = self.link(NodeId::Gain);
                }
                Some(NodeId::Compressor) => {
                    let Some(slot) = state.compressor.as_mut() else { return false };
                    let settings = slot.settings();
                    slot.dsp.process(block, &settings);
                    node = self.link(NodeId::Compressor);
                }
                Some(NodeId::Destination) => return true,
                Some(NodeId::Source) | None => return false,
            }
        }
        node == Some(NodeId::Destination)
    }
}

/// A node that can be addressed as a link target
pub trait AudioNode {
    fn node_id(&self) -> NodeId;
    fn graph(&self) -> &SignalGraph;
}

/// A node with one output link
pub trait OutputNode: AudioNode {
    /// Route this node's output into `target`. Reconnecting to the same target is a no-op.
    fn connect<T: AudioNode>(&self, target: &T) -> Result<(), GraphError> {
        if !self.graph().same_graph(target.graph()) {
            return Err(GraphError::ForeignNode);
        }
        let (from, to) = (self.node_id(), target.node_id());
        if to == NodeId::Source || to == from {
            return Err(GraphError::InvalidLink { from, to });
        }
        self.graph().set_link(from, Some(to));
        debug!(?from, ?to, "Node connected");
        Ok(())
    }

    /// Drop the output link. Idempotent.
    fn disconnect(&self) {
        if self.graph().link(self.node_id()).is_some() {
            debug!(node = ?self.node_id(), "Node disconnected");
        }
        self.graph().set_link(self.node_id(), None);
    }
}

pub struct SourceNode {
    graph: SignalGraph,
}

pub struct GainNode {
    graph: SignalGraph,
    gain: AudioParam,
}

impl GainNode {
    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }
}

pub struct CompressorNode {
    graph: SignalGraph,
    threshold: AudioParam,
    ratio: AudioParam,
    attack: AudioParam,
    release: AudioParam,
}

impl CompressorNode {
    pub fn threshold(&self) -> &AudioParam {
        &self.threshold
    }

    pub fn ratio(&self) -> &AudioParam {
        &self.ratio
    }

    pub fn attack(&self) -> &AudioParam {
        &self.attack
    }

    pub fn release(&self) -> &AudioParam {
        &self.release
    }
}

/// Terminal node bound to the output device
pub struct Destination {
    graph: SignalGraph,
}

macro_rules! audio_node {
    ($ty:ty, $id:expr) => {
        impl AudioNode for $ty {
            fn node_id(&self) -> NodeId {
                $id
            }

            fn graph(&self) -> &SignalGraph {
                &self.graph
            }
        }
    };
}

audio_node!(SourceNode, NodeId::Source);
audio_node!(GainNode, NodeId::Gain);
audio_node!(CompressorNode, NodeId::Compressor);
audio_node!(Destination, NodeId::Destination);

impl OutputNode for SourceNode {}
impl OutputNode for GainNode {}
impl OutputNode for CompressorNode {}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, Sender};

    struct Chain {
        graph: SignalGraph,
        tx: Sender<Vec<f32>>,
        source: SourceNode,
        gain: GainNode,
        compressor: CompressorNode,
    }

    fn chain() -> Chain {
        let graph = SignalGraph::new(48_000);
        let (tx, rx) = bounded(8);
        let source = graph.create_source(rx);
        let gain = graph.create_gain();
        let compressor = graph.create_compressor();
        // transparent compressor unless a test says otherwise
        compressor.ratio().set(1.0);
        Chain { graph, tx, source, gain, compressor }
    }

    fn connect_all(c: &Chain) {
        c.source.connect(&c.gain).unwrap();
        c.gain.connect(&c.compressor).unwrap();
        c.compressor.connect(&c.graph.destination()).unwrap();
    }

    #[test]
    fn test_full_chain_applies_gain_to_every_channel() {
        let c = chain();
        connect_all(&c);
        c.gain.gain().set(2.0);
        c.tx.send(vec![0.1, 0.2]).unwrap();

        let mut out = vec![9.0; 4];
        c.graph.render(&mut out, 2);
        assert!((out[0] - 0.2).abs() < 1e-6 && (out[1] - 0.2).abs() < 1e-6);
        assert!((out[2] - 0.4).abs() < 1e-6 && (out[3] - 0.4).abs() < 1e-6);
        assert!((c.graph.meter().peak() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_incomplete_chain_is_silent() {
        let c = chain();
        c.source.connect(&c.gain).unwrap();
        c.gain.connect(&c.compressor).unwrap();
        c.tx.send(vec![0.5; 4]).unwrap();

        let mut out = vec![1.0; 4];
        c.graph.render(&mut out, 1);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_disconnect_is_idempotent_and_silences() {
        let c = chain();
        connect_all(&c);
        c.gain.disconnect();
        c.gain.disconnect();
        assert_eq!(c.graph.link(NodeId::Gain), None);

        c.tx.send(vec![0.5; 4]).unwrap();
        let mut out = vec![1.0; 4];
        c.graph.render(&mut out, 1);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_compressor_sees_post_gain_level() {
        // -26 dBFS input sits below a -20 dB threshold until the gain stage lifts it
        let c = chain();
        connect_all(&c);
        c.compressor.threshold().set(-20.0);
        c.compressor.ratio().set(20.0);
        c.compressor.attack().set(0.0);
        c.compressor.release().set(0.0);

        c.tx.send(vec![0.05; 8]).unwrap();
        let mut quiet = vec![0.0; 8];
        c.graph.render(&mut quiet, 1);
        assert!((quiet[7] - 0.05).abs() < 1e-4);

        c.gain.gain().set(10.0);
        c.tx.send(vec![0.05; 8]).unwrap();
        let mut loud = vec![0.0; 8];
        c.graph.render(&mut loud, 1);
        assert!(loud[7] < 0.5);
        assert!(c.graph.meter().gain_reduction_db() < 0.0);
    }

    #[test]
    fn test_connect_rejects_invalid_links() {
        let c = chain();
        assert_eq!(
            c.gain.connect(&c.source),
            Err(GraphError::InvalidLink { from: NodeId::Gain, to: NodeId::Source })
        );
        let other = SignalGraph::new(48_000);
        assert_eq!(c.compressor.connect(&other.destination()), Err(GraphError::ForeignNode));
    }

    #[test]
    fn test_partial_trailing_frame_is_zeroed() {
        let c = chain();
        connect_all(&c);
        c.tx.send(vec![0.5, 0.5]).unwrap();

        let mut out = vec![9.0; 5];
        c.graph.render(&mut out, 2);
        assert_eq!(out, vec![0.5, 0.5, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_short_feed_pads_with_silence() {
        let c = chain();
        connect_all(&c);
        c.tx.send(vec![0.25]).unwrap();

        let mut out = vec![1.0; 3];
        c.graph.render(&mut out, 1);
        assert_eq!(out, vec![0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_live_params_apply_reaches_nodes() {
        let c = chain();
        let live = LiveParams {
            gain: c.gain.gain().clone(),
            threshold: c.compressor.threshold().clone(),
            ratio: c.compressor.ratio().clone(),
            attack: c.compressor.attack().clone(),
            release: c.compressor.release().clone(),
        };
        let values = ParamSet { gain: 0.3, threshold: -12.0, ratio: 4.0, attack: 0.01, release: 0.2 };
        live.apply(&values);
        assert_eq!(c.gain.gain().get(), 0.3);
        assert_eq!(c.compressor.threshold().get(), -12.0);
        assert_eq!(c.compressor.ratio().get(), 4.0);
        assert_eq!(c.compressor.attack().get(), 0.01);
        assert_eq!(c.compressor.release().get(), 0.2);
    }
}
