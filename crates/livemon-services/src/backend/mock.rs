//! In-memory backend for controller tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use livemon_core::StartError;

use super::{AudioBackend, CaptureConstraints, CaptureStream, ContextState, ProcessingContext};
use crate::graph::{NodeId, SignalGraph};

/// Where the next start attempt goes wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    NoContext,
    StaysSuspended,
    PermissionDenied,
    DeviceMissing,
    /// Microphone request blocks until `release()`
    BlockMicrophone,
}

#[derive(Default)]
pub struct MockStats {
    pub contexts_created: AtomicUsize,
    pub contexts_open: AtomicUsize,
    pub contexts_open_peak: AtomicUsize,
    pub tracks_live: AtomicUsize,
    pub tracks_stopped: AtomicUsize,
    /// Output links still set when the last context was closed
    pub links_at_close: AtomicUsize,
}

impl MockStats {
    pub fn open(&self) -> usize {
        self.contexts_open.load(Ordering::SeqCst)
    }

    pub fn tracks(&self) -> usize {
        self.tracks_live.load(Ordering::SeqCst)
    }
}

struct Inner {
    fault: Mutex<Fault>,
    stats: MockStats,
    last_graph: Mutex<Option<SignalGraph>>,
    gate_tx: Sender<()>,
    gate_rx: Receiver<()>,
}

#[derive(Clone)]
pub struct MockBackend {
    inner: Arc<Inner>,
}

impl MockBackend {
    pub fn new(fault: Fault) -> Self {
        let (gate_tx, gate_rx) = unbounded();
        Self {
            inner: Arc::new(Inner {
                fault: Mutex::new(fault),
                stats: MockStats::default(),
                last_graph: Mutex::new(None),
                gate_tx,
                gate_rx,
            }),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.inner.fault.lock().unwrap() = fault;
    }

    pub fn stats(&self) -> &MockStats {
        &self.inner.stats
    }

    /// Let one blocked microphone request return
    pub fn release(&self) {
        self.inner.gate_tx.send(()).unwrap();
    }

    /// Graph of the most recently created context
    pub fn last_graph(&self) -> Option<SignalGraph> {
        self.inner.last_graph.lock().unwrap().clone()
    }

    fn fault(&self) -> Fault {
        *self.inner.fault.lock().unwrap()
    }
}

impl AudioBackend for MockBackend {
    type Context = MockContext;

    fn create_context(&self) -> Result<MockContext, StartError> {
        if self.fault() == Fault::NoContext {
            return Err(StartError::ContextUnavailable("no output device".to_string()));
        }
        let stats = &self.inner.stats;
        stats.contexts_created.fetch_add(1, Ordering::SeqCst);
        let open = stats.contexts_open.fetch_add(1, Ordering::SeqCst) + 1;
        stats.contexts_open_peak.fetch_max(open, Ordering::SeqCst);

        let graph = SignalGraph::new(48_000);
        *self.inner.last_graph.lock().unwrap() = Some(graph.clone());
        Ok(MockContext {
            backend: self.clone(),
            graph,
            state: ContextState::Suspended,
        })
    }
}

pub struct MockContext {
    backend: MockBackend,
    graph: SignalGraph,
    state: ContextState,
}

impl ProcessingContext for MockContext {
    type Capture = MockCapture;

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), StartError> {
        if self.backend.fault() != Fault::StaysSuspended {
            self.state = ContextState::Running;
        }
        Ok(())
    }

    fn request_microphone(
        &mut self,
        _constraints: &CaptureConstraints,
    ) -> Result<MockCapture, StartError> {
        match self.backend.fault() {
            Fault::PermissionDenied => return Err(StartError::PermissionDenied),
            Fault::DeviceMissing => {
                return Err(StartError::DeviceUnavailable("no input device".to_string()));
            }
            Fault::BlockMicrophone => {
                let _ = self.backend.inner.gate_rx.recv();
            }
            _ => {}
        }

        let (tx, rx) = bounded(4);
        self.backend.inner.stats.tracks_live.fetch_add(1, Ordering::SeqCst);
        Ok(MockCapture {
            backend: self.backend.clone(),
            _tx: tx,
            feed: Some(rx),
            live: 1,
        })
    }

    fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    fn close(&mut self) {
        if self.state != ContextState::Closed {
            self.state = ContextState::Closed;
            let stats = &self.backend.inner.stats;
            let linked = [NodeId::Source, NodeId::Gain, NodeId::Compressor]
                .into_iter()
                .filter(|node| self.graph.link(*node).is_some())
                .count();
            stats.links_at_close.store(linked, Ordering::SeqCst);
            stats.contexts_open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub struct MockCapture {
    backend: MockBackend,
    _tx: Sender<Vec<f32>>,
    feed: Option<Receiver<Vec<f32>>>,
    live: usize,
}

impl CaptureStream for MockCapture {
    fn take_feed(&mut self) -> Option<Receiver<Vec<f32>>> {
        self.feed.take()
    }

    fn stop_tracks(&mut self) {
        if self.live > 0 {
            self.live = 0;
            let stats = &self.backend.inner.stats;
            stats.tracks_live.fetch_sub(1, Ordering::SeqCst);
            stats.tracks_stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn live_tracks(&self) -> usize {
        self.live
    }
}
