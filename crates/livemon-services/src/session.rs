//! Session worker: acquires the context and microphone, owns the chain, tears it down

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use livemon_core::{ParamSet, StartError, Status};
use tracing::{debug, info, warn};

use crate::backend::{AudioBackend, CaptureConstraints, CaptureStream, ContextState, ProcessingContext};
use crate::graph::{CompressorNode, GainNode, LiveParams, OutputNode, SourceNode};
use crate::meter::MeterState;

/// Worker → controller
pub(crate) enum SessionEvent {
    Progress(Status),
    Ready(LiveParams, Arc<MeterState>),
    Failed(StartError),
}

/// Controller → worker
pub(crate) enum SessionCommand {
    Stop,
}

pub(crate) struct SessionRequest {
    pub seed: ParamSet,
    pub constraints: CaptureConstraints,
}

/// Run one start attempt and, if it succeeds, the session it produced.
///
/// Host stream handles may not leave the thread that built them, so the worker
/// keeps the session until a stop command arrives or the command channel drops.
pub(crate) fn spawn<B: AudioBackend>(
    backend: Arc<B>,
    request: SessionRequest,
    events: Sender<SessionEvent>,
    commands: Receiver<SessionCommand>,
    cancel: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("livemon-session".to_string())
        .spawn(move || {
            let opened = Session::<B::Context>::open(&*backend, &request, &events, &cancel);
            let (mut session, live) = match opened {
                Ok(opened) => opened,
                Err(e) => {
                    let _ = events.send(SessionEvent::Failed(e));
                    return;
                }
            };

            if cancel.load(Ordering::SeqCst) {
                session.close();
                return;
            }
            let ready = SessionEvent::Ready(live, session.meter());
            if events.send(ready).is_err() {
                session.close();
                return;
            }

            match commands.recv() {
                Ok(SessionCommand::Stop) => debug!("Stop command received"),
                Err(_) => debug!("Controller gone, closing session"),
            }
            session.close();
        })
}

struct Chain {
    source: SourceNode,
    gain: GainNode,
    compressor: CompressorNode,
}

/// Context, capture and chain of one monitoring session. Dropping it releases all three.
struct Session<C: ProcessingContext> {
    context: C,
    capture: Option<C::Capture>,
    chain: Option<Chain>,
    closed: bool,
}

impl<C: ProcessingContext> Session<C> {
    fn open<B>(
        backend: &B,
        request: &SessionRequest,
        events: &Sender<SessionEvent>,
        cancel: &AtomicBool,
    ) -> Result<(Self, LiveParams), StartError>
    where
        B: AudioBackend<Context = C>,
    {
        let context = backend.create_context()?;
        let mut session = Self {
            context,
            capture: None,
            chain: None,
            closed: false,
        };

        if session.context.state() == ContextState::Suspended {
            debug!("Context suspended, resuming");
            session.context.resume()?;
        }
        let state = session.context.state();
        if state != ContextState::Running {
            return Err(StartError::ContextUnavailable(format!("context is {}", state)));
        }
        info!("Processing context running");
        check_cancelled(cancel)?;

        let capture = session.context.request_microphone(&request.constraints)?;
        session.capture = Some(capture);
        check_cancelled(cancel)?;
        info!("Microphone connected");
        progress(events, Status::MicrophoneConnected);

        let live = session.build_chain(&request.seed, events)?;
        Ok((session, live))
    }

    /// Create the three nodes from `seed` and wire source → gain → compressor → destination
    fn build_chain(
        &mut self,
        seed: &ParamSet,
        events: &Sender<SessionEvent>,
    ) -> Result<LiveParams, StartError> {
        let feed = self
            .capture
            .as_mut()
            .and_then(|c| c.take_feed())
            .ok_or_else(|| StartError::Other("microphone stream has no feed".to_string()))?;
        let graph = self.context.graph().clone();

        let source = graph.create_source(feed);

        let gain = graph.create_gain();
        gain.gain().set(seed.gain);
        info!(gain = seed.gain, "Gain stage created");
        progress(events, Status::GainCreated);

        let compressor = graph.create_compressor();
        compressor.threshold().set(seed.threshold);
        compressor.ratio().set(seed.ratio);
        compressor.attack().set(seed.attack);
        compressor.release().set(seed.release);
        info!(
            threshold = seed.threshold,
            ratio = seed.ratio,
            attack = seed.attack,
            release = seed.release,
            "Compressor created"
        );
        progress(events, Status::CompressorCreated);

        // Stored before wiring so a failed connect still gets disconnected on drop
        let chain = self.chain.insert(Chain { source, gain, compressor });
        chain.source.connect(&chain.gain)?;
        chain.gain.connect(&chain.compressor)?;
        chain.compressor.connect(&graph.destination())?;
        info!("Chain connected: mic -> gain -> compressor -> output");

        Ok(LiveParams {
            gain: chain.gain.gain().clone(),
            threshold: chain.compressor.threshold().clone(),
            ratio: chain.compressor.ratio().clone(),
            attack: chain.compressor.attack().clone(),
            release: chain.compressor.release().clone(),
        })
    }

    fn meter(&self) -> Arc<MeterState> {
        self.context.graph().meter()
    }

    /// Release top-down: capture tracks, node links, context
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(capture) = self.capture.as_mut() {
            capture.stop_tracks();
            if capture.live_tracks() > 0 {
                warn!(tracks = capture.live_tracks(), "Capture tracks still live after stop");
            }
        }
        if let Some(chain) = self.chain.take() {
            chain.source.disconnect();
            chain.gain.disconnect();
            chain.compressor.disconnect();
        }
        self.context.close();
        info!("Session closed");
    }
}

impl<C: ProcessingContext> Drop for Session<C> {
    fn drop(&mut self) {
        self.close();
    }
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), StartError> {
    if cancel.load(Ordering::SeqCst) {
        return Err(StartError::Cancelled);
    }
    Ok(())
}

fn progress(events: &Sender<SessionEvent>, status: Status) {
    let _ = events.send(SessionEvent::Progress(status));
}
