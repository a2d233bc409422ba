//! Live monitor controller: start/stop lifecycle and slider forwarding

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use livemon_core::{
    ControlPanel, Controls, MonitorConfig, ParamError, ParamKind, StartError, Status,
};
use tracing::{debug, error, info, trace, warn};

use crate::backend::{AudioBackend, CaptureConstraints};
use crate::graph::LiveParams;
use crate::meter::MeterState;
use crate::session::{self, SessionCommand, SessionEvent, SessionRequest};

const EVENT_CAPACITY: usize = 16;
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Public view of the controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Starting,
    Running,
}

struct PendingStart {
    events: Receiver<SessionEvent>,
    commands: Sender<SessionCommand>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<()>,
    deadline: Instant,
}

struct ActiveSession {
    live: LiveParams,
    meter: Arc<MeterState>,
    commands: Sender<SessionCommand>,
    worker: JoinHandle<()>,
}

enum Phase {
    Idle,
    Starting(PendingStart),
    Running(ActiveSession),
}

/// Microphone live monitor: mic → gain → compressor → output
pub struct LiveMonitor<B: AudioBackend> {
    backend: Arc<B>,
    panel: ControlPanel,
    status: Status,
    phase: Phase,
    constraints: CaptureConstraints,
    start_timeout: Duration,
    /// Cancelled workers still stuck in a platform call
    abandoned: Vec<JoinHandle<()>>,
}

impl<B: AudioBackend> LiveMonitor<B> {
    pub fn new(backend: B, config: &MonitorConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            panel: ControlPanel::new(config.ranges),
            status: Status::Ready,
            phase: Phase::Idle,
            constraints: CaptureConstraints::from_config(config),
            start_timeout: config.start_timeout(),
            abandoned: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> MonitorState {
        match self.phase {
            Phase::Idle => MonitorState::Idle,
            Phase::Starting(_) => MonitorState::Starting,
            Phase::Running(_) => MonitorState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running(_))
    }

    /// True while a cancelled or timed-out worker still owns its context
    pub fn is_releasing(&self) -> bool {
        self.abandoned.iter().any(|worker| !worker.is_finished())
    }

    pub fn panel(&self) -> &ControlPanel {
        &self.panel
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn controls(&self) -> Controls {
        self.panel.controls()
    }

    /// Value currently applied to the audio path; `None` unless running
    pub fn live_value(&self, kind: ParamKind) -> Option<f32> {
        match &self.phase {
            Phase::Running(active) => Some(active.live.param(kind).get()),
            _ => None,
        }
    }

    pub fn meter(&self) -> Option<Arc<MeterState>> {
        match &self.phase {
            Phase::Running(active) => Some(active.meter.clone()),
            _ => None,
        }
    }

    /// Input device for the next start; `None` is the host default
    pub fn input_device(&self) -> Option<&str> {
        self.constraints.device.as_deref()
    }

    pub fn set_input_device(&mut self, device: Option<String>) {
        debug!(device = ?device, "Input device selected");
        self.constraints.device = device;
    }

    /// Begin a start attempt. Ignored unless idle with no abandoned worker left.
    pub fn start(&mut self) -> bool {
        if !matches!(self.phase, Phase::Idle) {
            debug!(state = ?self.state(), "Start ignored");
            return false;
        }
        if self.is_releasing() {
            debug!(workers = self.abandoned.len(), "Start ignored; previous start still releasing");
            self.status = Status::Releasing;
            self.panel.set_controls(Controls::RELEASING);
            return false;
        }

        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        let (command_tx, command_rx) = bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let request = SessionRequest {
            seed: self.panel.values(),
            constraints: self.constraints.clone(),
        };

        match session::spawn(self.backend.clone(), request, event_tx, command_rx, cancel.clone()) {
            Ok(worker) => {
                self.phase = Phase::Starting(PendingStart {
                    events: event_rx,
                    commands: command_tx,
                    cancel,
                    worker,
                    deadline: Instant::now() + self.start_timeout,
                });
                self.status = Status::Initializing;
                self.panel.set_controls(Controls::STARTING);
                info!(state = "starting", "Monitor state entered");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to spawn session worker");
                self.status = Status::Error(e.to_string());
                self.panel.set_controls(Controls::IDLE);
                false
            }
        }
    }

    /// Apply worker progress and enforce the start timeout. Call once per UI frame.
    pub fn poll(&mut self) {
        self.abandoned.retain(|worker| !worker.is_finished());
        let idle = matches!(self.phase, Phase::Idle);
        if idle && self.abandoned.is_empty() && self.panel.controls() == Controls::RELEASING {
            debug!("Abandoned start released");
            self.panel.set_controls(Controls::IDLE);
        }

        let Phase::Starting(pending) = &self.phase else {
            return;
        };

        let mut outcome = None;
        loop {
            match pending.events.try_recv() {
                Ok(SessionEvent::Progress(status)) => {
                    debug!(status = %status, "Start progress");
                    self.status = status;
                }
                Ok(SessionEvent::Ready(live, meter)) => {
                    outcome = Some(Ok((live, meter)));
                    break;
                }
                Ok(SessionEvent::Failed(e)) => {
                    outcome = Some(Err(e));
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    outcome = Some(Err(StartError::Other("session worker exited".to_string())));
                    break;
                }
            }
        }

        let timed_out = Instant::now() >= pending.deadline;
        match outcome {
            Some(Ok((live, meter))) => self.enter_running(live, meter),
            Some(Err(e)) => self.fail_start(e),
            None if timed_out => self.abandon_start(StartError::TimedOut(self.start_timeout)),
            None => {}
        }
    }

    /// Poll until the controller leaves `Starting` or `limit` elapses
    pub fn wait_until_settled(&mut self, limit: Duration) -> MonitorState {
        let until = Instant::now() + limit;
        loop {
            self.poll();
            if self.state() != MonitorState::Starting || Instant::now() >= until {
                return self.state();
            }
            thread::sleep(SETTLE_POLL_INTERVAL);
        }
    }

    /// Give up on an in-flight start
    pub fn cancel_start(&mut self) {
        if matches!(self.phase, Phase::Starting(_)) {
            self.abandon_start(StartError::Cancelled);
        } else {
            debug!(state = ?self.state(), "Cancel ignored; no start in flight");
        }
    }

    /// Tear down the running session. No-op when idle; cancels when starting.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                debug!("Stop ignored; monitor idle");
            }
            Phase::Starting(pending) => {
                self.phase = Phase::Starting(pending);
                self.abandon_start(StartError::Cancelled);
            }
            Phase::Running(active) => {
                let _ = active.commands.send(SessionCommand::Stop);
                if active.worker.join().is_err() {
                    error!("Session worker panicked during teardown");
                }
                self.status = Status::Stopped;
                self.panel.set_controls(Controls::IDLE);
                info!(state = "idle", "Monitor stopped");
            }
        }
    }

    /// Slider input. Always updates the panel; forwarded to audio only while running.
    pub fn set_param(&mut self, kind: ParamKind, value: f32) -> Result<f32, ParamError> {
        let value = self
            .panel
            .set(kind, value)
            .inspect_err(|e| warn!(error = %e, "Parameter rejected"))?;
        match &self.phase {
            Phase::Running(active) => {
                active.live.param(kind).set(value);
                debug!(%kind, value, "Parameter forwarded");
            }
            _ => trace!(%kind, value, "Parameter stored"),
        }
        Ok(value)
    }

    fn enter_running(&mut self, live: LiveParams, meter: Arc<MeterState>) {
        let Phase::Starting(pending) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return;
        };
        // sliders may have moved while starting
        live.apply(&self.panel.values());
        self.phase = Phase::Running(ActiveSession {
            live,
            meter,
            commands: pending.commands,
            worker: pending.worker,
        });
        self.status = Status::Active;
        self.panel.set_controls(Controls::RUNNING);
        info!(state = "running", "Monitor state entered");
    }

    fn fail_start(&mut self, err: StartError) {
        let Phase::Starting(pending) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return;
        };
        if pending.worker.join().is_err() {
            error!("Session worker panicked");
        }
        warn!(error = %err, "Start failed");
        self.status = Status::from(&err);
        self.panel.set_controls(Controls::IDLE);
        info!(state = "idle", "Monitor state entered");
    }

    /// Cancel or time out: the worker cleans up on its own once its platform call returns
    fn abandon_start(&mut self, err: StartError) {
        let Phase::Starting(pending) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return;
        };
        pending.cancel.store(true, Ordering::SeqCst);
        drop(pending.commands);
        drop(pending.events);
        if !pending.worker.is_finished() {
            self.abandoned.push(pending.worker);
        }
        warn!(error = %err, "Start abandoned");
        self.status = Status::from(&err);
        let controls = if self.is_releasing() { Controls::RELEASING } else { Controls::IDLE };
        self.panel.set_controls(controls);
        info!(state = "idle", "Monitor state entered");
    }
}

impl<B: AudioBackend> Drop for LiveMonitor<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
