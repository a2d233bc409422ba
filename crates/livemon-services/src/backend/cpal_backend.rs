//! Host audio through cpal: output-bound context and microphone capture

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BuildStreamError, DefaultStreamConfigError, Device, FromSample, PlayStreamError, SampleFormat,
    SampleRate, StreamConfig, SupportedStreamConfig,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use livemon_core::StartError;
use tracing::{debug, error, info, warn};

use super::{AudioBackend, CaptureConstraints, CaptureStream, ContextState, ProcessingContext};
use crate::graph::SignalGraph;

/// Capture blocks buffered between the input callback and the graph
const FEED_CAPACITY: usize = 64;

/// Audio input device info
#[derive(Debug, Clone)]
pub struct InputDevice {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub is_default: bool,
}

/// Backend for the host's default audio API
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }

    /// List available input devices
    pub fn list_input_devices(&self) -> Result<Vec<InputDevice>, StartError> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| StartError::DeviceUnavailable(e.to_string()))?
            .filter_map(|device| {
                let name = device.name().ok()?;
                let config = device.default_input_config().ok()?;

                Some(InputDevice {
                    is_default: default_name.as_ref() == Some(&name),
                    sample_rate: config.sample_rate().0,
                    channels: config.channels(),
                    name,
                })
            })
            .collect();

        debug!(count = devices.len(), "Found audio input devices");
        Ok(devices)
    }
}

impl AudioBackend for CpalBackend {
    type Context = CpalContext;

    fn create_context(&self) -> Result<CpalContext, StartError> {
        CpalContext::open()
    }
}

/// Output stream driving a signal graph; starts suspended
pub struct CpalContext {
    graph: SignalGraph,
    stream: Option<cpal::Stream>,
    state: ContextState,
}

impl CpalContext {
    fn open() -> Result<Self, StartError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| StartError::ContextUnavailable("no output device".to_string()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| StartError::ContextUnavailable(e.to_string()))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let graph = SignalGraph::new(sample_rate);
        let render_graph = graph.clone();
        let config: StreamConfig = supported.into();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render_graph.render(data, channels as usize);
                },
                |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| StartError::ContextUnavailable(e.to_string()))?;

        if let Err(e) = stream.pause() {
            warn!(error = %e, "Output stream could not be paused after build");
        }

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels,
            "Processing context created"
        );

        Ok(Self {
            graph,
            stream: Some(stream),
            state: ContextState::Suspended,
        })
    }
}

impl ProcessingContext for CpalContext {
    type Capture = CpalCapture;

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), StartError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| StartError::ContextUnavailable("context closed".to_string()))?;
        stream
            .play()
            .map_err(|e| StartError::ContextUnavailable(e.to_string()))?;
        self.state = ContextState::Running;
        Ok(())
    }

    fn request_microphone(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<CpalCapture, StartError> {
        if self.state == ContextState::Closed {
            return Err(StartError::ContextUnavailable("context closed".to_string()));
        }
        CpalCapture::open(constraints, self.graph.sample_rate())
    }

    fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!(error = %e, "Failed to pause output stream on close");
            }
            drop(stream);
            info!("Processing context closed");
        }
        self.state = ContextState::Closed;
    }
}

impl Drop for CpalContext {
    fn drop(&mut self) {
        self.close();
    }
}

/// Microphone input stream producing mono blocks
pub struct CpalCapture {
    stream: Option<cpal::Stream>,
    feed: Option<Receiver<Vec<f32>>>,
    stop_flag: Arc<AtomicBool>,
    device: String,
}

impl CpalCapture {
    fn open(constraints: &CaptureConstraints, preferred_rate: u32) -> Result<Self, StartError> {
        let device = find_input_device(constraints.device.as_deref())?;
        let name = device.name().unwrap_or_default();
        let config = input_config(&device, preferred_rate)?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        info!(device = %name, sample_rate, channels, "Opening microphone");

        let (tx, rx) = bounded(FEED_CAPACITY);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();
        let stream_config: StreamConfig = config.clone().into();

        let stream = match config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, tx, stop_clone),
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, tx, stop_clone),
            SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, tx, stop_clone),
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, tx, stop_clone),
            format => {
                return Err(StartError::Other(format!("Unsupported input format: {:?}", format)));
            }
        }?;

        stream.play().map_err(map_play_error)?;

        Ok(Self {
            stream: Some(stream),
            feed: Some(rx),
            stop_flag,
            device: name,
        })
    }
}

impl CaptureStream for CpalCapture {
    fn take_feed(&mut self) -> Option<Receiver<Vec<f32>>> {
        self.feed.take()
    }

    fn stop_tracks(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!(error = %e, "Failed to pause input stream");
            }
            drop(stream);
            info!(device = %self.device, "Microphone released");
        }
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.stream.is_some())
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

/// Get device by name, or the default when no name is given
fn find_input_device(name: Option<&str>) -> Result<Device, StartError> {
    let host = cpal::default_host();

    let Some(wanted) = name else {
        return host
            .default_input_device()
            .ok_or_else(|| StartError::DeviceUnavailable("no input device".to_string()));
    };

    let devices = host
        .input_devices()
        .map_err(|e| classify_backend_message(&e.to_string()))?;
    for device in devices {
        if device.name().is_ok_and(|n| n == wanted) {
            return Ok(device);
        }
    }

    Err(StartError::DeviceUnavailable(format!("device not found: {}", wanted)))
}

/// Default input config, moved to the output rate when the device supports it
fn input_config(device: &Device, preferred_rate: u32) -> Result<SupportedStreamConfig, StartError> {
    let default = device.default_input_config().map_err(map_config_error)?;
    if default.sample_rate().0 == preferred_rate {
        return Ok(default);
    }

    let matching = device.supported_input_configs().ok().and_then(|mut configs| {
        configs.find(|c| {
            c.channels() == default.channels()
                && c.sample_format() == default.sample_format()
                && c.min_sample_rate().0 <= preferred_rate
                && c.max_sample_rate().0 >= preferred_rate
        })
    });

    match matching {
        Some(range) => Ok(range.with_sample_rate(SampleRate(preferred_rate))),
        None => {
            warn!(
                input_rate = default.sample_rate().0,
                output_rate = preferred_rate,
                "Input cannot match output sample rate"
            );
            Ok(default)
        }
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    tx: Sender<Vec<f32>>,
    stop_flag: Arc<AtomicBool>,
) -> Result<cpal::Stream, StartError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if stop_flag.load(Ordering::SeqCst) {
                    return;
                }
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .map(|frame| {
                        frame.iter().map(|s| f32::from_sample_(*s)).sum::<f32>() / frame.len() as f32
                    })
                    .collect();
                let _ = tx.try_send(mono);
            },
            |err| error!("Input stream error: {}", err),
            None,
        )
        .map_err(map_build_error)
}

/// Hosts report denied microphone access only through backend-specific text
pub(crate) fn classify_backend_message(description: &str) -> StartError {
    let lower = description.to_lowercase();
    let denied = ["permission", "denied", "not authorized", "not permitted"]
        .iter()
        .any(|needle| lower.contains(needle));
    if denied {
        StartError::PermissionDenied
    } else {
        StartError::Other(description.to_string())
    }
}

fn map_build_error(err: BuildStreamError) -> StartError {
    match err {
        BuildStreamError::DeviceNotAvailable => {
            StartError::DeviceUnavailable("device not available".to_string())
        }
        BuildStreamError::BackendSpecific { err } => classify_backend_message(&err.description),
        other => StartError::Other(other.to_string()),
    }
}

fn map_config_error(err: DefaultStreamConfigError) -> StartError {
    match err {
        DefaultStreamConfigError::DeviceNotAvailable => {
            StartError::DeviceUnavailable("device not available".to_string())
        }
        DefaultStreamConfigError::StreamTypeNotSupported => {
            StartError::DeviceUnavailable("device has no input".to_string())
        }
        DefaultStreamConfigError::BackendSpecific { err } => {
            classify_backend_message(&err.description)
        }
    }
}

fn map_play_error(err: PlayStreamError) -> StartError {
    match err {
        PlayStreamError::DeviceNotAvailable => {
            StartError::DeviceUnavailable("device not available".to_string())
        }
        PlayStreamError::BackendSpecific { err } => classify_backend_message(&err.description),
    }
}
