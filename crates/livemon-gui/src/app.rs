//! Main application state

use std::time::Duration;

use eframe::CreationContext;
use egui::Context;
use livemon_core::MonitorConfig;
use livemon_services::{CpalBackend, InputDevice, LiveMonitor, MonitorState};

use crate::panels::{MeterPanel, ParamPanel, TransportAction, TransportPanel};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub struct LivemonApp {
    monitor: LiveMonitor<CpalBackend>,
    devices: Vec<InputDevice>,
    transport_panel: TransportPanel,
    param_panel: ParamPanel,
    meter_panel: MeterPanel,
}

impl LivemonApp {
    pub fn new(_cc: &CreationContext<'_>, config: MonitorConfig) -> Self {
        let monitor = LiveMonitor::new(CpalBackend::new(), &config);
        let mut app = Self {
            monitor,
            devices: Vec::new(),
            transport_panel: TransportPanel::new(),
            param_panel: ParamPanel::new(),
            meter_panel: MeterPanel::new(),
        };
        app.refresh_devices();
        app
    }

    fn refresh_devices(&mut self) {
        match self.monitor.backend().list_input_devices() {
            Ok(devices) => {
                tracing::debug!(count = devices.len(), "Input devices enumerated");
                self.devices = devices;
            }
            Err(e) => {
                tracing::warn!("Failed to enumerate input devices: {}", e);
                self.devices.clear();
            }
        }
    }

    fn handle_transport(&mut self, action: TransportAction) {
        match action {
            TransportAction::Start => {
                self.monitor.start();
            }
            TransportAction::Stop => self.monitor.stop(),
            TransportAction::CancelStart => self.monitor.cancel_start(),
            TransportAction::SelectDevice(device) => self.monitor.set_input_device(device),
            TransportAction::RefreshDevices => self.refresh_devices(),
            TransportAction::None => {}
        }
    }
}

impl eframe::App for LivemonApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        // Pick up progress from a pending start before drawing
        self.monitor.poll();

        // 1. Transport bar
        let transport_action = egui::TopBottomPanel::top("transport").show(ctx, |ui| {
            ui.add_space(4.0);
            let action = self.transport_panel.ui(
                ui,
                self.monitor.state(),
                self.monitor.controls(),
                self.monitor.status(),
                &self.devices,
                self.monitor.input_device(),
            );
            ui.add_space(4.0);
            action
        }).inner;

        self.handle_transport(transport_action);

        // 2. Meters
        let meter = self.monitor.meter();
        egui::TopBottomPanel::bottom("meters")
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                self.meter_panel.ui(ui, meter.as_ref());
                ui.add_space(4.0);
            });

        // 3. Sliders
        let changes = egui::CentralPanel::default().show(ctx, |ui| {
            self.param_panel.ui(ui, self.monitor.panel())
        }).inner;

        for (kind, value) in changes {
            if let Err(e) = self.monitor.set_param(kind, value) {
                tracing::warn!("Rejected {} change: {}", kind, e);
            }
        }

        // poll every frame while anything is in flight
        let busy = self.monitor.state() == MonitorState::Starting
            || self.monitor.is_running()
            || self.monitor.is_releasing();
        if busy {
            ctx.request_repaint_after(FRAME_INTERVAL);
        }
    }
}
