//! livemon: microphone live monitor with gain and compression

mod app;
mod config;
mod panels;

use app::LivemonApp;
use eframe::NativeOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eframe::Result<()> {
    // Initialize logging
    let mut filter = EnvFilter::from_default_env();
    for directive in ["livemon=debug", "livemon_services=debug", "livemon_core=debug", "wgpu=warn", "eframe=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    tracing::info!("Starting livemon");

    let config = config::load_config();

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 340.0])
            .with_min_inner_size([420.0, 300.0]),
        ..Default::default()
    };

    eframe::run_native(
        "livemon",
        options,
        Box::new(|cc| Ok(Box::new(LivemonApp::new(cc, config)))),
    )
}
