//! Locate and load the monitor configuration file

use std::path::PathBuf;

use livemon_core::{ConfigError, MonitorConfig};
use tracing::{debug, info, warn};

const APP_DIR: &str = "livemon";

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Load `<config dir>/livemon/config.toml`, falling back to defaults
pub fn load_config() -> MonitorConfig {
    let path = config_path();
    match MonitorConfig::load(&path) {
        Ok(config) => {
            info!(path = %path.display(), "Loaded config");
            config
        }
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No config file, using defaults");
            MonitorConfig::default()
        }
        Err(e) => {
            warn!(path = %path.display(), "Ignoring config: {}", e);
            MonitorConfig::default()
        }
    }
}
