//! The production [`StatusProbe`]: `ifconfig` plus the Realtek settings plist.

use std::path::PathBuf;

use tracing::warn;

use crate::config::AppConfig;
use crate::interface::IfconfigInspector;
use crate::settings;
use crate::status::StatusProbe;

/// Probes the live system. Every failure is logged and reported as "nothing
/// found", which the UI shows as disconnected.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    inspector: IfconfigInspector,
    settings_path: PathBuf,
}

impl SystemProbe {
    pub fn new(inspector: IfconfigInspector, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            inspector,
            settings_path: settings_path.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            IfconfigInspector::new(&config.ifconfig_path, &config.interface),
            &config.settings_path,
        )
    }
}

impl StatusProbe for SystemProbe {
    fn resolve_address(&self) -> Option<String> {
        match self.inspector.address() {
            Ok(address) => address,
            Err(e) => {
                warn!(
                    interface = %self.inspector.interface(),
                    error = %e,
                    "failed to inspect interface"
                );
                None
            }
        }
    }

    fn resolve_last_network(&self) -> Option<String> {
        match settings::read_last_network(&self.settings_path) {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "failed to read wifi utility settings");
                None
            }
        }
    }
}
