//! Runtime configuration.
//!
//! Every path and name the status item touches has a fixed default matching
//! the Realtek utility layout. The CLI can override a handful of them.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Settings plist written by the Realtek utility.
pub const DEFAULT_SETTINGS_PATH: &str =
    "/Library/Application Support/WLAN/com.realtek.utility.wifi/wifiUtility.plist";

/// Vendor helper that drives association.
pub const DEFAULT_HELPER_PATH: &str =
    "/Library/Application Support/WLAN/com.realtek.utility.wifi/RtWlanHelper";

/// The only environment variable handed to the helper.
pub const DEFAULT_HELPER_SEARCH_PATH: &str = "/usr/bin:/bin:/usr/sbin:/sbin";

/// Interface inspection command.
pub const DEFAULT_IFCONFIG_PATH: &str = "/sbin/ifconfig";

/// Interface the adapter's driver registers.
pub const DEFAULT_INTERFACE: &str = "en1";

/// System sound played once a reconnect finishes.
pub const DEFAULT_SOUND: &str = "Ping";

/// Pause between the helper exiting and sampling status again.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Interface names are limited to `IFNAMSIZ` (16) including the null terminator.
const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Errors that can occur when validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("interface name too long (max 15 characters): {0}")]
    NameTooLong(String),

    #[error("interface name contains null byte: {0:?}")]
    InvalidName(String),

    #[error("interface name is empty")]
    EmptyName,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the status item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Interface to inspect (e.g., "en1").
    pub interface: String,
    /// Path to `ifconfig`.
    pub ifconfig_path: PathBuf,
    /// Path to the vendor helper.
    pub helper_path: PathBuf,
    /// `PATH` value passed to the helper.
    pub helper_search_path: String,
    /// Settings plist holding the last network name.
    pub settings_path: PathBuf,
    /// Delay between the helper exiting and the follow-up refresh.
    pub settle_delay: Duration,
    /// Named system sound played after a reconnect.
    pub sound_name: String,
    /// Refresh automatically when the interface's link or address changes.
    pub watch_link: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            ifconfig_path: PathBuf::from(DEFAULT_IFCONFIG_PATH),
            helper_path: PathBuf::from(DEFAULT_HELPER_PATH),
            helper_search_path: DEFAULT_HELPER_SEARCH_PATH.to_string(),
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            settle_delay: DEFAULT_SETTLE_DELAY,
            sound_name: DEFAULT_SOUND.to_string(),
            watch_link: true,
        }
    }
}

impl AppConfig {
    /// Check that the configuration can be used.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface name is empty, too long, or contains
    /// a null byte.
    pub fn validate(&self) -> Result<()> {
        validate_interface_name(&self.interface)
    }
}

/// Validate a network interface name.
///
/// # Errors
///
/// Returns an error if the name could not be passed to the kernel as an
/// interface name.
pub fn validate_interface_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConfigError::EmptyName);
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(ConfigError::NameTooLong(name.to_string()));
    }

    if name.contains('\0') {
        return Err(ConfigError::InvalidName(name.to_string()));
    }

    Ok(())
}
