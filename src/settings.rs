//! Reading the Realtek utility's settings plist.
//!
//! The utility records the network it last associated with under the
//! `Last Network` key. The file may be XML or binary, so decoding goes
//! through CoreFoundation rather than a text parser.

use std::fs;
use std::path::{Path, PathBuf};

// Use re-exported core-foundation types from system-configuration to avoid version conflicts
use system_configuration::core_foundation::base::{CFType, TCFType};
use system_configuration::core_foundation::dictionary::CFDictionary;
use system_configuration::core_foundation::propertylist::{
    CFPropertyList, create_with_data, kCFPropertyListImmutable,
};
use system_configuration::core_foundation::string::CFString;
use thiserror::Error;
use tracing::trace;

/// Key the utility stores the last network name under.
pub const LAST_NETWORK_KEY: &str = "Last Network";

/// Errors that can occur when reading the settings plist.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("{0} is not a dictionary")]
    NotDictionary(PathBuf),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Read the last network name from the plist at `path`.
///
/// Returns `Ok(None)` when the plist is a dictionary but has no string under
/// [`LAST_NETWORK_KEY`].
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a property list, or
/// its top level is not a dictionary.
pub fn read_last_network(path: &Path) -> Result<Option<String>> {
    let data = fs::read(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (raw, _format) =
        create_with_data(data, kCFPropertyListImmutable).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: e.description().to_string(),
        })?;

    // SAFETY: create_with_data returned a +1 reference we now own
    let plist = unsafe { CFPropertyList::wrap_under_create_rule(raw) };

    let dict = plist
        .downcast_into::<CFDictionary>()
        .ok_or_else(|| SettingsError::NotDictionary(path.to_path_buf()))?;

    let key = CFString::from_static_string(LAST_NETWORK_KEY);
    let Some(value) = dict.find(key.as_CFTypeRef()) else {
        trace!(path = %path.display(), "settings have no last network");
        return Ok(None);
    };

    // SAFETY: values of a live dictionary are valid CF objects; get rule retains
    let value = unsafe { CFType::wrap_under_get_rule(*value) };

    Ok(value.downcast::<CFString>().map(|name| name.to_string()))
}
