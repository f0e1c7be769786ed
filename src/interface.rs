//! Interface address inspection.
//!
//! This module asks `ifconfig` for a single interface and pulls the IPv4
//! address out of its text output.

use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur when inspecting an interface.
#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for interface operations.
pub type Result<T> = std::result::Result<T, InterfaceError>;

/// Extract the address from `ifconfig` output.
///
/// Takes the first line whose trimmed form starts with `inet ` and returns
/// the token after it. `inet6` lines never match.
#[must_use]
pub fn parse_inet_address(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let line = line.trim();
        if !line.starts_with("inet ") {
            return None;
        }
        line.split_whitespace().nth(1).map(str::to_string)
    })
}

/// Runs `ifconfig <interface>` and parses the result.
#[derive(Debug, Clone)]
pub struct IfconfigInspector {
    program: PathBuf,
    interface: String,
}

impl IfconfigInspector {
    /// Create an inspector for `interface` using the `ifconfig` at `program`.
    pub fn new(program: impl Into<PathBuf>, interface: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            interface: interface.into(),
        }
    }

    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Query the interface's address.
    ///
    /// A non-zero exit (e.g. the adapter is unplugged and the interface is
    /// gone) is not an error: stdout is still parsed, and usually holds nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be launched.
    pub fn address(&self) -> Result<Option<String>> {
        let output = Command::new(&self.program)
            .arg(&self.interface)
            .output()
            .map_err(|source| InterfaceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                interface = %self.interface,
                status = %output.status,
                stderr = %stderr.trim(),
                "ifconfig exited unsuccessfully"
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let address = parse_inet_address(&stdout);
        trace!(interface = %self.interface, address = ?address, "parsed ifconfig output");

        Ok(address)
    }
}
