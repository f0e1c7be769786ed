//! CLI commands: login item installation and one-shot status.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::probe::SystemProbe;
use crate::reconnect::{Reconnector, VendorHelper};
use crate::status::{StatusSampler, StatusSnapshot};

/// launchd label for the login agent.
pub const AGENT_LABEL: &str = "io.github.rtwlan-status";

/// Errors that can occur during CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("HOME is not set")]
    NoHome,

    #[error("failed to get current executable path: {0}")]
    CurrentExe(std::io::Error),

    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write plist: {0}")]
    WritePlist(std::io::Error),

    #[error("failed to remove file: {0}")]
    RemoveFile(std::io::Error),

    #[error("launchctl command failed: {0}")]
    Launchctl(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Where the login agent plist lives for the user whose home is `home`.
#[must_use]
pub fn agent_plist_path(home: &Path) -> PathBuf {
    home.join("Library/LaunchAgents")
        .join(format!("{AGENT_LABEL}.plist"))
}

/// Where the agent's stdout and stderr go.
#[must_use]
pub fn agent_log_dir(home: &Path) -> PathBuf {
    home.join("Library/Logs/rtwlan-status")
}

fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .ok_or(CliError::NoHome)
}

fn create_dir(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|source| CliError::CreateDir {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "created directory");
    Ok(())
}

/// Install a LaunchAgent that starts the status item at login.
///
/// # Errors
///
/// Returns an error if `HOME` is unset, or if file or launchctl operations fail.
pub fn install() -> Result<()> {
    let home = home_dir()?;
    let plist_path = agent_plist_path(&home);
    let log_dir = agent_log_dir(&home);

    info!("installing rtwlan-status login agent");

    let current_exe = std::env::current_exe().map_err(CliError::CurrentExe)?;
    debug!(path = %current_exe.display(), "current executable");

    create_dir(&log_dir)?;
    if let Some(parent) = plist_path.parent() {
        create_dir(parent)?;
    }

    // Replace any previous registration so launchd picks up the new binary path.
    if plist_path.exists() {
        unload_quietly(&plist_path, unload_agent);
    }

    fs::write(&plist_path, generate_plist(&current_exe, &log_dir)).map_err(CliError::WritePlist)?;
    info!(path = %plist_path.display(), "created LaunchAgent plist");

    load_agent(&plist_path)?;

    info!("rtwlan-status login agent installed");
    println!("✓ Login agent installed and started");
    println!("  Binary: {}", current_exe.display());
    println!("  Plist:  {}", plist_path.display());
    println!("  Logs:   {}/", log_dir.display());

    Ok(())
}

/// Unload and remove the LaunchAgent.
///
/// # Errors
///
/// Returns an error if `HOME` is unset or the plist cannot be removed.
pub fn uninstall() -> Result<()> {
    let plist_path = agent_plist_path(&home_dir()?);

    info!("uninstalling rtwlan-status login agent");

    if plist_path.exists() {
        unload_quietly(&plist_path, unload_agent);
        fs::remove_file(&plist_path).map_err(CliError::RemoveFile)?;
        info!(path = %plist_path.display(), "removed LaunchAgent plist");
        println!("✓ Login agent uninstalled");
    } else {
        println!("Login agent is not installed");
    }

    Ok(())
}

/// Sample once and print the result.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn status(config: &AppConfig) -> Result<()> {
    config.validate()?;

    let sampler = StatusSampler::new(Arc::new(SystemProbe::from_config(config)));
    let snapshot = sampler.sample();

    println!("rtwlan-status:");
    println!();
    print_snapshot(config, &snapshot);

    let agent = home_dir()
        .map(|home| agent_plist_path(&home).exists())
        .unwrap_or(false);
    if agent && is_agent_loaded() {
        println!("  Login agent: ✓ Running");
    } else if agent {
        println!("  Login agent: ⚠ Installed, not running");
    } else {
        println!("  Login agent: ✗ Not installed");
    }

    Ok(())
}

/// Run the helper once, wait for the link to settle, and print the result.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn connect(config: &AppConfig) -> Result<()> {
    config.validate()?;

    let sampler = Arc::new(StatusSampler::new(Arc::new(SystemProbe::from_config(
        config,
    ))));
    let reconnector = Reconnector::new(
        Arc::new(VendorHelper::from_config(config)),
        sampler,
        config.settle_delay,
    );

    let snapshot = reconnector.run_blocking();
    print_snapshot(config, &snapshot);

    Ok(())
}

fn print_snapshot(config: &AppConfig, snapshot: &StatusSnapshot) {
    if snapshot.is_connected() {
        println!("  WiFi:        ✓ {}", snapshot.summary());
    } else {
        println!("  WiFi:        ✗ {}", snapshot.summary());
    }
    println!("  Network:     {}", snapshot.network_name());
    println!("  Interface:   {}", config.interface);
    println!("  Address:     {}", snapshot.address().unwrap_or("-"));
}

/// Escape text for inclusion in plist XML.
fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Generate the LaunchAgent plist content.
fn generate_plist(program: &Path, log_dir: &Path) -> String {
    let program = xml_escape(&program.display().to_string());
    let log_dir = xml_escape(&log_dir.display().to_string());

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{AGENT_LABEL}</string>

    <key>ProgramArguments</key>
    <array>
        <string>{program}</string>
        <string>run</string>
    </array>

    <key>RunAtLoad</key>
    <true/>

    <key>LimitLoadToSessionType</key>
    <string>Aqua</string>

    <key>ProcessType</key>
    <string>Interactive</string>

    <key>StandardOutPath</key>
    <string>{log_dir}/stdout.log</string>

    <key>StandardErrorPath</key>
    <string>{log_dir}/stderr.log</string>
</dict>
</plist>
"#
    )
}

fn load_agent(plist_path: &Path) -> Result<()> {
    debug!("loading agent with launchctl");

    let output = Command::new("launchctl")
        .arg("load")
        .arg("-w")
        .arg(plist_path)
        .output()
        .map_err(|e| CliError::Launchctl(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(stderr = %stderr, "launchctl load failed");
        return Err(CliError::Launchctl(stderr.to_string()));
    }

    debug!("agent loaded");
    Ok(())
}

fn unload_agent(plist_path: &Path) -> Result<()> {
    debug!("unloading agent with launchctl");

    let output = Command::new("launchctl")
        .arg("unload")
        .arg("-w")
        .arg(plist_path)
        .output()
        .map_err(|e| CliError::Launchctl(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // Not loaded is fine.
        warn!(stderr = %stderr, "launchctl unload failed");
    }

    Ok(())
}

/// Unload a registration that may not be loaded. Failure is only logged.
fn unload_quietly(plist_path: &Path, unload: fn(&Path) -> Result<()>) -> bool {
    match unload(plist_path) {
        Ok(()) => true,
        Err(e) => {
            debug!(path = %plist_path.display(), error = %e, "could not unload previous agent");
            false
        }
    }
}

fn is_agent_loaded() -> bool {
    Command::new("launchctl")
        .args(["list", AGENT_LABEL])
        .output()
        .is_ok_and(|o| o.status.success())
}
