//! rtwlan-status library.
//!
//! This crate provides a menu bar status item for Realtek WiFi adapters on
//! macOS: it reports connectivity by inspecting the adapter's interface and
//! reconnects by running the vendor helper.

pub mod config;
pub mod interface;
pub mod menu;
pub mod reconnect;
pub mod status;

#[cfg(target_os = "macos")]
pub mod app;
#[cfg(target_os = "macos")]
pub mod cli;
#[cfg(target_os = "macos")]
pub mod link_watcher;
#[cfg(target_os = "macos")]
pub mod probe;
#[cfg(target_os = "macos")]
pub mod settings;
