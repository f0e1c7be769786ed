//! The reconnect flow: run the vendor helper off the main thread, let the
//! link settle, then hand a fresh snapshot back to the caller.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::status::{StatusSampler, StatusSnapshot};

/// Errors that can occur when launching the helper.
#[derive(Debug, Error)]
pub enum HelperError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for helper operations.
pub type Result<T> = std::result::Result<T, HelperError>;

/// Launches the helper that drives the adapter's association.
///
/// This trait abstracts the subprocess so the flow can be tested without a
/// real helper installed.
pub trait HelperLauncher: Send + Sync {
    /// Run the helper to completion.
    ///
    /// Returns the exit code, or `None` if it was killed by a signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the helper cannot be started.
    fn run(&self) -> Result<Option<i32>>;
}

/// The Realtek `RtWlanHelper` binary.
#[derive(Debug, Clone)]
pub struct VendorHelper {
    program: PathBuf,
    search_path: String,
}

impl VendorHelper {
    pub fn new(program: impl Into<PathBuf>, search_path: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            search_path: search_path.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.helper_path, &config.helper_search_path)
    }
}

impl HelperLauncher for VendorHelper {
    fn run(&self) -> Result<Option<i32>> {
        debug!(program = %self.program.display(), "launching wifi helper");

        // The helper gets PATH and nothing else from our environment.
        let status = Command::new(&self.program)
            .env_clear()
            .env("PATH", &self.search_path)
            .status()
            .map_err(|source| HelperError::Launch {
                program: self.program.clone(),
                source,
            })?;

        Ok(status.code())
    }
}

/// Callback invoked with the snapshot taken after a reconnect.
pub type SnapshotCallback = Arc<dyn Fn(StatusSnapshot) + Send + Sync>;

/// Runs the helper and samples status afterwards.
pub struct Reconnector {
    helper: Arc<dyn HelperLauncher>,
    sampler: Arc<StatusSampler>,
    settle_delay: Duration,
}

impl Reconnector {
    pub fn new(
        helper: Arc<dyn HelperLauncher>,
        sampler: Arc<StatusSampler>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            helper,
            sampler,
            settle_delay,
        }
    }

    /// Run the whole flow on the calling thread.
    ///
    /// Helper failures never stop the flow: the adapter may have associated
    /// anyway, so status is always sampled.
    pub fn run_blocking(&self) -> StatusSnapshot {
        match self.helper.run() {
            Ok(Some(0)) => info!("wifi helper finished"),
            Ok(Some(code)) => warn!(exit_code = code, "wifi helper exited with failure"),
            Ok(None) => warn!("wifi helper terminated by signal"),
            Err(e) => error!(error = %e, "failed to run wifi helper"),
        }

        thread::sleep(self.settle_delay);

        self.sampler.sample()
    }

    /// Run the flow on a new background thread.
    ///
    /// There is no cancellation and no guard against overlap; each call
    /// completes on its own and invokes `on_complete` from its worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self: &Arc<Self>, on_complete: SnapshotCallback) -> std::io::Result<JoinHandle<()>> {
        let reconnector = Arc::clone(self);

        thread::Builder::new()
            .name("wifi-reconnect".to_string())
            .spawn(move || {
                let snapshot = reconnector.run_blocking();
                on_complete(snapshot);
            })
    }

    /// Like [`spawn`](Self::spawn), but a failed spawn still reports.
    ///
    /// When no worker thread can be started the helper is skipped and
    /// `on_complete` receives a fresh sample on the calling thread.
    pub fn start(self: &Arc<Self>, on_complete: SnapshotCallback) -> Option<JoinHandle<()>> {
        self.start_with(on_complete, Self::spawn)
    }

    fn start_with<F>(
        self: &Arc<Self>,
        on_complete: SnapshotCallback,
        spawn: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(&Arc<Self>, SnapshotCallback) -> std::io::Result<JoinHandle<()>>,
    {
        match spawn(self, Arc::clone(&on_complete)) {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(error = %e, "failed to start reconnect thread, refreshing in place");
                on_complete(self.sampler.sample());
                None
            }
        }
    }
}
