//! Connectivity snapshots and the probe seam that produces them.
//!
//! A refresh never mutates shared fields. It samples a [`StatusProbe`] into an
//! immutable [`StatusSnapshot`] stamped with a sequence number, and the UI
//! decides through [`DisplayedStatus`] whether that snapshot supersedes what
//! is on screen.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

/// Network name shown when the settings plist has no usable value.
pub const UNKNOWN_NETWORK: &str = "Unknown";

/// Source of the raw facts a snapshot is built from.
///
/// The production implementation shells out to `ifconfig` and reads the
/// Realtek settings plist; tests substitute fixed values.
pub trait StatusProbe: Send + Sync {
    /// The interface's IPv4 address, if it has one.
    fn resolve_address(&self) -> Option<String>;

    /// The name of the network the adapter last associated with.
    fn resolve_last_network(&self) -> Option<String>;
}

/// The result of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    network_name: String,
    address: Option<String>,
    sequence: u64,
}

impl StatusSnapshot {
    /// Build a snapshot. A missing name reads as [`UNKNOWN_NETWORK`]; an empty
    /// address reads as disconnected.
    #[must_use]
    pub fn new(network_name: Option<String>, address: Option<String>, sequence: u64) -> Self {
        Self {
            network_name: network_name.unwrap_or_else(|| UNKNOWN_NETWORK.to_string()),
            address: address.filter(|addr| !addr.is_empty()),
            sequence,
        }
    }

    /// The state shown before the first refresh.
    #[must_use]
    pub fn initial() -> Self {
        Self::new(None, None, 0)
    }

    #[must_use]
    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Connected means the interface reported an address.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    /// One-line summary for the disabled header item.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.address {
            Some(address) => format!("Connected: {} ({address})", self.network_name),
            None => "Disconnected".to_string(),
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Samples a probe into sequenced snapshots.
///
/// Shared between the main thread and reconnect workers so that every
/// snapshot, wherever it was taken, is ordered against every other.
pub struct StatusSampler {
    probe: Arc<dyn StatusProbe>,
    next_sequence: AtomicU64,
}

impl StatusSampler {
    pub fn new(probe: Arc<dyn StatusProbe>) -> Self {
        Self {
            probe,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Take a fresh snapshot.
    pub fn sample(&self) -> StatusSnapshot {
        // Claim the sequence before probing; a later sample must never sort first.
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);

        let network_name = self.probe.resolve_last_network();
        let address = self.probe.resolve_address();

        let snapshot = StatusSnapshot::new(network_name, address, sequence);
        debug!(
            sequence = sequence,
            network = %snapshot.network_name(),
            address = snapshot.address().unwrap_or(""),
            connected = snapshot.is_connected(),
            "sampled wifi status"
        );
        snapshot
    }
}

/// The snapshot currently on screen.
#[derive(Debug, Default)]
pub struct DisplayedStatus {
    current: StatusSnapshot,
}

impl DisplayedStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current(&self) -> &StatusSnapshot {
        &self.current
    }

    /// Show `snapshot` unless something sampled later is already displayed.
    ///
    /// Returns whether the display changed hands.
    pub fn apply(&mut self, snapshot: StatusSnapshot) -> bool {
        if snapshot.sequence < self.current.sequence {
            trace!(
                stale = snapshot.sequence,
                shown = self.current.sequence,
                "dropping stale snapshot"
            );
            return false;
        }

        self.current = snapshot;
        true
    }
}
