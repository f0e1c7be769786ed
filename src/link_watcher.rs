//! Refresh triggers from `SCDynamicStore`.
//!
//! configd publishes per-interface link and IPv4 state under
//! `State:/Network/Interface/<name>/...`. Subscribing to those keys lets the
//! status item notice the adapter associating (or being unplugged) without
//! the user pressing "Refresh Status".

use std::sync::Arc;

// Use re-exported core-foundation types from system-configuration to avoid version conflicts
use system_configuration::core_foundation::array::CFArray;
use system_configuration::core_foundation::runloop::{
    CFRunLoop, CFRunLoopSource, kCFRunLoopCommonModes,
};
use system_configuration::core_foundation::string::CFString;
use system_configuration::dynamic_store::{
    SCDynamicStore, SCDynamicStoreBuilder, SCDynamicStoreCallBackContext,
};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors that can occur while setting up the watcher.
#[derive(Debug, Error)]
pub enum LinkWatchError {
    #[error("failed to create dynamic store")]
    StoreCreation,

    #[error("failed to subscribe to keys for {0}")]
    Subscribe(String),

    #[error("failed to create run loop source")]
    RunLoopSource,
}

/// Result type for link watcher operations.
pub type Result<T> = std::result::Result<T, LinkWatchError>;

/// Emitted when the watched interface's state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChanged {
    pub interface: String,
    /// The dynamic store keys that changed.
    pub keys: Vec<String>,
}

/// Callback type for link changes.
pub type LinkCallback = Arc<dyn Fn(LinkChanged) + Send + Sync>;

/// Dynamic store keys describing `interface`'s link and IPv4 state.
#[must_use]
pub fn watched_keys(interface: &str) -> [String; 2] {
    [
        format!("State:/Network/Interface/{interface}/Link"),
        format!("State:/Network/Interface/{interface}/IPv4"),
    ]
}

struct WatchContext {
    interface: String,
    callback: LinkCallback,
}

#[allow(clippy::needless_pass_by_value)] // Signature is dictated by system-configuration crate
fn on_store_change(
    _store: SCDynamicStore,
    changed_keys: CFArray<CFString>,
    context: &mut WatchContext,
) {
    let keys: Vec<String> = changed_keys.iter().map(|key| key.to_string()).collect();
    trace!(keys = ?keys, "dynamic store keys changed");

    if keys.is_empty() {
        return;
    }

    // One refresh per batch, however many keys moved.
    (context.callback)(LinkChanged {
        interface: context.interface.clone(),
        keys,
    });
}

/// Watches one interface and calls back on the run loop it was started on.
pub struct LinkWatcher {
    interface: String,
    callback: LinkCallback,
    /// Held so the subscription stays alive.
    session: Option<(SCDynamicStore, CFRunLoopSource)>,
}

impl LinkWatcher {
    pub fn new(interface: &str, callback: LinkCallback) -> Self {
        Self {
            interface: interface.to_string(),
            callback,
            session: None,
        }
    }

    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// Subscribe and attach to the current thread's run loop.
    ///
    /// Call this on the main thread so callbacks land there.
    ///
    /// # Errors
    ///
    /// Returns an error if the dynamic store cannot be created or subscribed.
    pub fn start(&mut self) -> Result<()> {
        if self.is_started() {
            debug!(interface = %self.interface, "link watcher already started");
            return Ok(());
        }

        let context = SCDynamicStoreCallBackContext {
            callout: on_store_change,
            info: WatchContext {
                interface: self.interface.clone(),
                callback: Arc::clone(&self.callback),
            },
        };

        let store = SCDynamicStoreBuilder::new("rtwlan-status-link-watcher")
            .callback_context(context)
            .build()
            .ok_or(LinkWatchError::StoreCreation)?;

        let keys: Vec<CFString> = watched_keys(&self.interface)
            .iter()
            .map(|key| CFString::new(key))
            .collect();
        let keys = CFArray::from_CFTypes(&keys);
        let patterns: CFArray<CFString> = CFArray::from_CFTypes(&[]);

        if !store.set_notification_keys(&keys, &patterns) {
            return Err(LinkWatchError::Subscribe(self.interface.clone()));
        }

        let source = store
            .create_run_loop_source()
            .ok_or(LinkWatchError::RunLoopSource)?;

        CFRunLoop::get_current().add_source(&source, unsafe { kCFRunLoopCommonModes });

        info!(interface = %self.interface, "watching interface link state");

        self.session = Some((store, source));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_watched_keys() {
        let keys = watched_keys("en1");
        assert_eq!(keys[0], "State:/Network/Interface/en1/Link");
        assert_eq!(keys[1], "State:/Network/Interface/en1/IPv4");
    }

    #[test]
    fn test_watcher_not_started_on_creation() {
        let callback: LinkCallback = Arc::new(|_| {});
        let watcher = LinkWatcher::new("en1", callback);

        assert_eq!(watcher.interface, "en1");
        assert!(!watcher.is_started());
    }

    fn recording_context() -> (WatchContext, Arc<Mutex<Vec<LinkChanged>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let callback: LinkCallback = Arc::new(move |event| {
            received_clone.lock().unwrap().push(event);
        });

        let context = WatchContext {
            interface: "en1".to_string(),
            callback,
        };
        (context, received)
    }

    #[test]
    fn test_store_change_invokes_callback_once_per_batch() {
        let (mut context, received) = recording_context();
        let store = SCDynamicStoreBuilder::new("rtwlan-status-test").build().unwrap();
        let keys = watched_keys("en1");
        let changed = CFArray::from_CFTypes(&[CFString::new(&keys[0]), CFString::new(&keys[1])]);

        on_store_change(store, changed, &mut context);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].interface, "en1");
        assert_eq!(received[0].keys, keys.to_vec());
    }

    #[test]
    fn test_empty_change_is_ignored() {
        let (mut context, received) = recording_context();
        let store = SCDynamicStoreBuilder::new("rtwlan-status-test").build().unwrap();
        let changed: CFArray<CFString> = CFArray::from_CFTypes(&[]);

        on_store_change(store, changed, &mut context);

        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            LinkWatchError::StoreCreation.to_string(),
            "failed to create dynamic store"
        );
        assert_eq!(
            LinkWatchError::Subscribe("en1".to_string()).to_string(),
            "failed to subscribe to keys for en1"
        );
    }
}
