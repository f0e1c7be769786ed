//! Integration tests for rtwlan-status.
//!
//! The status model is portable; the tests at the bottom touch the real
//! system and are macOS-specific.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtwlan_status::interface::parse_inet_address;
use rtwlan_status::menu::{MenuAction, MenuEntry, StatusIcon, build_menu, toggle_title};
use rtwlan_status::reconnect::{HelperLauncher, Reconnector, SnapshotCallback};
use rtwlan_status::status::{DisplayedStatus, StatusProbe, StatusSampler, StatusSnapshot};

/// Probe backed by canned `ifconfig` output, the way the real probe sees it.
struct CannedProbe {
    network: Option<String>,
    ifconfig_output: Mutex<String>,
}

impl CannedProbe {
    fn new(network: Option<&str>, ifconfig_output: &str) -> Self {
        Self {
            network: network.map(str::to_string),
            ifconfig_output: Mutex::new(ifconfig_output.to_string()),
        }
    }
}

impl StatusProbe for CannedProbe {
    fn resolve_address(&self) -> Option<String> {
        parse_inet_address(&self.ifconfig_output.lock().unwrap())
    }

    fn resolve_last_network(&self) -> Option<String> {
        self.network.clone()
    }
}

/// Helper that "associates" the adapter by changing what the probe reports.
struct AssociatingHelper {
    probe: Arc<CannedProbe>,
    runs: AtomicU32,
}

impl HelperLauncher for AssociatingHelper {
    fn run(&self) -> rtwlan_status::reconnect::Result<Option<i32>> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        *self.probe.ifconfig_output.lock().unwrap() =
            "\tinet 192.168.1.5 netmask 0xffffff00 broadcast 192.168.1.255\n".to_string();
        Ok(Some(0))
    }
}

fn labels(menu: &[MenuEntry]) -> Vec<String> {
    menu.iter()
        .filter_map(|entry| match entry {
            MenuEntry::Label(title) | MenuEntry::Action { title, .. } => Some(title.clone()),
            MenuEntry::Separator => None,
        })
        .collect()
}

/// No settings file and no `inet` line.
#[test]
fn test_scenario_disconnected() {
    let probe = Arc::new(CannedProbe::new(None, "en1: flags=8822<BROADCAST> mtu 1500\n"));
    let sampler = StatusSampler::new(probe);

    let snapshot = sampler.sample();
    assert_eq!(snapshot.network_name(), "Unknown");
    assert_eq!(snapshot.address(), None);
    assert!(!snapshot.is_connected());

    let menu = build_menu(&snapshot);
    assert_eq!(
        labels(&menu),
        vec!["Disconnected", "Connect WiFi", "Refresh Status", "Quit"]
    );
    assert_eq!(StatusIcon::for_snapshot(&snapshot), StatusIcon::Disconnected);
}

/// Settings name `HomeNet` and `ifconfig` reports an address.
#[test]
fn test_scenario_connected() {
    let probe = Arc::new(CannedProbe::new(
        Some("HomeNet"),
        "\tinet 192.168.1.5 netmask 0xffffff00\n",
    ));
    let sampler = StatusSampler::new(probe);

    let snapshot = sampler.sample();
    assert_eq!(snapshot.network_name(), "HomeNet");
    assert_eq!(snapshot.address(), Some("192.168.1.5"));
    assert!(snapshot.is_connected());

    let menu = build_menu(&snapshot);
    assert_eq!(
        labels(&menu),
        vec![
            "Connected: HomeNet (192.168.1.5)",
            "Reconnect WiFi",
            "Refresh Status",
            "Quit"
        ]
    );
    assert_eq!(StatusIcon::for_snapshot(&snapshot), StatusIcon::Connected);
}

/// The toggle label tracks connectivity for every output shape.
#[test]
fn test_toggle_label_tracks_address() {
    let outputs = [
        ("", false),
        ("\tinet6 ::1 prefixlen 128\n", false),
        ("\tinet 10.0.0.1 netmask 0xff000000\n", true),
        ("status: active\n  inet 172.16.4.2\n", true),
    ];

    for (output, connected) in outputs {
        let snapshot = StatusSnapshot::new(None, parse_inet_address(output), 1);
        assert_eq!(snapshot.is_connected(), connected, "output: {output:?}");
        let expected = if connected { "Reconnect WiFi" } else { "Connect WiFi" };
        assert_eq!(toggle_title(&snapshot), expected);
    }
}

/// The header is disabled text, the rest are actions in a fixed order.
#[test]
fn test_menu_actions_order() {
    let actions: Vec<MenuAction> = build_menu(&StatusSnapshot::initial())
        .into_iter()
        .filter_map(|entry| match entry {
            MenuEntry::Action { action, .. } => Some(action),
            _ => None,
        })
        .collect();

    assert_eq!(
        actions,
        vec![
            MenuAction::ToggleWifi,
            MenuAction::RefreshStatus,
            MenuAction::Quit
        ]
    );
}

/// A full reconnect: helper associates, status is sampled afterwards.
#[test]
fn test_reconnect_flow_picks_up_new_address() {
    let probe = Arc::new(CannedProbe::new(Some("HomeNet"), ""));
    let sampler = Arc::new(StatusSampler::new(Arc::clone(&probe) as Arc<dyn StatusProbe>));
    let helper = Arc::new(AssociatingHelper {
        probe: Arc::clone(&probe),
        runs: AtomicU32::new(0),
    });

    let mut displayed = DisplayedStatus::new();
    displayed.apply(sampler.sample());
    assert!(!displayed.current().is_connected());

    let reconnector = Arc::new(Reconnector::new(
        Arc::clone(&helper) as Arc<dyn HelperLauncher>,
        Arc::clone(&sampler),
        Duration::from_millis(10),
    ));

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_clone = Arc::clone(&results);
    let callback: SnapshotCallback = Arc::new(move |snapshot| {
        results_clone.lock().unwrap().push(snapshot);
    });

    reconnector.spawn(callback).unwrap().join().unwrap();

    let snapshot = results.lock().unwrap().pop().unwrap();
    assert!(displayed.apply(snapshot));
    assert_eq!(helper.runs.load(Ordering::SeqCst), 1);
    assert_eq!(
        displayed.current().summary(),
        "Connected: HomeNet (192.168.1.5)"
    );
}

/// Overlapping reconnects both finish; whatever order their results arrive
/// in, the display ends on the latest sample.
#[test]
fn test_overlapping_reconnects_settle_on_latest_sample() {
    let probe = Arc::new(CannedProbe::new(Some("HomeNet"), ""));
    let sampler = Arc::new(StatusSampler::new(Arc::clone(&probe) as Arc<dyn StatusProbe>));
    let helper = Arc::new(AssociatingHelper {
        probe: Arc::clone(&probe),
        runs: AtomicU32::new(0),
    });
    let reconnector = Arc::new(Reconnector::new(
        helper.clone(),
        sampler,
        Duration::ZERO,
    ));

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_clone = Arc::clone(&results);
    let callback: SnapshotCallback = Arc::new(move |snapshot| {
        results_clone.lock().unwrap().push(snapshot);
    });

    let first = reconnector.spawn(Arc::clone(&callback)).unwrap();
    let second = reconnector.spawn(callback).unwrap();
    first.join().unwrap();
    second.join().unwrap();

    assert_eq!(helper.runs.load(Ordering::SeqCst), 2);

    let mut results = results.lock().unwrap().clone();
    assert_eq!(results.len(), 2);
    let latest = results.iter().map(StatusSnapshot::sequence).max().unwrap();

    // Deliver newest first to simulate the main queue running them out of order.
    results.sort_by_key(|s| std::cmp::Reverse(s.sequence()));
    let mut displayed = DisplayedStatus::new();
    for snapshot in results {
        displayed.apply(snapshot);
    }
    assert_eq!(displayed.current().sequence(), latest);
}

#[cfg(target_os = "macos")]
mod macos {
    use std::io::Write;
    use std::path::Path;

    use rtwlan_status::config::AppConfig;
    use rtwlan_status::interface::IfconfigInspector;
    use rtwlan_status::probe::SystemProbe;
    use rtwlan_status::settings::read_last_network;
    use rtwlan_status::status::{StatusProbe, StatusSampler};

    /// `ifconfig` exists where the default configuration expects it.
    #[test]
    fn test_default_ifconfig_path_exists() {
        let config = AppConfig::default();
        assert!(config.ifconfig_path.exists());
    }

    /// The loopback interface always has an IPv4 address.
    #[test]
    fn test_inspect_loopback() {
        let inspector = IfconfigInspector::new("/sbin/ifconfig", "lo0");
        let address = inspector.address().unwrap();
        assert_eq!(address.as_deref(), Some("127.0.0.1"));
    }

    /// An interface that does not exist reads as disconnected, not an error.
    #[test]
    fn test_inspect_missing_interface() {
        let inspector = IfconfigInspector::new("/sbin/ifconfig", "rtwlan99");
        assert_eq!(inspector.address().unwrap(), None);
    }

    /// Settings and loopback together produce a connected snapshot.
    #[test]
    fn test_system_probe_against_loopback() {
        let mut settings = tempfile::NamedTempFile::new().unwrap();
        settings
            .write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>Last Network</key>
    <string>HomeNet</string>
</dict>
</plist>
"#,
            )
            .unwrap();

        let probe = SystemProbe::new(
            IfconfigInspector::new("/sbin/ifconfig", "lo0"),
            settings.path(),
        );
        assert_eq!(probe.resolve_last_network(), Some("HomeNet".to_string()));

        let snapshot = StatusSampler::new(std::sync::Arc::new(probe)).sample();
        assert_eq!(snapshot.summary(), "Connected: HomeNet (127.0.0.1)");
    }

    /// A missing settings file is an error for the reader and "Unknown" for the UI.
    #[test]
    fn test_missing_settings_reads_unknown() {
        let path = Path::new("/nonexistent/wifiUtility.plist");
        assert!(read_last_network(path).is_err());

        let probe = SystemProbe::new(IfconfigInspector::new("/sbin/ifconfig", "rtwlan99"), path);
        let snapshot = StatusSampler::new(std::sync::Arc::new(probe)).sample();
        assert_eq!(snapshot.network_name(), "Unknown");
        assert_eq!(snapshot.summary(), "Disconnected");
    }
}
