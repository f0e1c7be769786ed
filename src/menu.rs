//! The status item's menu and icon as plain data.
//!
//! The AppKit layer turns these into `NSMenuItem`s; keeping the layout here
//! lets it be tested without a window server.

use crate::status::StatusSnapshot;

/// What a selectable menu item does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Run the vendor helper, then refresh.
    ToggleWifi,
    /// Refresh status immediately.
    RefreshStatus,
    /// Terminate the application.
    Quit,
}

impl MenuAction {
    /// Keyboard shortcut shown next to the item.
    #[must_use]
    pub const fn key_equivalent(self) -> &'static str {
        match self {
            Self::ToggleWifi => "t",
            Self::RefreshStatus => "r",
            Self::Quit => "q",
        }
    }
}

/// A single row in the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    /// Disabled, informational text.
    Label(String),
    Separator,
    Action { title: String, action: MenuAction },
}

/// The two icons the status item can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Connected,
    Disconnected,
}

impl StatusIcon {
    #[must_use]
    pub const fn for_snapshot(snapshot: &StatusSnapshot) -> Self {
        if snapshot.is_connected() {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }

    /// SF Symbol name.
    #[must_use]
    pub const fn symbol_name(self) -> &'static str {
        match self {
            Self::Connected => "wifi",
            Self::Disconnected => "wifi.slash",
        }
    }

    #[must_use]
    pub const fn accessibility_description(self) -> &'static str {
        "WiFi"
    }
}

/// Title of the connect/reconnect item.
#[must_use]
pub const fn toggle_title(snapshot: &StatusSnapshot) -> &'static str {
    if snapshot.is_connected() {
        "Reconnect WiFi"
    } else {
        "Connect WiFi"
    }
}

/// Lay out the menu for `snapshot`.
#[must_use]
pub fn build_menu(snapshot: &StatusSnapshot) -> Vec<MenuEntry> {
    vec![
        MenuEntry::Label(snapshot.summary()),
        MenuEntry::Separator,
        MenuEntry::Action {
            title: toggle_title(snapshot).to_string(),
            action: MenuAction::ToggleWifi,
        },
        MenuEntry::Separator,
        MenuEntry::Action {
            title: "Refresh Status".to_string(),
            action: MenuAction::RefreshStatus,
        },
        MenuEntry::Action {
            title: "Quit".to_string(),
            action: MenuAction::Quit,
        },
    ]
}
