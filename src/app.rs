//! The menu bar status item.
//!
//! AppKit objects are main-thread only, so the controller lives in a
//! main-thread `thread_local!`. Menu selectors, link-change callbacks and
//! blocks posted to the main queue all reach it through [`with_controller`].

use std::cell::RefCell;
use std::ffi::CStr;
use std::sync::Arc;

use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::{AnyClass, AnyObject, ClassBuilder, Sel};
use objc2::{msg_send, sel};
use objc2_app_kit::{
    NSApplication, NSApplicationActivationPolicy, NSImage, NSMenu, NSMenuItem, NSSound,
    NSStatusBar, NSStatusItem,
};
use objc2_foundation::{MainThreadMarker, NSOperationQueue, NSString};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::link_watcher::{LinkCallback, LinkWatcher};
use crate::menu::{MenuAction, MenuEntry, StatusIcon, build_menu};
use crate::probe::SystemProbe;
use crate::reconnect::{Reconnector, SnapshotCallback, VendorHelper};
use crate::status::{DisplayedStatus, StatusSampler, StatusSnapshot};

/// `NSVariableStatusItemLength`.
const VARIABLE_LENGTH: f64 = -1.0;

/// Objective-C class that receives menu item actions.
const MENU_TARGET_CLASS: &CStr = c"RtWlanStatusMenuTarget";

/// Errors that can occur when starting the status item.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not running on main thread")]
    NotMainThread,

    #[error("failed to register menu target class")]
    ClassRegistration,

    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Result type for app operations.
pub type Result<T> = std::result::Result<T, AppError>;

thread_local! {
    static CONTROLLER: RefCell<Option<StatusBarController>> = const { RefCell::new(None) };
}

/// Run `f` against the installed controller, if any.
///
/// Re-entrant calls are dropped rather than panicking inside an Objective-C
/// callback.
fn with_controller(f: impl FnOnce(&mut StatusBarController)) {
    CONTROLLER.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => match slot.as_mut() {
            Some(controller) => f(controller),
            None => warn!("status controller not installed"),
        },
        Err(_) => warn!("status controller busy, dropping nested call"),
    });
}

unsafe extern "C" fn toggle_wifi_action(
    _this: *const AnyObject,
    _sel: Sel,
    _sender: *const AnyObject,
) {
    with_controller(StatusBarController::reconnect);
}

unsafe extern "C" fn refresh_status_action(
    _this: *const AnyObject,
    _sel: Sel,
    _sender: *const AnyObject,
) {
    with_controller(StatusBarController::refresh);
}

/// Look up (or register on first use) the menu target class.
fn menu_target_class() -> Result<&'static AnyClass> {
    if let Some(cls) = AnyClass::get(MENU_TARGET_CLASS) {
        return Ok(cls);
    }

    let superclass = AnyClass::get(c"NSObject").ok_or(AppError::ClassRegistration)?;
    let mut builder =
        ClassBuilder::new(MENU_TARGET_CLASS, superclass).ok_or(AppError::ClassRegistration)?;

    // SAFETY: both functions match the `- (void)action:(id)sender` shape
    unsafe {
        builder.add_method(
            sel!(toggleWifi:),
            toggle_wifi_action as unsafe extern "C" fn(*const AnyObject, Sel, *const AnyObject),
        );
        builder.add_method(
            sel!(refreshStatus:),
            refresh_status_action
                as unsafe extern "C" fn(*const AnyObject, Sel, *const AnyObject),
        );
    }

    Ok(builder.register())
}

/// Selector a menu action is wired to, and whether it goes to our target.
fn action_selector(action: MenuAction) -> (Sel, bool) {
    match action {
        MenuAction::ToggleWifi => (sel!(toggleWifi:), true),
        MenuAction::RefreshStatus => (sel!(refreshStatus:), true),
        // Nil-targeted, so it travels the responder chain to NSApp.
        MenuAction::Quit => (sel!(terminate:), false),
    }
}

/// Owns the status item and the snapshot it displays.
pub struct StatusBarController {
    mtm: MainThreadMarker,
    status_item: Retained<NSStatusItem>,
    menu_target: Retained<AnyObject>,
    displayed: DisplayedStatus,
    sampler: Arc<StatusSampler>,
    reconnector: Arc<Reconnector>,
    sound_name: String,
}

impl StatusBarController {
    fn new(
        mtm: MainThreadMarker,
        sampler: Arc<StatusSampler>,
        reconnector: Arc<Reconnector>,
        sound_name: String,
    ) -> Result<Self> {
        let class = menu_target_class()?;
        // SAFETY: the class derives from NSObject, so `new` returns a +1 instance
        let menu_target: Retained<AnyObject> = unsafe { msg_send![class, new] };

        let status_item = NSStatusBar::systemStatusBar().statusItemWithLength(VARIABLE_LENGTH);

        let controller = Self {
            mtm,
            status_item,
            menu_target,
            displayed: DisplayedStatus::new(),
            sampler,
            reconnector,
            sound_name,
        };

        controller.set_icon(StatusIcon::Disconnected);
        controller.set_menu();

        Ok(controller)
    }

    /// Sample now and show the result.
    fn refresh(&mut self) {
        let snapshot = self.sampler.sample();
        self.show(snapshot);
    }

    fn show(&mut self, snapshot: StatusSnapshot) {
        if self.displayed.apply(snapshot) {
            let current = self.displayed.current();
            info!(
                status = %current.summary(),
                sequence = current.sequence(),
                "wifi status updated"
            );
            self.set_icon(StatusIcon::for_snapshot(current));
            self.set_menu();
        }
    }

    /// Start a reconnect on a worker thread.
    fn reconnect(&mut self) {
        info!("reconnecting wifi");

        let on_complete: SnapshotCallback = Arc::new(post_reconnect_result);
        self.reconnector.start(on_complete);
    }

    /// Main-thread half of a reconnect.
    fn finish_reconnect(&mut self, snapshot: StatusSnapshot) {
        self.show(snapshot);
        self.play_sound();
    }

    fn play_sound(&self) {
        // SAFETY: soundNamed only looks up a named system sound
        let sound = unsafe { NSSound::soundNamed(&NSString::from_str(&self.sound_name)) };
        match sound {
            Some(sound) => {
                // SAFETY: playback is asynchronous and the sound retains itself while playing
                if !unsafe { sound.play() } {
                    debug!(sound = %self.sound_name, "sound did not start");
                }
            }
            None => warn!(sound = %self.sound_name, "system sound not found"),
        }
    }

    fn set_icon(&self, icon: StatusIcon) {
        let Some(button) = self.status_item.button(self.mtm) else {
            warn!("status item has no button");
            return;
        };

        // SAFETY: called on the main thread with a live button
        unsafe {
            let image = NSImage::imageWithSystemSymbolName_accessibilityDescription(
                &NSString::from_str(icon.symbol_name()),
                Some(&NSString::from_str(icon.accessibility_description())),
            );
            if image.is_none() {
                warn!(symbol = icon.symbol_name(), "symbol image unavailable");
            }
            button.setImage(image.as_deref());
        }
    }

    /// Rebuild the menu from the displayed snapshot.
    fn set_menu(&self) {
        let mtm = self.mtm;
        let menu = NSMenu::new(mtm);
        menu.setAutoenablesItems(false);

        for entry in build_menu(self.displayed.current()) {
            match entry {
                MenuEntry::Label(title) => {
                    let item = NSMenuItem::new(mtm);
                    // SAFETY: plain property setters on a fresh item
                    unsafe {
                        item.setTitle(&NSString::from_str(&title));
                        item.setEnabled(false);
                    }
                    menu.addItem(&item);
                }
                MenuEntry::Separator => menu.addItem(&NSMenuItem::separatorItem(mtm)),
                MenuEntry::Action { title, action } => {
                    let item = NSMenuItem::new(mtm);
                    let (selector, targeted) = action_selector(action);
                    // SAFETY: the target outlives the menu; it is owned by the controller
                    unsafe {
                        item.setTitle(&NSString::from_str(&title));
                        item.setKeyEquivalent(&NSString::from_str(action.key_equivalent()));
                        item.setAction(Some(selector));
                        if targeted {
                            let _: () = msg_send![&item, setTarget: &*self.menu_target];
                        }
                        item.setEnabled(true);
                    }
                    menu.addItem(&item);
                }
            }
        }

        self.status_item.setMenu(Some(&menu));
    }
}

/// Hand a reconnect snapshot to the main thread.
///
/// Called on the reconnect worker.
fn post_reconnect_result(snapshot: StatusSnapshot) {
    let block = RcBlock::new(move || {
        let snapshot = snapshot.clone();
        with_controller(move |controller| controller.finish_reconnect(snapshot));
    });

    // SAFETY: the main queue is thread-safe and copies the block
    unsafe {
        NSOperationQueue::mainQueue().addOperationWithBlock(&block);
    }
}

/// Start the status item and run the application until it quits.
///
/// # Errors
///
/// Returns an error if not called from the main thread, if the configuration
/// is invalid, or if the menu target cannot be registered.
pub fn run(config: &AppConfig) -> Result<()> {
    config.validate()?;

    let mtm = MainThreadMarker::new().ok_or(AppError::NotMainThread)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        interface = %config.interface,
        helper = %config.helper_path.display(),
        "starting rtwlan-status"
    );

    let app = NSApplication::sharedApplication(mtm);
    // Menu bar only: no Dock icon, no main menu.
    app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);

    let sampler = Arc::new(StatusSampler::new(Arc::new(SystemProbe::from_config(config))));
    let reconnector = Arc::new(Reconnector::new(
        Arc::new(VendorHelper::from_config(config)),
        Arc::clone(&sampler),
        config.settle_delay,
    ));

    let controller =
        StatusBarController::new(mtm, sampler, reconnector, config.sound_name.clone())?;
    CONTROLLER.with(|cell| *cell.borrow_mut() = Some(controller));
    with_controller(StatusBarController::refresh);

    // Kept alive for the life of the run loop below.
    let _watcher = if config.watch_link {
        let callback: LinkCallback = Arc::new(|event| {
            debug!(interface = %event.interface, keys = ?event.keys, "link changed, refreshing");
            with_controller(StatusBarController::refresh);
        });
        let mut watcher = LinkWatcher::new(&config.interface, callback);
        match watcher.start() {
            Ok(()) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "link watcher unavailable, refresh is manual only");
                None
            }
        }
    } else {
        None
    };

    info!("status item running");

    // SAFETY: on the main thread, after the shared application was created
    unsafe { app.run() };

    CONTROLLER.with(|cell| cell.borrow_mut().take());
    info!("status item stopped");
    Ok(())
}
