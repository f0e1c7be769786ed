//! rtwlan-status: a menu bar status item for Realtek USB WiFi adapters.
//!
//! Shows whether the adapter's interface has an address and offers a one
//! click reconnect through the vendor's `RtWlanHelper`.

use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "macos")]
use rtwlan_status::config::AppConfig;
#[cfg(target_os = "macos")]
use rtwlan_status::{app, cli};
#[cfg(target_os = "macos")]
use tracing::error;

/// CLI argument parser.
#[derive(Parser)]
#[command(name = "rtwlan-status")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Defaults to `run`.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by commands that touch the adapter.
#[derive(Args, Default)]
struct AdapterArgs {
    /// Interface the adapter registers (default: en1).
    #[arg(long)]
    interface: Option<String>,

    /// Path to the vendor helper.
    #[arg(long)]
    helper: Option<std::path::PathBuf>,

    /// Path to the Realtek utility's settings plist.
    #[arg(long)]
    settings: Option<std::path::PathBuf>,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Show the status item in the menu bar.
    Run {
        #[command(flatten)]
        adapter: AdapterArgs,

        /// Only refresh when asked, not on link changes.
        #[arg(long)]
        no_watch: bool,
    },

    /// Print the current WiFi status and exit.
    Status {
        #[command(flatten)]
        adapter: AdapterArgs,
    },

    /// Run the vendor helper once and print the resulting status.
    Connect {
        #[command(flatten)]
        adapter: AdapterArgs,
    },

    /// Start the status item at login.
    Install,

    /// Stop starting the status item at login.
    Uninstall,
}

#[cfg(target_os = "macos")]
impl AdapterArgs {
    fn into_config(self) -> AppConfig {
        let mut config = AppConfig::default();
        if let Some(interface) = self.interface {
            config.interface = interface;
        }
        if let Some(helper) = self.helper {
            config.helper_path = helper;
        }
        if let Some(settings) = self.settings {
            config.settings_path = settings;
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::TRACE.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    #[cfg(target_os = "macos")]
    let result: Result<(), Box<dyn std::error::Error>> = match cli.command.unwrap_or(
        Commands::Run {
            adapter: AdapterArgs::default(),
            no_watch: false,
        },
    ) {
        Commands::Run { adapter, no_watch } => {
            let config = AppConfig {
                watch_link: !no_watch,
                ..adapter.into_config()
            };
            app::run(&config).map_err(Into::into)
        }
        Commands::Status { adapter } => cli::status(&adapter.into_config()).map_err(Into::into),
        Commands::Connect { adapter } => cli::connect(&adapter.into_config()).map_err(Into::into),
        Commands::Install => cli::install().map_err(Into::into),
        Commands::Uninstall => cli::uninstall().map_err(Into::into),
    };

    #[cfg(not(target_os = "macos"))]
    {
        let _ = cli.command; // Silence unused warning
        eprintln!("rtwlan-status is only supported on macOS");
        std::process::exit(1);
    }

    #[cfg(target_os = "macos")]
    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(all(test, target_os = "macos"))]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::PathBuf;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["rtwlan-status"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "rtwlan-status",
            "run",
            "--interface",
            "en5",
            "--settings",
            "/tmp/wifi.plist",
            "--no-watch",
        ])
        .unwrap();

        let Some(Commands::Run { adapter, no_watch }) = cli.command else {
            panic!("expected run");
        };
        assert!(no_watch);

        let config = adapter.into_config();
        assert_eq!(config.interface, "en5");
        assert_eq!(config.settings_path, PathBuf::from("/tmp/wifi.plist"));
        assert_eq!(config.helper_path, AppConfig::default().helper_path);
    }
}
