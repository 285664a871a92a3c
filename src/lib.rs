//! WiFi connectivity supervisor.
//!
//! Keeps a device connected by trying a list of known networks (optionally
//! scanning first and going strongest first), falling back to hosting its own
//! access point when nothing works, and reporting every step as an event.
//!
//! The state machine in [`supervisor`] is radio-agnostic. It drives a
//! [`Radio`] backend through short, non-blocking calls from
//! [`Supervisor::tick`]. Two backends ship with the crate:
//!
//! - [`nmcli::NmcliRadio`] for Linux hosts running NetworkManager
//! - [`sim::SimRadio`], a scripted radio for tests and simulation
//!
//! # Modules
//!
//! - [`config`] - TOML configuration file
//! - [`connection`] - Interface connection status
//! - [`credential`] - Validated SSIDs, passphrases and addressing
//! - [`error`] - Error types for the library
//! - [`interface`] - WiFi interface discovery
//! - [`notifier`] - Event kinds and subscriber list
//! - [`registry`] - Known network list
//! - [`scan`] - Scan results, matching and ranking
//!
//! # Example Usage
//!
//! ```no_run
//! use wifi_supervisor::{NmcliRadio, Settings, Supervisor, SystemClock};
//!
//! let radio = NmcliRadio::new("wlan0");
//! let mut sup = Supervisor::new(radio, SystemClock::new(), Settings::default());
//! sup.add_network("Home", Some("password123"), None, false).expect("invalid network");
//! sup.subscribe(|kind, detail| println!("{kind}: {detail}"));
//!
//! loop {
//!     sup.tick();
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! ```

/// Millisecond clock abstraction with a manual clock for tests.
pub mod clock;

/// Configuration file loading and application to a supervisor.
pub mod config;

/// Connection status queries and display via nmcli.
pub mod connection;

pub mod credential;

/// Error module defining custom error types for the library.
/// Uses `thiserror` for ergonomic error handling.
pub mod error;

/// Interface module for WiFi adapter discovery.
/// Handles listing interfaces, detecting USB adapters, and interface resolution.
pub mod interface;

pub mod logging;

/// NetworkManager backend and nmcli output parsing.
pub mod nmcli;

pub mod notifier;

/// Radio capability trait.
pub mod radio;

pub mod registry;

/// Scan module for matching and ranking visible networks.
pub mod scan;

pub mod sim;

/// The connection state machine.
pub mod supervisor;

pub use clock::{Clock, ManualClock, SystemClock};

pub use credential::{AccessPointConfig, NetworkCredential, StaticIp};

// Re-export the error types for library users
pub use error::{RadioError, SupervisorError};

pub use nmcli::NmcliRadio;

pub use notifier::{Event, EventKind};

pub use radio::{Radio, ScanPoll, StationStatus};

pub use scan::{ObservedNetwork, Security};

pub use supervisor::{ApMode, Settings, State, Supervisor, SupervisorState};
