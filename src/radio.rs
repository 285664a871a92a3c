//! Capability interface to the radio.
//!
//! The supervisor never talks 802.11 itself. Everything that touches the
//! hardware goes through [`Radio`], whose long-running operations are split
//! into a start call and a poll call so that a tick never blocks.

use crate::credential::{AccessPointConfig, NetworkCredential};
use crate::error::RadioError;
use crate::scan::{ObservedNetwork, Sighting};

/// Progress of an asynchronous scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPoll {
    Running,
    Failed,
    /// Scan finished with this many results available via
    /// [`Radio::scan_result`].
    Complete(usize),
}

/// Association state of the station interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    Connected,
    Idle,
    Failed,
    NoNetwork,
}

/// Network learned through WPS or SmartConfig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedNetwork {
    pub ssid: String,
    pub passphrase: Option<String>,
}

/// Progress of a provisioning handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionPoll {
    Running,
    Failed,
    Succeeded(ProvisionedNetwork),
}

pub trait Radio {
    /// Requests a scan. Calling it while a scan is in flight must not start
    /// a second one.
    fn scan_start(&mut self) -> Result<(), RadioError>;

    fn scan_poll(&mut self) -> ScanPoll;

    fn scan_result(&self, index: usize) -> Option<ObservedNetwork>;

    /// Releases the results of the last scan.
    fn scan_discard(&mut self);

    /// Starts associating with `credential`. `sighting` carries the channel
    /// and BSSID of the last scan when one is known.
    fn station_begin(
        &mut self,
        credential: &NetworkCredential,
        sighting: Option<&Sighting>,
    ) -> Result<(), RadioError>;

    fn station_status(&mut self) -> StationStatus;

    fn station_disconnect(&mut self);

    fn station_set_auto_reconnect(&mut self, enabled: bool);

    fn access_point_begin(&mut self, config: &AccessPointConfig) -> Result<(), RadioError>;

    fn access_point_end(&mut self);

    /// Whether the access point started by `access_point_begin` is still up.
    /// Backends that share one interface between station and access point
    /// report `false` once an association has replaced it.
    fn access_point_active(&mut self) -> bool;

    fn set_hostname(&mut self, _hostname: &str) -> Result<(), RadioError> {
        Ok(())
    }

    fn power_down(&mut self) {}

    fn power_up(&mut self) {}

    fn wps_begin(&mut self) -> Result<(), RadioError> {
        Err(RadioError::Unsupported("WPS"))
    }

    fn wps_poll(&mut self) -> ProvisionPoll {
        ProvisionPoll::Failed
    }

    fn smart_config_begin(&mut self) -> Result<(), RadioError> {
        Err(RadioError::Unsupported("SmartConfig"))
    }

    fn smart_config_poll(&mut self) -> ProvisionPoll {
        ProvisionPoll::Failed
    }
}
