//! Scripted in-memory radio for host-side simulation and tests.
//!
//! ```
//! use wifi_supervisor::clock::ManualClock;
//! use wifi_supervisor::scan::Security;
//! use wifi_supervisor::sim::{observed, SimRadio};
//! use wifi_supervisor::supervisor::{Settings, State, Supervisor};
//!
//! let radio = SimRadio::new()
//!     .with_network(observed("Home", Security::Wpa2, -50))
//!     .reachable("Home");
//! let mut sup = Supervisor::new(radio, ManualClock::new(0), Settings::default());
//! sup.add_network("Home", Some("secret"), None, false).unwrap();
//!
//! sup.tick(); // Idle -> StationStart
//! sup.tick(); // StationStart -> StationOngoing
//! sup.tick(); // StationOngoing -> StationSucceeded
//! assert_eq!(sup.state(), State::StationSucceeded);
//! ```

use std::collections::VecDeque;
use std::io;

use crate::credential::{AccessPointConfig, NetworkCredential};
use crate::error::RadioError;
use crate::radio::{ProvisionPoll, Radio, ScanPoll, StationStatus};
use crate::scan::{Bssid, ObservedNetwork, Security, Sighting};

/// A call received by [`SimRadio`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    ScanStart,
    StationBegin(String),
    StationDisconnect,
    AccessPointBegin(String),
    AccessPointEnd,
    SetHostname(String),
    PowerDown,
    PowerUp,
    WpsBegin,
    SmartConfigBegin,
}

/// Builds a scan record with a BSSID derived from the SSID and signal.
pub fn observed(ssid: &str, security: Security, rssi: i32) -> ObservedNetwork {
    let seed = ssid.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
    ObservedNetwork {
        ssid: ssid.to_string(),
        security,
        rssi,
        channel: 1 + seed % 11,
        bssid: Bssid([0x02, 0x00, 0x00, seed, 0x00, rssi.unsigned_abs() as u8]),
        hidden: false,
    }
}

#[derive(Debug)]
pub struct SimRadio {
    /// Networks reported by every completed scan.
    pub networks: Vec<ObservedNetwork>,
    /// Answers given to `scan_poll` before the scan completes.
    pub scan_script: VecDeque<ScanPoll>,
    /// SSIDs that accept an association.
    pub reachable: Vec<String>,
    /// Status polls an association takes before it reports `Connected`.
    pub connect_delay: u32,
    pub fail_access_point: bool,
    pub fail_hostname: bool,
    /// Station and access point share the interface, so an association
    /// takes the access point down.
    pub station_replaces_access_point: bool,
    pub supports_provisioning: bool,
    /// Answers given to `wps_poll`; `Running` once exhausted.
    pub wps_script: VecDeque<ProvisionPoll>,
    /// Answers given to `smart_config_poll`; `Running` once exhausted.
    pub smart_config_script: VecDeque<ProvisionPoll>,
    pub calls: Vec<RadioCall>,
    scanning: bool,
    results: Vec<ObservedNetwork>,
    pending: Option<(String, u32)>,
    connected_to: Option<String>,
    auto_reconnect: bool,
    access_point: Option<AccessPointConfig>,
    powered: bool,
}

impl Default for SimRadio {
    fn default() -> Self {
        SimRadio {
            networks: Vec::new(),
            scan_script: VecDeque::new(),
            reachable: Vec::new(),
            connect_delay: 0,
            fail_access_point: false,
            fail_hostname: false,
            station_replaces_access_point: false,
            supports_provisioning: true,
            wps_script: VecDeque::new(),
            smart_config_script: VecDeque::new(),
            calls: Vec::new(),
            scanning: false,
            results: Vec::new(),
            pending: None,
            connected_to: None,
            auto_reconnect: false,
            access_point: None,
            powered: true,
        }
    }
}

impl SimRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, network: ObservedNetwork) -> Self {
        self.networks.push(network);
        self
    }

    pub fn reachable(mut self, ssid: &str) -> Self {
        self.reachable.push(ssid.to_string());
        self
    }

    /// Simulates losing the link to the current network.
    pub fn drop_link(&mut self) {
        self.connected_to = None;
        self.pending = None;
    }

    pub fn connected_ssid(&self) -> Option<&str> {
        self.connected_to.as_deref()
    }

    pub fn access_point(&self) -> Option<&AccessPointConfig> {
        self.access_point.as_ref()
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// SSIDs of every association attempt, in order.
    pub fn attempts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RadioCall::StationBegin(ssid) => Some(ssid.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &RadioCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Radio for SimRadio {
    fn scan_start(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::ScanStart);
        self.scanning = true;
        Ok(())
    }

    fn scan_poll(&mut self) -> ScanPoll {
        if !self.scanning {
            return ScanPoll::Failed;
        }
        match self.scan_script.pop_front() {
            Some(ScanPoll::Failed) => {
                self.scanning = false;
                ScanPoll::Failed
            }
            Some(ScanPoll::Running) => ScanPoll::Running,
            Some(ScanPoll::Complete(_)) | None => {
                self.scanning = false;
                self.results = self.networks.clone();
                ScanPoll::Complete(self.results.len())
            }
        }
    }

    fn scan_result(&self, index: usize) -> Option<ObservedNetwork> {
        self.results.get(index).cloned()
    }

    fn scan_discard(&mut self) {
        self.results.clear();
    }

    fn station_begin(
        &mut self,
        credential: &NetworkCredential,
        _sighting: Option<&Sighting>,
    ) -> Result<(), RadioError> {
        let ssid = credential.ssid.to_string();
        self.calls.push(RadioCall::StationBegin(ssid.clone()));
        self.connected_to = None;
        if self.station_replaces_access_point {
            self.access_point = None;
        }
        self.pending = self
            .reachable
            .contains(&ssid)
            .then_some((ssid, self.connect_delay));
        Ok(())
    }

    fn station_status(&mut self) -> StationStatus {
        if let Some((ssid, remaining)) = self.pending.take() {
            if remaining == 0 {
                self.connected_to = Some(ssid);
            } else {
                self.pending = Some((ssid, remaining - 1));
            }
        }
        if self.connected_to.is_some() {
            StationStatus::Connected
        } else {
            StationStatus::Idle
        }
    }

    fn station_disconnect(&mut self) {
        self.calls.push(RadioCall::StationDisconnect);
        self.drop_link();
    }

    fn station_set_auto_reconnect(&mut self, enabled: bool) {
        self.auto_reconnect = enabled;
    }

    fn access_point_begin(&mut self, config: &AccessPointConfig) -> Result<(), RadioError> {
        self.calls
            .push(RadioCall::AccessPointBegin(config.ssid.to_string()));
        if self.fail_access_point {
            return Err(RadioError::Io(io::Error::other("simulated access point failure")));
        }
        self.access_point = Some(config.clone());
        Ok(())
    }

    fn access_point_end(&mut self) {
        self.calls.push(RadioCall::AccessPointEnd);
        self.access_point = None;
    }

    fn access_point_active(&mut self) -> bool {
        self.access_point.is_some()
    }

    fn set_hostname(&mut self, hostname: &str) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetHostname(hostname.to_string()));
        if self.fail_hostname {
            return Err(RadioError::Io(io::Error::other("simulated hostname failure")));
        }
        Ok(())
    }

    fn power_down(&mut self) {
        self.calls.push(RadioCall::PowerDown);
        self.powered = false;
    }

    fn power_up(&mut self) {
        self.calls.push(RadioCall::PowerUp);
        self.powered = true;
    }

    fn wps_begin(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::WpsBegin);
        if self.supports_provisioning {
            Ok(())
        } else {
            Err(RadioError::Unsupported("WPS"))
        }
    }

    fn wps_poll(&mut self) -> ProvisionPoll {
        self.wps_script.pop_front().unwrap_or(ProvisionPoll::Running)
    }

    fn smart_config_begin(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SmartConfigBegin);
        if self.supports_provisioning {
            Ok(())
        } else {
            Err(RadioError::Unsupported("SmartConfig"))
        }
    }

    fn smart_config_poll(&mut self) -> ProvisionPoll {
        self.smart_config_script
            .pop_front()
            .unwrap_or(ProvisionPoll::Running)
    }
}
