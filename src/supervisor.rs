//! Connection supervisor state machine.
//!
//! The host calls [`Supervisor::tick`] periodically. Each tick performs at
//! most one transition; anything that takes longer (scanning, association,
//! provisioning) is polled through the [`Radio`] on later ticks.
//!
//! ```text
//!        ┌──────────────────────────────────────────────┐
//!        v                                              │
//!      Idle ──> ScanStart ──> ScanOngoing ──> StationStart ──> StationOngoing
//!        │                        │               ^                  │
//!        │                        │ no match      │ next candidate   ├──> StationSucceeded ──> Idle
//!        │                        v               │                  v
//!        └──────────────────> Fallback <──── StationFailed <─────────┘
//!                                 │            (exhausted)
//!                                 └──> Idle
//! ```
//!
//! WPS and SmartConfig are separate branches entered only through
//! [`Supervisor::start_wps`] and [`Supervisor::start_smart_config`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{elapsed_ms, Clock};
use crate::credential::{AccessPointConfig, NetworkCredential, StaticIp};
use crate::error::SupervisorError;
use crate::notifier::{EventKind, Notifier};
use crate::radio::{ProvisionPoll, ProvisionedNetwork, Radio, ScanPoll, StationStatus};
use crate::registry::NetworkRegistry;
use crate::scan::{self, RankedOrder};

pub const DEFAULT_CONNECT_TIMEOUT_MS: u32 = 10_000;
pub const DEFAULT_RECONNECT_INTERVAL_MS: u32 = 60_000;
pub const DEFAULT_PROVISIONING_TIMEOUT_MS: u32 = 120_000;
pub const DEFAULT_HOSTNAME: &str = "wifi-supervisor";
/// Wait before starting the access point again after it failed to come up.
pub const ACCESS_POINT_RETRY_MS: u32 = 10_000;

/// When the soft access point is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApMode {
    /// Never host an access point.
    Off,
    /// Host one only while the station is not connected.
    #[default]
    Alone,
    /// Host one whether or not the station is connected.
    Both,
}

/// Tunables of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connect_timeout_ms: u32,
    /// Minimum time between a fallback (or explicit disconnect) and the next
    /// connection attempt. Zero disables retries after the first fallback.
    pub reconnect_interval_ms: u32,
    pub provisioning_timeout_ms: u32,
    /// Scan before connecting and try visible networks strongest first.
    pub scan: bool,
    pub ap_mode: ApMode,
    pub hostname: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            provisioning_timeout_ms: DEFAULT_PROVISIONING_TIMEOUT_MS,
            scan: false,
            ap_mode: ApMode::Alone,
            hostname: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    Idle,
    ScanStart,
    ScanOngoing,
    StationStart,
    StationOngoing,
    StationFailed,
    StationSucceeded,
    Fallback,
    WpsStart,
    WpsOngoing,
    WpsFailed,
    WpsSucceeded,
    SmartConfigStart,
    SmartConfigOngoing,
    SmartConfigFailed,
    SmartConfigSucceeded,
}

/// Control state owned by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorState {
    pub state: State,
    /// Registry index of the network being tried.
    pub candidate: Option<usize>,
    /// When the last fallback or explicit disconnect happened.
    pub last_fallback: Option<u32>,
    /// When the current association or provisioning attempt started.
    pub attempt_started: u32,
}

#[derive(Debug, Clone, Copy)]
enum Provisioning {
    Wps,
    SmartConfig,
}

impl Provisioning {
    fn ongoing(self) -> State {
        match self {
            Provisioning::Wps => State::WpsOngoing,
            Provisioning::SmartConfig => State::SmartConfigOngoing,
        }
    }

    fn failed(self) -> State {
        match self {
            Provisioning::Wps => State::WpsFailed,
            Provisioning::SmartConfig => State::SmartConfigFailed,
        }
    }

    fn succeeded(self) -> State {
        match self {
            Provisioning::Wps => State::WpsSucceeded,
            Provisioning::SmartConfig => State::SmartConfigSucceeded,
        }
    }

    fn start_event(self) -> EventKind {
        match self {
            Provisioning::Wps => EventKind::WpsStart,
            Provisioning::SmartConfig => EventKind::SmartConfigStart,
        }
    }

    fn success_event(self) -> EventKind {
        match self {
            Provisioning::Wps => EventKind::WpsSuccess,
            Provisioning::SmartConfig => EventKind::SmartConfigSuccess,
        }
    }

    fn failure_event(self) -> EventKind {
        match self {
            Provisioning::Wps => EventKind::WpsFailed,
            Provisioning::SmartConfig => EventKind::SmartConfigFailed,
        }
    }
}

pub struct Supervisor<R, C> {
    radio: R,
    clock: C,
    registry: NetworkRegistry,
    notifier: Notifier,
    settings: Settings,
    access_point: Option<AccessPointConfig>,
    hosting: bool,
    station_enabled: bool,
    radio_on: bool,
    reset_pending: bool,
    ranked: RankedOrder,
    provisioned: Option<ProvisionedNetwork>,
    last_ap_failure: Option<u32>,
    control: SupervisorState,
}

impl<R: Radio, C: Clock> Supervisor<R, C> {
    pub fn new(radio: R, clock: C, settings: Settings) -> Self {
        Supervisor {
            radio,
            clock,
            registry: NetworkRegistry::new(),
            notifier: Notifier::new(),
            settings,
            access_point: None,
            hosting: false,
            station_enabled: true,
            radio_on: true,
            reset_pending: false,
            ranked: RankedOrder::default(),
            provisioned: None,
            last_ap_failure: None,
            control: SupervisorState {
                state: State::Idle,
                candidate: None,
                last_fallback: None,
                attempt_started: 0,
            },
        }
    }

    // ---------------------------------------------------------------------
    // Registration

    /// Registers a network and returns its registry index.
    ///
    /// Invalid input is rejected without touching the registry. Inserting at
    /// the front shifts indices, so an attempt in progress is abandoned.
    pub fn add_network(
        &mut self,
        ssid: &str,
        passphrase: Option<&str>,
        static_ip: Option<StaticIp>,
        at_front: bool,
    ) -> Result<usize, SupervisorError> {
        let credential = NetworkCredential::new(ssid, passphrase, static_ip)?;
        if at_front {
            self.invalidate_attempt();
        }
        Ok(self.registry.register(credential, at_front))
    }

    pub fn remove_network(&mut self, id: usize) -> Result<NetworkCredential, SupervisorError> {
        let removed = self
            .registry
            .remove(id)
            .ok_or(SupervisorError::UnknownNetwork(id))?;
        self.invalidate_attempt();
        Ok(removed)
    }

    pub fn clear_networks(&mut self) {
        self.registry.clear();
        self.invalidate_attempt();
    }

    pub fn networks(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Configures the fallback access point. Takes effect the next time it
    /// is started.
    pub fn set_access_point(
        &mut self,
        ssid: &str,
        passphrase: Option<&str>,
        static_ip: Option<StaticIp>,
    ) -> Result<(), SupervisorError> {
        self.access_point = Some(AccessPointConfig::new(ssid, passphrase, static_ip)?);
        Ok(())
    }

    pub fn access_point(&self) -> Option<&AccessPointConfig> {
        self.access_point.as_ref()
    }

    // ---------------------------------------------------------------------
    // Tunables

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_connect_timeout(&mut self, ms: u32) {
        self.settings.connect_timeout_ms = ms;
    }

    pub fn set_reconnect_interval(&mut self, ms: u32) {
        self.settings.reconnect_interval_ms = ms;
    }

    pub fn set_provisioning_timeout(&mut self, ms: u32) {
        self.settings.provisioning_timeout_ms = ms;
    }

    pub fn set_scan(&mut self, scan: bool) {
        self.settings.scan = scan;
    }

    pub fn set_ap_mode(&mut self, mode: ApMode) {
        self.settings.ap_mode = mode;
    }

    pub fn hostname(&self) -> &str {
        self.settings.hostname.as_deref().unwrap_or(DEFAULT_HOSTNAME)
    }

    /// Records the hostname and pushes it to the radio. A radio failure is
    /// reported as [`EventKind::HostnameError`].
    pub fn set_hostname(&mut self, hostname: &str) {
        self.settings.hostname = Some(hostname.to_string());
        if let Err(err) = self.radio.set_hostname(hostname) {
            warn!(%hostname, %err, "failed to set hostname");
            self.notifier
                .publish(EventKind::HostnameError, &err.to_string());
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle

    /// Enables or disables station mode. Disabling drops the current
    /// association and abandons any attempt on the next tick.
    pub fn enable_station(&mut self, enable: bool) {
        self.station_enabled = enable;
        if !enable {
            self.radio.station_disconnect();
            self.reset_pending = true;
        }
    }

    /// Starts hosting the access point right away, or stops hosting it and
    /// disables the fallback.
    pub fn enable_access_point(&mut self, enable: bool) {
        if enable {
            if self.settings.ap_mode == ApMode::Off {
                self.settings.ap_mode = ApMode::Alone;
            }
            if self.radio_on && !self.hosting {
                self.start_access_point();
            }
        } else {
            self.settings.ap_mode = ApMode::Off;
            self.stop_access_point();
        }
    }

    /// Drops the station connection. The next attempt waits for the
    /// reconnect interval.
    pub fn disconnect(&mut self) {
        self.radio.station_disconnect();
        self.notifier.publish(EventKind::Disconnected, "");
        self.control.last_fallback = Some(self.clock.now_ms());
        self.reset_pending = true;
    }

    /// Restarts the reconnect interval from now.
    pub fn defer_reconnect(&mut self) {
        self.control.last_fallback = Some(self.clock.now_ms());
    }

    pub fn turn_radio_off(&mut self) {
        if !self.radio_on {
            return;
        }
        self.radio.station_disconnect();
        self.stop_access_point();
        self.radio.power_down();
        self.radio_on = false;
        self.reset_pending = true;
        self.notifier.publish(EventKind::RadioOff, "");
    }

    pub fn turn_radio_on(&mut self) {
        if self.radio_on {
            return;
        }
        self.radio.power_up();
        self.radio_on = true;
        self.notifier.publish(EventKind::RadioOn, "");
    }

    /// Abandons whatever is in progress and starts a WPS handshake on the
    /// next tick.
    pub fn start_wps(&mut self) {
        self.begin_provisioning(State::WpsStart);
    }

    /// Abandons whatever is in progress and starts SmartConfig on the next
    /// tick.
    pub fn start_smart_config(&mut self) {
        self.begin_provisioning(State::SmartConfigStart);
    }

    // ---------------------------------------------------------------------
    // Observation

    pub fn is_connected(&mut self) -> bool {
        self.current_status() == StationStatus::Connected
    }

    pub fn is_hosting_access_point(&self) -> bool {
        self.hosting
    }

    pub fn current_status(&mut self) -> StationStatus {
        if !self.radio_on {
            return StationStatus::Idle;
        }
        self.radio.station_status()
    }

    pub fn state(&self) -> State {
        self.control.state
    }

    pub fn supervisor_state(&self) -> &SupervisorState {
        &self.control
    }

    pub fn subscribe(&mut self, handler: impl FnMut(EventKind, &str) + 'static) {
        self.notifier.subscribe(handler);
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    // ---------------------------------------------------------------------
    // Driving

    /// Advances the state machine by at most one transition.
    pub fn tick(&mut self) {
        if self.reset_pending {
            self.reset_pending = false;
            self.control.candidate = None;
            self.enter(State::Idle);
            return;
        }

        let next = match self.control.state {
            State::Idle => self.on_idle(),
            State::ScanStart => self.on_scan_start(),
            State::ScanOngoing => self.on_scan_ongoing(),
            State::StationStart => self.on_station_start(),
            State::StationOngoing => self.on_station_ongoing(),
            State::StationFailed => self.on_station_failed(),
            State::StationSucceeded => self.on_station_succeeded(),
            State::Fallback => self.on_fallback(),
            State::WpsStart => self.on_provisioning_start(Provisioning::Wps),
            State::WpsOngoing => self.on_provisioning_ongoing(Provisioning::Wps),
            State::WpsFailed => self.on_provisioning_failed(Provisioning::Wps),
            State::WpsSucceeded => self.on_provisioning_succeeded(Provisioning::Wps),
            State::SmartConfigStart => self.on_provisioning_start(Provisioning::SmartConfig),
            State::SmartConfigOngoing => self.on_provisioning_ongoing(Provisioning::SmartConfig),
            State::SmartConfigFailed => self.on_provisioning_failed(Provisioning::SmartConfig),
            State::SmartConfigSucceeded => {
                self.on_provisioning_succeeded(Provisioning::SmartConfig)
            }
        };
        self.enter(next);
    }

    fn enter(&mut self, next: State) {
        if next != self.control.state {
            debug!(from = ?self.control.state, to = ?next, "state transition");
            self.control.state = next;
        }
    }

    /// True when no fallback was recorded yet or the reconnect interval has
    /// passed since the last one.
    fn retry_due(&self, now: u32) -> bool {
        match self.control.last_fallback {
            None => true,
            Some(at) => {
                self.settings.reconnect_interval_ms > 0
                    && elapsed_ms(now, at) > self.settings.reconnect_interval_ms
            }
        }
    }

    fn invalidate_attempt(&mut self) {
        self.ranked = RankedOrder::default();
        if self.control.state != State::Idle {
            self.reset_pending = true;
        }
    }

    fn begin_provisioning(&mut self, start: State) {
        self.reset_pending = false;
        self.control.candidate = None;
        self.enter(start);
    }

    fn candidate_ssid(&self) -> String {
        self.control
            .candidate
            .and_then(|id| self.registry.get(id))
            .map(|entry| entry.credential.ssid.to_string())
            .unwrap_or_default()
    }

    fn on_idle(&mut self) -> State {
        if !self.radio_on {
            return State::Idle;
        }

        let now = self.clock.now_ms();
        self.sync_hosting();
        let connected = self.radio.station_status() == StationStatus::Connected;

        if !connected && self.station_enabled && !self.registry.is_empty() && self.retry_due(now) {
            self.control.candidate = Some(0);
            return if self.settings.scan {
                State::ScanStart
            } else {
                State::StationStart
            };
        }

        let wants_ap = match self.settings.ap_mode {
            ApMode::Off => false,
            ApMode::Alone => !connected,
            ApMode::Both => true,
        };
        if wants_ap && !self.hosting && self.access_point_retry_due(now) {
            return State::Fallback;
        }

        State::Idle
    }

    fn on_scan_start(&mut self) -> State {
        if let Err(err) = self.radio.scan_start() {
            warn!(%err, "failed to start scan");
            self.notifier.publish(EventKind::ScanFailed, &err.to_string());
        }
        self.notifier.publish(EventKind::Scanning, "");
        State::ScanOngoing
    }

    fn on_scan_ongoing(&mut self) -> State {
        let count = match self.radio.scan_poll() {
            ScanPoll::Running => return State::ScanOngoing,
            ScanPoll::Failed => {
                self.notifier.publish(EventKind::ScanFailed, "");
                if let Err(err) = self.radio.scan_start() {
                    warn!(%err, "failed to restart scan");
                }
                return State::ScanOngoing;
            }
            ScanPoll::Complete(count) => count,
        };

        let observed: Vec<_> = (0..count)
            .filter_map(|i| self.radio.scan_result(i))
            .collect();
        self.radio.scan_discard();

        if observed.is_empty() {
            self.notifier.publish(EventKind::NoNetworks, "");
        }

        self.registry.mark_all_unseen();
        let matched = scan::populate(&mut self.registry, &observed, &mut self.notifier);
        if matched == 0 {
            info!(found = observed.len(), "no known network in range");
            self.notifier.publish(EventKind::NoKnownNetworks, "");
            return State::Fallback;
        }

        self.ranked = scan::rank(&mut self.registry);
        self.control.candidate = self.ranked.best();
        debug!(found = observed.len(), matched, "scan complete");
        State::StationStart
    }

    fn on_station_start(&mut self) -> State {
        let Some(entry) = self.control.candidate.and_then(|id| self.registry.get(id)) else {
            return State::Fallback;
        };

        let ssid = entry.credential.ssid.to_string();
        info!(%ssid, rssi = entry.rssi(), "connecting");
        self.notifier.publish(EventKind::Connecting, &ssid);

        if let Err(err) = self.radio.station_begin(&entry.credential, entry.sighting()) {
            // The attempt will run into the connect timeout.
            warn!(%ssid, %err, "failed to start association");
        }
        self.control.attempt_started = self.clock.now_ms();
        State::StationOngoing
    }

    fn on_station_ongoing(&mut self) -> State {
        let ssid = self.candidate_ssid();

        if self.radio.station_status() == StationStatus::Connected {
            self.radio.station_set_auto_reconnect(true);
            info!(%ssid, "connected");
            self.notifier.publish(EventKind::Connected, &ssid);
            return State::StationSucceeded;
        }

        let waited = elapsed_ms(self.clock.now_ms(), self.control.attempt_started);
        if waited > self.settings.connect_timeout_ms {
            warn!(%ssid, waited, "connect timeout");
            self.notifier.publish(EventKind::ConnectFailed, &ssid);
            return State::StationFailed;
        }

        self.notifier.publish(EventKind::ConnectWaiting, &ssid);
        State::StationOngoing
    }

    fn on_station_failed(&mut self) -> State {
        let next = match self.control.candidate {
            None => None,
            Some(id) if self.settings.scan => self.registry.get(id).and_then(|e| e.next()),
            Some(id) => Some(id + 1).filter(|n| *n < self.registry.len()),
        };

        self.control.candidate = next;
        match next {
            Some(_) => State::StationStart,
            None => {
                info!("every candidate failed");
                State::Fallback
            }
        }
    }

    fn on_station_succeeded(&mut self) -> State {
        if self.settings.ap_mode == ApMode::Alone {
            self.stop_access_point();
        }
        State::Idle
    }

    fn on_fallback(&mut self) -> State {
        self.sync_hosting();
        if !self.hosting && self.settings.ap_mode != ApMode::Off {
            self.start_access_point();
        }
        self.control.last_fallback = Some(self.clock.now_ms());
        State::Idle
    }

    fn access_point_retry_due(&self, now: u32) -> bool {
        self.last_ap_failure
            .is_none_or(|at| elapsed_ms(now, at) > ACCESS_POINT_RETRY_MS)
    }

    /// Notices an access point the radio dropped on its own.
    fn sync_hosting(&mut self) {
        if !self.hosting || self.radio.access_point_active() {
            return;
        }
        self.hosting = false;
        let ssid = self
            .access_point
            .as_ref()
            .map(|ap| ap.ssid.to_string())
            .unwrap_or_default();
        warn!(%ssid, "access point went down");
        self.notifier.publish(EventKind::AccessPointDestroyed, &ssid);
    }

    fn start_access_point(&mut self) {
        if self.access_point.is_none() {
            self.access_point = AccessPointConfig::from_hostname(self.hostname());
        }
        let Some(config) = self.access_point.as_ref() else {
            self.last_ap_failure = Some(self.clock.now_ms());
            self.notifier
                .publish(EventKind::AccessPointFailed, "no usable access point SSID");
            return;
        };

        let ssid = config.ssid.to_string();
        self.notifier.publish(EventKind::AccessPointCreating, &ssid);
        match self.radio.access_point_begin(config) {
            Ok(()) => {
                self.hosting = true;
                self.last_ap_failure = None;
                info!(%ssid, "access point up");
                self.notifier.publish(EventKind::AccessPointCreated, &ssid);
            }
            Err(err) => {
                warn!(%ssid, %err, "failed to start access point");
                self.last_ap_failure = Some(self.clock.now_ms());
                self.notifier
                    .publish(EventKind::AccessPointFailed, &err.to_string());
            }
        }
    }

    fn stop_access_point(&mut self) {
        if !self.hosting {
            return;
        }
        self.radio.access_point_end();
        self.hosting = false;
        let ssid = self
            .access_point
            .as_ref()
            .map(|ap| ap.ssid.to_string())
            .unwrap_or_default();
        info!(%ssid, "access point down");
        self.notifier.publish(EventKind::AccessPointDestroyed, &ssid);
    }

    fn on_provisioning_start(&mut self, method: Provisioning) -> State {
        self.notifier.publish(method.start_event(), "");
        self.provisioned = None;
        self.control.attempt_started = self.clock.now_ms();

        let started = match method {
            Provisioning::Wps => self.radio.wps_begin(),
            Provisioning::SmartConfig => self.radio.smart_config_begin(),
        };
        match started {
            Ok(()) => method.ongoing(),
            Err(err) => {
                warn!(?method, %err, "failed to start provisioning");
                method.failed()
            }
        }
    }

    fn on_provisioning_ongoing(&mut self, method: Provisioning) -> State {
        let poll = match method {
            Provisioning::Wps => self.radio.wps_poll(),
            Provisioning::SmartConfig => self.radio.smart_config_poll(),
        };
        match poll {
            ProvisionPoll::Running => {
                let waited = elapsed_ms(self.clock.now_ms(), self.control.attempt_started);
                if waited > self.settings.provisioning_timeout_ms {
                    warn!(?method, waited, "provisioning timeout");
                    method.failed()
                } else {
                    method.ongoing()
                }
            }
            ProvisionPoll::Failed => method.failed(),
            ProvisionPoll::Succeeded(network) => {
                self.provisioned = Some(network);
                method.succeeded()
            }
        }
    }

    fn on_provisioning_failed(&mut self, method: Provisioning) -> State {
        self.notifier.publish(method.failure_event(), "");
        State::Fallback
    }

    fn on_provisioning_succeeded(&mut self, method: Provisioning) -> State {
        let Some(network) = self.provisioned.take() else {
            return State::Idle;
        };

        match NetworkCredential::new(&network.ssid, network.passphrase.as_deref(), None) {
            Ok(credential) => {
                let ssid = credential.ssid.to_string();
                self.registry.register(credential, true);
                self.ranked = RankedOrder::default();
                info!(%ssid, ?method, "network provisioned");
                self.notifier.publish(method.success_event(), &ssid);
            }
            Err(err) => {
                warn!(?method, %err, "provisioned network rejected");
                self.notifier.publish(method.failure_event(), &err.to_string());
            }
        }
        State::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sim::SimRadio;

    fn supervisor() -> (Supervisor<SimRadio, ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000);
        let sup = Supervisor::new(SimRadio::new(), clock.clone(), Settings::default());
        (sup, clock)
    }

    #[test]
    fn settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.connect_timeout_ms, 10_000);
        assert_eq!(settings.reconnect_interval_ms, 60_000);
        assert!(!settings.scan);
        assert_eq!(settings.ap_mode, ApMode::Alone);
    }

    #[test]
    fn retry_due_tolerates_clock_wrap() {
        let (mut sup, clock) = supervisor();
        clock.set(u32::MAX - 100);
        sup.defer_reconnect();
        assert!(!sup.retry_due(u32::MAX));

        // 60 001 ms later, across the wrap.
        let later = (u32::MAX - 100).wrapping_add(60_001);
        assert!(sup.retry_due(later));
    }

    #[test]
    fn zero_reconnect_interval_disables_retries() {
        let (mut sup, clock) = supervisor();
        sup.set_reconnect_interval(0);
        assert!(sup.retry_due(clock.now_ms()));

        sup.defer_reconnect();
        clock.advance(10_000_000);
        assert!(!sup.retry_due(clock.now_ms()));
    }

    #[test]
    fn rejected_registration_leaves_registry_untouched() {
        let (mut sup, _) = supervisor();
        assert!(sup.add_network(&"x".repeat(32), None, None, false).is_err());
        assert!(sup.add_network("ok", Some(&"p".repeat(64)), None, true).is_err());
        assert!(sup.networks().is_empty());
        assert_eq!(sup.add_network(&"x".repeat(31), Some(&"p".repeat(63)), None, false), Ok(0));
    }

    #[test]
    fn remove_unknown_network_fails() {
        let (mut sup, _) = supervisor();
        assert_eq!(
            sup.remove_network(3).unwrap_err(),
            SupervisorError::UnknownNetwork(3)
        );
    }

    #[test]
    fn hostname_defaults_and_lazy_access_point() {
        let (mut sup, _) = supervisor();
        assert_eq!(sup.hostname(), DEFAULT_HOSTNAME);
        sup.set_hostname("robodog");
        assert!(sup.access_point().is_none());

        sup.tick(); // Idle -> Fallback, nothing registered
        sup.tick(); // Fallback -> Idle
        assert_eq!(sup.access_point().unwrap().ssid.as_str(), "robodog");
        assert!(sup.is_hosting_access_point());
    }

    #[test]
    fn vanished_candidate_falls_back() {
        let (mut sup, _) = supervisor();
        sup.add_network("Home", None, None, false).unwrap();
        sup.control.state = State::StationStart;
        sup.control.candidate = Some(5);

        sup.tick();
        assert_eq!(sup.state(), State::Fallback);
        assert!(sup.radio().attempts().is_empty());
    }
}
