//! NetworkManager backend.
//!
//! [`NmcliRadio`] implements [`Radio`] for a Linux host by shelling out to
//! `nmcli`. Rescans, association and hotspot activation run as child
//! processes that are polled with `try_wait`, so a supervisor tick never
//! waits on them. Short queries and profile edits (`device show`,
//! `device wifi list`, `connection add`) run to completion.
//!
//! Station and hotspot share one interface, and NetworkManager keeps a single
//! active connection per device: starting an association takes the hotspot
//! down, which [`Radio::access_point_active`] reports.
//!
//! # Requirements
//!
//! - NetworkManager must be installed and running
//! - The `nmcli` command must be available in PATH
//! - User must have permission to manage network connections

use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

use crate::connection;
use crate::credential::{AccessPointConfig, NetworkCredential};
use crate::error::RadioError;
use crate::radio::{Radio, ScanPoll, StationStatus};
use crate::scan::{Bssid, ObservedNetwork, Security, Sighting};

/// Connection profile name used for the soft access point.
pub const HOTSPOT_CONNECTION: &str = "wifi-supervisor-hotspot";

/// Fields requested from `nmcli device wifi list`.
const SCAN_FIELDS: &str = "SSID,BSSID,CHAN,SIGNAL,SECURITY";

/// Runs `nmcli` to completion and returns its stdout.
pub fn run(args: &[&str]) -> Result<String, RadioError> {
    let output = Command::new("nmcli").args(args).output()?;

    if !output.status.success() {
        // Extract error message from stderr (preferred) or stdout
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(RadioError::Nmcli(message));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Starts `nmcli` in the background.
fn spawn(args: &[&str]) -> Result<Child, RadioError> {
    debug!(?args, "spawning nmcli");
    Ok(Command::new("nmcli")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?)
}

/// Splits one line of terse (`-t`) output into fields.
///
/// Terse mode separates fields with `:` and escapes literal colons and
/// backslashes inside a value with `\`, as in BSSIDs (`AA\:BB\:...`).
pub fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Maps an nmcli SECURITY column ("WPA1 WPA2", "WPA2 802.1X", "") to a kind.
pub fn parse_security(value: &str) -> Security {
    let value = value.trim();
    if value.is_empty() || value == "--" {
        Security::Open
    } else if value.contains("802.1X") {
        Security::Enterprise
    } else if value.contains("WPA3") || value.contains("SAE") {
        Security::Wpa3
    } else if value.contains("WPA2") {
        Security::Wpa2
    } else if value.contains("WPA") {
        Security::Wpa
    } else if value.contains("WEP") {
        Security::Wep
    } else {
        Security::Wpa2
    }
}

/// Converts NetworkManager's 0-100 signal quality to an approximate dBm.
pub fn quality_to_dbm(quality: u8) -> i32 {
    i32::from(quality.min(100)) / 2 - 100
}

/// Parses `nmcli -t -f SSID,BSSID,CHAN,SIGNAL,SECURITY device wifi list`.
pub fn parse_wifi_list(stdout: &str) -> Vec<ObservedNetwork> {
    let mut networks = Vec::new();

    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let fields = split_terse(line);
        if fields.len() < 5 {
            debug!(line, "skipping malformed scan line");
            continue;
        }

        let Ok(bssid) = fields[1].parse::<Bssid>() else {
            debug!(line, "skipping scan line with bad BSSID");
            continue;
        };

        let ssid = if fields[0] == "--" { String::new() } else { fields[0].clone() };
        networks.push(ObservedNetwork {
            hidden: ssid.is_empty(),
            ssid,
            bssid,
            channel: fields[2].parse().unwrap_or(0),
            rssi: quality_to_dbm(fields[3].parse().unwrap_or(0)),
            // Security might contain colons, so join all remaining parts
            security: parse_security(&fields[4..].join(":")),
        });
    }

    networks
}

/// Maps `GENERAL.STATE` ("100 (connected)") to a station status.
pub fn parse_device_state(value: &str) -> StationStatus {
    let code: u32 = value
        .split_whitespace()
        .next()
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);
    match code {
        100 => StationStatus::Connected,
        120 => StationStatus::Failed,
        10 | 20 => StationStatus::NoNetwork,
        _ => StationStatus::Idle,
    }
}

/// Scans and returns the visible networks, blocking until nmcli is done.
///
/// # Command Executed
/// ```bash
/// nmcli -t -f SSID,BSSID,CHAN,SIGNAL,SECURITY device wifi list ifname <interface> --rescan yes
/// ```
pub fn scan_networks(interface: &str) -> Result<Vec<ObservedNetwork>> {
    let stdout = run(&[
        "-t", "-f", SCAN_FIELDS, "device", "wifi", "list", "ifname", interface, "--rescan", "yes",
    ])
    .with_context(|| format!("Failed to scan on {interface}"))?;
    Ok(parse_wifi_list(&stdout))
}

enum ScanJob {
    Idle,
    Running(Child),
    Failed,
}

/// [`Radio`] backed by NetworkManager on one WiFi interface.
pub struct NmcliRadio {
    interface: String,
    scan: ScanJob,
    results: Vec<ObservedNetwork>,
    association: Option<Child>,
    association_failed: bool,
    hotspot: Option<Child>,
}

impl NmcliRadio {
    pub fn new(interface: impl Into<String>) -> Self {
        NmcliRadio {
            interface: interface.into(),
            scan: ScanJob::Idle,
            results: Vec::new(),
            association: None,
            association_failed: false,
            hotspot: None,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    fn collect_results(&mut self) -> ScanPoll {
        let listed = run(&[
            "-t", "-f", SCAN_FIELDS, "device", "wifi", "list", "ifname", self.interface.as_str(),
            "--rescan", "no",
        ]);
        match listed {
            Ok(stdout) => {
                self.results = parse_wifi_list(&stdout);
                ScanPoll::Complete(self.results.len())
            }
            Err(err) => {
                warn!(%err, "failed to list scan results");
                self.scan = ScanJob::Failed;
                ScanPoll::Failed
            }
        }
    }

    fn abort_association(&mut self) {
        if let Some(mut child) = self.association.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn abort_hotspot(&mut self) {
        if let Some(mut child) = self.hotspot.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Creates a profile with manual addressing and brings it up.
    fn begin_static(
        &mut self,
        credential: &NetworkCredential,
        sighting: Option<&Sighting>,
    ) -> Result<Child, RadioError> {
        let ssid = credential.ssid.as_str();
        let Some(ip) = credential.static_ip else {
            return Err(RadioError::Parse(format!("'{ssid}' has no static address")));
        };

        // A stale profile with the same name would shadow the new settings.
        let _ = connection::delete_connection(ssid);

        let address = format!("{}/{}", ip.address, ip.prefix_len());
        let gateway = ip.gateway.to_string();
        let dns = ip.dns.map(|d| d.to_string());
        let mut args = vec![
            "connection", "add", "type", "wifi", "ifname", self.interface.as_str(), "con-name", ssid,
            "ssid", ssid, "ipv4.method", "manual", "ipv4.addresses", address.as_str(), "ipv4.gateway",
            gateway.as_str(),
        ];
        if let Some(dns) = &dns {
            args.extend(["ipv4.dns", dns.as_str()]);
        }
        if let Some(pass) = &credential.passphrase {
            args.extend(["wifi-sec.key-mgmt", "wpa-psk", "wifi-sec.psk", pass.as_str()]);
        }
        run(&args)?;

        let bssid = sighting.map(|s| s.bssid.to_string());
        let mut up = vec!["connection", "up", "id", ssid, "ifname", self.interface.as_str()];
        if let Some(bssid) = &bssid {
            up.extend(["ap", bssid.as_str()]);
        }
        spawn(&up)
    }
}

impl Radio for NmcliRadio {
    fn scan_start(&mut self) -> Result<(), RadioError> {
        if matches!(self.scan, ScanJob::Running(_)) {
            return Ok(());
        }
        match spawn(&["device", "wifi", "rescan", "ifname", self.interface.as_str()]) {
            Ok(child) => {
                self.scan = ScanJob::Running(child);
                Ok(())
            }
            Err(err) => {
                self.scan = ScanJob::Failed;
                Err(err)
            }
        }
    }

    fn scan_poll(&mut self) -> ScanPoll {
        let finished = match &mut self.scan {
            ScanJob::Running(child) => child.try_wait(),
            ScanJob::Idle | ScanJob::Failed => return ScanPoll::Failed,
        };

        match finished {
            Ok(None) => ScanPoll::Running,
            Ok(Some(status)) => {
                // Rescan fails while another scan is in progress; the cached
                // list is still fresh enough.
                if !status.success() {
                    debug!(%status, "rescan refused, using cached results");
                }
                self.scan = ScanJob::Idle;
                self.collect_results()
            }
            Err(err) => {
                warn!(%err, "failed to poll rescan");
                self.scan = ScanJob::Failed;
                ScanPoll::Failed
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
        sighting: Option<&Sighting>,
    ) -> Result<(), RadioError> {
        self.abort_association();
        self.association_failed = false;

        let child = if credential.uses_dhcp() {
            let ssid = credential.ssid.as_str();
            let bssid = sighting.map(|s| s.bssid.to_string());
            let mut args = vec!["device", "wifi", "connect", ssid];
            if let Some(pass) = &credential.passphrase {
                args.extend(["password", pass.as_str()]);
            }
            args.extend(["ifname", self.interface.as_str()]);
            if let Some(bssid) = &bssid {
                args.extend(["bssid", bssid.as_str()]);
            }
            spawn(&args)?
        } else {
            self.begin_static(credential, sighting)?
        };

        self.association = Some(child);
        Ok(())
    }

    fn station_status(&mut self) -> StationStatus {
        let exited = self
            .association
            .as_mut()
            .and_then(|child| child.try_wait().ok().flatten());
        if let Some(status) = exited {
            self.association = None;
            self.association_failed = !status.success();
        }

        match connection::status(&self.interface) {
            // The hotspot shares the interface; being "connected" to it is
            // not a station connection.
            Ok(current) if current.connection.as_deref() == Some(HOTSPOT_CONNECTION) => {
                StationStatus::Idle
            }
            Ok(current) => match parse_device_state(&current.state) {
                StationStatus::Connected => {
                    self.association_failed = false;
                    StationStatus::Connected
                }
                _ if self.association_failed => StationStatus::Failed,
                other => other,
            },
            Err(err) => {
                warn!(%err, interface = %self.interface, "failed to query device state");
                StationStatus::Idle
            }
        }
    }

    fn station_disconnect(&mut self) {
        self.abort_association();
        if let Err(err) = connection::disconnect(&self.interface) {
            debug!(%err, "disconnect");
        }
    }

    fn station_set_auto_reconnect(&mut self, enabled: bool) {
        let active = match connection::status(&self.interface) {
            Ok(current) => current.connection,
            Err(err) => {
                warn!(%err, "failed to query active connection");
                return;
            }
        };
        let Some(name) = active else {
            return;
        };
        let value = if enabled { "yes" } else { "no" };
        if let Err(err) = run(&["connection", "modify", "id", &name, "connection.autoconnect", value]) {
            warn!(%err, connection = %name, "failed to set autoconnect");
        }
    }

    fn access_point_begin(&mut self, config: &AccessPointConfig) -> Result<(), RadioError> {
        self.abort_hotspot();
        // Recreate the profile so that a changed SSID or address takes effect.
        let _ = connection::delete_connection(HOTSPOT_CONNECTION);

        let args = hotspot_profile_args(&self.interface, config);
        run(&args.iter().map(String::as_str).collect::<Vec<_>>())?;

        // Activation can take seconds; `access_point_active` polls it.
        self.hotspot = Some(spawn(&hotspot_up_args(&self.interface))?);
        Ok(())
    }

    fn access_point_end(&mut self) {
        self.abort_hotspot();
        if let Err(err) = run(&["connection", "down", "id", HOTSPOT_CONNECTION]) {
            warn!(%err, "failed to stop hotspot");
        }
    }

    fn access_point_active(&mut self) -> bool {
        let exited = match self.hotspot.as_mut().map(Child::try_wait) {
            None => None,
            Some(Ok(None)) => return true,
            Some(Ok(Some(status))) => Some(status),
            Some(Err(err)) => {
                warn!(%err, "failed to poll hotspot activation");
                self.hotspot = None;
                return false;
            }
        };
        if let Some(status) = exited {
            self.hotspot = None;
            if !status.success() {
                warn!(%status, "hotspot activation failed");
                return false;
            }
        }

        match connection::status(&self.interface) {
            Ok(current) => current.connection.as_deref() == Some(HOTSPOT_CONNECTION),
            Err(err) => {
                warn!(%err, interface = %self.interface, "failed to query device state");
                false
            }
        }
    }

    fn set_hostname(&mut self, hostname: &str) -> Result<(), RadioError> {
        run(&["general", "hostname", hostname]).map(|_| ())
    }

    fn power_down(&mut self) {
        self.abort_association();
        self.abort_hotspot();
        if let Err(err) = run(&["radio", "wifi", "off"]) {
            warn!(%err, "failed to turn radio off");
        }
    }

    fn power_up(&mut self) {
        if let Err(err) = run(&["radio", "wifi", "on"]) {
            warn!(%err, "failed to turn radio on");
        }
    }
}

impl Drop for NmcliRadio {
    fn drop(&mut self) {
        self.abort_association();
        self.abort_hotspot();
        if let ScanJob::Running(child) = &mut self.scan {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Arguments that (re)create the hotspot profile without activating it.
fn hotspot_profile_args(interface: &str, config: &AccessPointConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "connection", "add", "type", "wifi", "ifname", interface, "con-name",
        HOTSPOT_CONNECTION, "autoconnect", "no", "ssid", config.ssid.as_str(),
        "802-11-wireless.mode", "ap", "ipv4.method", "shared",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    if let Some(ip) = config.static_ip {
        args.push("ipv4.addresses".to_string());
        args.push(format!("{}/{}", ip.address, ip.prefix_len()));
    }
    if let Some(pass) = &config.passphrase {
        args.extend(
            ["wifi-sec.key-mgmt", "wpa-psk", "wifi-sec.psk", pass.as_str()]
                .into_iter()
                .map(String::from),
        );
    }
    args
}

fn hotspot_up_args(interface: &str) -> [&str; 6] {
    ["connection", "up", "id", HOTSPOT_CONNECTION, "ifname", interface]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticIp;

    #[test]
    fn hotspot_profile_is_created_inactive() {
        let ip = StaticIp::parse("192.168.4.1", "192.168.4.1", "255.255.255.0", None).unwrap();
        let config = AccessPointConfig::new("robodog", Some("changeme"), Some(ip)).unwrap();

        let args = hotspot_profile_args("wlan0", &config);
        assert_eq!(args[..2], ["connection", "add"]);
        assert!(!args.iter().any(|a| a == "up"));
        assert!(args.windows(2).any(|w| w == ["autoconnect", "no"]));
        assert!(args.windows(2).any(|w| w == ["ipv4.addresses", "192.168.4.1/24"]));
        assert!(args.windows(2).any(|w| w == ["wifi-sec.psk", "changeme"]));

        let open = AccessPointConfig::new("robodog", None, None).unwrap();
        let args = hotspot_profile_args("wlan0", &open);
        assert!(!args.iter().any(|a| a.starts_with("wifi-sec") || a == "ipv4.addresses"));

        assert_eq!(
            hotspot_up_args("wlan0"),
            ["connection", "up", "id", HOTSPOT_CONNECTION, "ifname", "wlan0"]
        );
    }

    #[test]
    fn split_terse_handles_escapes() {
        let fields = split_terse(r"Home:AA\:BB\:CC\:DD\:EE\:FF:6:72:WPA2");
        assert_eq!(fields, ["Home", "AA:BB:CC:DD:EE:FF", "6", "72", "WPA2"]);

        let fields = split_terse(r"back\\slash::");
        assert_eq!(fields, [r"back\slash", "", ""]);
    }

    #[test]
    fn parse_wifi_list_output() {
        let stdout = concat!(
            "Home:AA\\:BB\\:CC\\:DD\\:EE\\:01:6:90:WPA2\n",
            "Cafe:AA\\:BB\\:CC\\:DD\\:EE\\:02:11:40:\n",
            ":AA\\:BB\\:CC\\:DD\\:EE\\:03:1:20:WPA1 WPA2\n",
            "garbage\n",
        );
        let networks = parse_wifi_list(stdout);
        assert_eq!(networks.len(), 3);

        assert_eq!(networks[0].ssid, "Home");
        assert_eq!(networks[0].bssid.to_string(), "AA:BB:CC:DD:EE:01");
        assert_eq!(networks[0].channel, 6);
        assert_eq!(networks[0].rssi, -55);
        assert_eq!(networks[0].security, Security::Wpa2);

        assert_eq!(networks[1].security, Security::Open);
        assert_eq!(networks[1].rssi, -80);

        assert!(networks[2].hidden);
        assert!(networks[2].ssid.is_empty());
    }

    #[test]
    fn security_kinds() {
        assert_eq!(parse_security(""), Security::Open);
        assert_eq!(parse_security("--"), Security::Open);
        assert_eq!(parse_security("WEP"), Security::Wep);
        assert_eq!(parse_security("WPA1"), Security::Wpa);
        assert_eq!(parse_security("WPA1 WPA2"), Security::Wpa2);
        assert_eq!(parse_security("WPA2 WPA3"), Security::Wpa3);
        assert_eq!(parse_security("WPA2 802.1X"), Security::Enterprise);
    }

    #[test]
    fn quality_maps_to_dbm() {
        assert_eq!(quality_to_dbm(100), -50);
        assert_eq!(quality_to_dbm(0), -100);
        assert_eq!(quality_to_dbm(250), -50);
    }

    #[test]
    fn device_states() {
        assert_eq!(parse_device_state("100 (connected)"), StationStatus::Connected);
        assert_eq!(parse_device_state("30 (disconnected)"), StationStatus::Idle);
        assert_eq!(parse_device_state("70 (connecting (getting IP configuration))"), StationStatus::Idle);
        assert_eq!(parse_device_state("20 (unavailable)"), StationStatus::NoNetwork);
        assert_eq!(parse_device_state("120 (failed)"), StationStatus::Failed);
        assert_eq!(parse_device_state("unknown"), StationStatus::Idle);
    }
}
