//! Scan results and candidate ranking.
//!
//! A completed scan is turned into knowledge about the registry in two steps:
//!
//! 1. [`populate`] matches every observed network against the known
//!    credentials and stores the strongest sighting on the matching entry.
//! 2. [`rank`] threads the visible entries into a singly-linked list,
//!    strongest first, using the `next` field of each registry row.
//!
//! The supervisor then walks that list one candidate per connection attempt.
//!
//! # Example
//!
//! ```
//! use wifi_supervisor::credential::NetworkCredential;
//! use wifi_supervisor::notifier::Notifier;
//! use wifi_supervisor::registry::NetworkRegistry;
//! use wifi_supervisor::scan::{populate, rank, Bssid, ObservedNetwork, Security};
//!
//! let mut registry = NetworkRegistry::new();
//! registry.register(NetworkCredential::new("Home", Some("secret"), None).unwrap(), false);
//!
//! let observed = [ObservedNetwork {
//!     ssid: "Home".into(),
//!     security: Security::Wpa2,
//!     rssi: -50,
//!     channel: 6,
//!     bssid: Bssid([0, 1, 2, 3, 4, 5]),
//!     hidden: false,
//! }];
//!
//! let mut notifier = Notifier::new();
//! assert_eq!(populate(&mut registry, &observed, &mut notifier), 1);
//! assert_eq!(rank(&mut registry).best(), Some(0));
//! ```

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::notifier::{EventKind, Notifier};
use crate::registry::{NetworkEntry, NetworkRegistry, NOT_VISIBLE};

/// Encryption advertised by an access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Security {
    Open,
    Wep,
    Wpa,
    Wpa2,
    Wpa3,
    Enterprise,
}

impl Security {
    pub fn is_secured(self) -> bool {
        self != Security::Open
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Security::Open => "OPEN",
            Security::Wep => "WEP",
            Security::Wpa => "WPA",
            Security::Wpa2 => "WPA2",
            Security::Wpa3 => "WPA3",
            Security::Enterprise => "EAP",
        };
        f.write_str(label)
    }
}

/// MAC address of an access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bssid(pub [u8; 6]);

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for Bssid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(|| format!("BSSID too short: {s}"))?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| format!("invalid BSSID: {s}"))?;
        }
        if parts.next().is_some() {
            return Err(format!("BSSID too long: {s}"));
        }
        Ok(Bssid(bytes))
    }
}

impl Serialize for Bssid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One record of a scan, as reported by the radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedNetwork {
    /// Empty for hidden networks.
    pub ssid: String,
    pub security: Security,
    /// Signal strength in dBm.
    pub rssi: i32,
    pub channel: u8,
    pub bssid: Bssid,
    pub hidden: bool,
}

/// What the last scan told us about a known network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sighting {
    pub rssi: i32,
    pub security: Security,
    pub channel: u8,
    pub bssid: Bssid,
}

impl From<&ObservedNetwork> for Sighting {
    fn from(network: &ObservedNetwork) -> Self {
        Sighting {
            rssi: network.rssi,
            security: network.security,
            channel: network.channel,
            bssid: network.bssid,
        }
    }
}

/// Whether `entry` may be used to join `network`.
///
/// SSIDs must be equal, and a credential with a passphrase only pairs with a
/// secured network while an open credential only pairs with an open one.
pub fn accepts(entry: &NetworkEntry, network: &ObservedNetwork) -> bool {
    entry.credential.ssid.as_str() == network.ssid
        && network.security.is_secured() != entry.credential.is_open()
}

/// Applies a scan to the registry and returns how many entries were matched.
///
/// Call [`NetworkRegistry::mark_all_unseen`] first so that networks which
/// disappeared stop being candidates. For each observed record the first
/// compatible entry that has no sighting yet, or only a weaker one, takes the
/// record; the strongest BSSID of a network therefore wins. Every record is
/// published as [`EventKind::FoundNetwork`].
pub fn populate(
    registry: &mut NetworkRegistry,
    observed: &[ObservedNetwork],
    notifier: &mut Notifier,
) -> usize {
    let mut matched = vec![false; registry.len()];

    for network in observed {
        let mut known = false;

        for (id, entry) in registry.entries_mut().iter_mut().enumerate() {
            if !accepts(entry, network) {
                continue;
            }
            known = true;

            let stronger = entry
                .sighting
                .as_ref()
                .is_none_or(|seen| network.rssi > seen.rssi);
            if stronger {
                let mut sighting = Sighting::from(network);
                // 0 is reserved for "not visible".
                if sighting.rssi == NOT_VISIBLE {
                    sighting.rssi = -1;
                }
                entry.sighting = Some(sighting);
                matched[id] = true;
                break;
            }
        }

        notifier.publish(EventKind::FoundNetwork, &describe(network, known));
    }

    matched.into_iter().filter(|m| *m).count()
}

/// Head of the ranked visitation order. The rest of the order lives in the
/// `next` links of the registry rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RankedOrder {
    best: Option<usize>,
}

impl RankedOrder {
    /// Index of the strongest visible entry, `None` when nothing is visible.
    pub fn best(&self) -> Option<usize> {
        self.best
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_none()
    }

    /// Walks the order from the best entry to the weakest.
    pub fn iter<'a>(&self, registry: &'a NetworkRegistry) -> RankedIter<'a> {
        RankedIter {
            registry,
            current: self.best,
        }
    }
}

pub struct RankedIter<'a> {
    registry: &'a NetworkRegistry,
    current: Option<usize>,
}

impl Iterator for RankedIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let id = self.current?;
        self.current = self.registry.get(id).and_then(|e| e.next());
        Some(id)
    }
}

/// Links every visible entry into a list sorted by descending RSSI.
///
/// Entries are inserted in registry order and only a strictly stronger signal
/// displaces an existing member, so equal signals keep first-seen order.
pub fn rank(registry: &mut NetworkRegistry) -> RankedOrder {
    let entries = registry.entries_mut();
    for entry in entries.iter_mut() {
        entry.next = None;
    }

    let mut best: Option<usize> = None;

    for id in 0..entries.len() {
        let Some(rssi) = entries[id].sighting.map(|s| s.rssi) else {
            continue;
        };

        let Some(head) = best else {
            best = Some(id);
            continue;
        };

        if rssi > entries[head].rssi() {
            entries[id].next = Some(head);
            best = Some(id);
            continue;
        }

        let mut current = head;
        loop {
            match entries[current].next {
                Some(next) if rssi > entries[next].rssi() => {
                    entries[id].next = Some(next);
                    entries[current].next = Some(id);
                    break;
                }
                Some(next) => current = next,
                None => {
                    entries[current].next = Some(id);
                    break;
                }
            }
        }
    }

    RankedOrder { best }
}

/// One-line summary of a scan record, marked `-->` when it is a known network.
pub fn describe(network: &ObservedNetwork, known: bool) -> String {
    format!(
        "{} BSSID:{} CH:{:>2} RSSI:{:>4} SEC:{:<4} SSID:{}",
        if known { "-->" } else { "   " },
        network.bssid,
        network.channel,
        network.rssi,
        network.security,
        if network.hidden { "(hidden)" } else { &network.ssid },
    )
}

/// Displays scan results as a table, strongest first.
///
/// `is_known` marks networks that have a stored credential.
///
/// # Output Format
/// ```text
///    SSID                             RSSI       CH SEC  BSSID
/// ---------------------------------------------------------------------------
/// -> MyHomeNetwork                     -48 ████   6 WPA2 AA:BB:CC:DD:EE:FF
///    OpenCafe                          -81 █░░░  11 OPEN 11:22:33:44:55:66
/// ```
pub fn display_networks(networks: &[ObservedNetwork], is_known: impl Fn(&ObservedNetwork) -> bool) {
    if networks.is_empty() {
        println!("No networks found.");
        return;
    }

    let mut sorted: Vec<&ObservedNetwork> = networks.iter().collect();
    sorted.sort_by(|a, b| b.rssi.cmp(&a.rssi));

    println!("   {:<32} {:>4}      {:>3} {:<4} {}", "SSID", "RSSI", "CH", "SEC", "BSSID");
    println!("{}", "-".repeat(75));

    for network in sorted {
        println!(
            "{} {:<32} {:>4} {} {:>3} {:<4} {}",
            if is_known(network) { "->" } else { "  " },
            truncate_ssid(&network.ssid, 32),
            network.rssi,
            signal_to_bar(network.rssi),
            network.channel,
            network.security,
            network.bssid,
        );
    }
}

/// Truncates an SSID to fit a column, appending "..." when cut.
fn truncate_ssid(ssid: &str, max_len: usize) -> String {
    if ssid.len() <= max_len {
        return ssid.to_string();
    }
    let mut end = max_len - 3;
    while !ssid.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &ssid[..end])
}

/// Four-segment signal indicator for a dBm value.
fn signal_to_bar(rssi: i32) -> &'static str {
    if rssi >= -55 {
        "████"
    } else if rssi >= -65 {
        "███░"
    } else if rssi >= -75 {
        "██░░"
    } else if rssi >= -85 {
        "█░░░"
    } else {
        "░░░░"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::NetworkCredential;

    fn observed(ssid: &str, security: Security, rssi: i32) -> ObservedNetwork {
        ObservedNetwork {
            ssid: ssid.to_string(),
            security,
            rssi,
            channel: 1,
            bssid: Bssid([0, 0, 0, 0, 0, rssi.unsigned_abs() as u8]),
            hidden: false,
        }
    }

    fn registry(creds: &[(&str, Option<&str>)]) -> NetworkRegistry {
        let mut reg = NetworkRegistry::new();
        for (ssid, pass) in creds {
            reg.register(NetworkCredential::new(ssid, *pass, None).unwrap(), false);
        }
        reg
    }

    fn with_rssi(values: &[i32]) -> NetworkRegistry {
        let mut reg = NetworkRegistry::new();
        let mut scan = Vec::new();
        for (i, rssi) in values.iter().enumerate() {
            let ssid = format!("net{i}");
            reg.register(NetworkCredential::new(&ssid, Some("password"), None).unwrap(), false);
            if *rssi != NOT_VISIBLE {
                scan.push(observed(&ssid, Security::Wpa2, *rssi));
            }
        }
        populate(&mut reg, &scan, &mut Notifier::new());
        reg
    }

    #[test]
    fn secured_credential_ignores_open_network() {
        let mut reg = registry(&[("cafe", Some("secret"))]);
        let n = populate(&mut reg, &[observed("cafe", Security::Open, -40)], &mut Notifier::new());
        assert_eq!(n, 0);
        assert!(!reg.get(0).unwrap().scanned());
    }

    #[test]
    fn open_credential_ignores_secured_network() {
        let mut reg = registry(&[("cafe", None)]);
        let n = populate(&mut reg, &[observed("cafe", Security::Wpa2, -40)], &mut Notifier::new());
        assert_eq!(n, 0);

        let n = populate(&mut reg, &[observed("cafe", Security::Open, -40)], &mut Notifier::new());
        assert_eq!(n, 1);
    }

    #[test]
    fn empty_scan_matches_nothing() {
        let mut reg = with_rssi(&[-40, -60]);
        reg.mark_all_unseen();
        assert_eq!(populate(&mut reg, &[], &mut Notifier::new()), 0);
        assert!(reg.iter().all(|e| e.rssi() == NOT_VISIBLE && !e.scanned()));
    }

    #[test]
    fn strongest_bssid_wins() {
        let mut reg = registry(&[("home", Some("secret"))]);
        let scan = [
            observed("home", Security::Wpa2, -70),
            observed("home", Security::Wpa2, -45),
            observed("home", Security::Wpa2, -60),
        ];
        assert_eq!(populate(&mut reg, &scan, &mut Notifier::new()), 1);

        let sighting = reg.get(0).unwrap().sighting().unwrap();
        assert_eq!(sighting.rssi, -45);
        assert_eq!(sighting.bssid, scan[1].bssid);
    }

    #[test]
    fn duplicate_rows_take_distinct_bssids() {
        let mut reg = registry(&[("home", Some("first")), ("home", Some("second"))]);
        let scan = [
            observed("home", Security::Wpa2, -50),
            observed("home", Security::Wpa2, -65),
        ];
        assert_eq!(populate(&mut reg, &scan, &mut Notifier::new()), 2);
        assert_eq!(reg.get(0).unwrap().rssi(), -50);
        assert_eq!(reg.get(1).unwrap().rssi(), -65);
    }

    #[test]
    fn every_record_is_reported_once() {
        let mut reg = registry(&[("home", Some("secret"))]);
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut notifier = Notifier::new();
        let sink = seen.clone();
        notifier.subscribe(move |kind, detail| sink.borrow_mut().push((kind, detail.to_string())));

        let scan = [
            observed("home", Security::Wpa2, -50),
            observed("other", Security::Open, -30),
        ];
        populate(&mut reg, &scan, &mut notifier);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|(k, _)| *k == EventKind::FoundNetwork));
        assert!(seen[0].1.starts_with("-->"));
        assert!(seen[0].1.contains("SSID:home"));
        assert!(seen[1].1.starts_with("   "));
    }

    #[test]
    fn zero_rssi_record_stays_visible() {
        let mut reg = registry(&[("home", Some("secret")), ("cafe", Some("secret"))]);
        let scan = [
            observed("home", Security::Wpa2, 0),
            observed("cafe", Security::Wpa2, -60),
        ];
        assert_eq!(populate(&mut reg, &scan, &mut Notifier::new()), 2);

        let home = reg.get(0).unwrap();
        assert!(home.scanned());
        assert_eq!(home.rssi(), -1);

        let order = rank(&mut reg);
        assert_eq!(order.iter(&reg).collect::<Vec<_>>(), [0, 1]);
    }

    #[test]
    fn rank_orders_by_descending_rssi() {
        let mut reg = with_rssi(&[-70, -40, -90, -55]);
        let order = rank(&mut reg);
        assert_eq!(order.iter(&reg).collect::<Vec<_>>(), [1, 3, 0, 2]);
    }

    #[test]
    fn rank_ties_keep_first_seen_order() {
        let mut reg = with_rssi(&[-40, -70, -40]);
        let order = rank(&mut reg);
        assert_eq!(order.best(), Some(0));

        let visited: Vec<_> = order.iter(&reg).collect();
        assert_eq!(visited, [0, 2, 1]);
        for pair in visited.windows(2) {
            assert!(reg.get(pair[0]).unwrap().rssi() >= reg.get(pair[1]).unwrap().rssi());
        }
    }

    #[test]
    fn rank_skips_invisible_entries() {
        let mut reg = with_rssi(&[NOT_VISIBLE, -60, NOT_VISIBLE, -50]);
        let order = rank(&mut reg);
        assert_eq!(order.iter(&reg).collect::<Vec<_>>(), [3, 1]);
        assert!(reg.get(0).unwrap().next().is_none());
    }

    #[test]
    fn rank_of_invisible_registry_is_empty() {
        let mut reg = registry(&[("a", Some("password")), ("b", None)]);
        let order = rank(&mut reg);
        assert!(order.is_empty());
        assert_eq!(order.iter(&reg).count(), 0);
    }

    #[test]
    fn bssid_parse_and_display() {
        let bssid: Bssid = "aa:bb:cc:00:11:22".parse().unwrap();
        assert_eq!(bssid.0, [0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]);
        assert_eq!(bssid.to_string(), "AA:BB:CC:00:11:22");
        assert!("aa:bb".parse::<Bssid>().is_err());
        assert!("aa:bb:cc:00:11:22:33".parse::<Bssid>().is_err());
    }

    #[test]
    fn signal_bar_thresholds() {
        assert_eq!(signal_to_bar(-40), "████");
        assert_eq!(signal_to_bar(-60), "███░");
        assert_eq!(signal_to_bar(-70), "██░░");
        assert_eq!(signal_to_bar(-80), "█░░░");
        assert_eq!(signal_to_bar(-95), "░░░░");
    }

    #[test]
    fn truncate_long_ssid() {
        assert_eq!(truncate_ssid("Short", 10), "Short");
        assert_eq!(truncate_ssid("VeryLongNetworkName", 10), "VeryLon...");
    }
}
