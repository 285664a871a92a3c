use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::clock::Clock;
use crate::credential::StaticIp;
use crate::radio::Radio;
use crate::supervisor::{Settings, Supervisor};

pub const DEFAULT_TICK_MS: u64 = 100;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub interface: Option<String>,
    /// Period of the supervisor tick in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub supervisor: Settings,
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
    #[serde(default)]
    pub access_point: Option<AccessPointSection>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub ssid: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub static_ip: Option<StaticIp>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessPointSection {
    pub ssid: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub static_ip: Option<StaticIp>,
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interface: None,
            tick_ms: DEFAULT_TICK_MS,
            supervisor: Settings::default(),
            networks: Vec::new(),
            access_point: None,
        }
    }
}

impl Config {
    /// Loads the default config file, or the defaults when it doesn't exist.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        anyhow::ensure!(config.tick_ms > 0, "tick_ms must be greater than zero");
        Ok(config)
    }

    pub fn find_network(&self, ssid: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.ssid == ssid)
    }

    /// Registers the configured networks in file order and the access point,
    /// then pushes the hostname to the radio. Subscribe before calling this
    /// to receive a [`HostnameError`](crate::notifier::EventKind::HostnameError).
    pub fn apply<R: Radio, C: Clock>(&self, supervisor: &mut Supervisor<R, C>) -> Result<()> {
        for network in &self.networks {
            supervisor
                .add_network(
                    &network.ssid,
                    network.password.as_deref(),
                    network.static_ip,
                    false,
                )
                .with_context(|| format!("Invalid network '{}'", network.ssid))?;
        }

        if let Some(ap) = &self.access_point {
            supervisor
                .set_access_point(&ap.ssid, ap.password.as_deref(), ap.static_ip)
                .with_context(|| format!("Invalid access point '{}'", ap.ssid))?;
        }

        if let Some(hostname) = &self.supervisor.hostname {
            supervisor.set_hostname(hostname);
        }

        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?;
    Ok(config_dir.join("wifi-supervisor").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notifier::EventKind;
    use crate::sim::{RadioCall, SimRadio};
    use crate::supervisor::ApMode;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::io::Write;
    use std::net::Ipv4Addr;

    const FULL: &str = r#"
interface = "wlan1"
tick_ms = 250

[supervisor]
connect_timeout_ms = 5000
scan = true
ap_mode = "both"
hostname = "robodog"

[[networks]]
ssid = "Home"
password = "secret123"

[networks.static_ip]
address = "192.168.1.50"
gateway = "192.168.1.1"
netmask = "255.255.255.0"

[[networks]]
ssid = "Cafe"

[access_point]
ssid = "robodog-setup"
password = "changeme"
"#;

    #[test]
    fn parse_full_file() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.interface.as_deref(), Some("wlan1"));
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.supervisor.connect_timeout_ms, 5000);
        assert_eq!(config.supervisor.reconnect_interval_ms, 60_000);
        assert!(config.supervisor.scan);
        assert_eq!(config.supervisor.ap_mode, ApMode::Both);
        assert_eq!(config.supervisor.hostname.as_deref(), Some("robodog"));

        let home = config.find_network("Home").unwrap();
        let ip = home.static_ip.unwrap();
        assert_eq!(ip.address, Ipv4Addr::new(192, 168, 1, 50));
        assert_eq!(ip.dns, None);
        assert_eq!(config.find_network("Cafe").unwrap().password, None);
        assert!(config.find_network("Nowhere").is_none());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.supervisor.ap_mode, ApMode::Alone);
    }

    #[test]
    fn rejects_zero_tick_and_bad_address() {
        assert!(Config::parse("tick_ms = 0").is_err());

        let bad = "[[networks]]\nssid = \"x\"\n[networks.static_ip]\naddress = \"300.1.1.1\"\ngateway = \"1.1.1.1\"\nnetmask = \"255.0.0.0\"\n";
        assert!(Config::parse(bad).is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.networks.len(), 2);

        let missing = file.path().with_extension("missing");
        let err = Config::load_from(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn apply_registers_in_file_order() {
        let config = Config::parse(FULL).unwrap();
        let mut sup = Supervisor::new(SimRadio::new(), ManualClock::new(0), config.supervisor.clone());
        config.apply(&mut sup).unwrap();

        let ssids: Vec<_> = sup.networks().iter().map(|e| e.credential.ssid.to_string()).collect();
        assert_eq!(ssids, ["Home", "Cafe"]);
        assert_eq!(sup.access_point().unwrap().ssid.as_str(), "robodog-setup");
        assert_eq!(sup.hostname(), "robodog");
        assert_eq!(sup.radio().count(&RadioCall::SetHostname("robodog".into())), 1);
    }

    #[test]
    fn apply_reports_hostname_error_to_subscribers() {
        let config = Config::parse("[supervisor]\nhostname = \"robodog\"\n").unwrap();
        let mut radio = SimRadio::new();
        radio.fail_hostname = true;
        let mut sup = Supervisor::new(radio, ManualClock::new(0), config.supervisor.clone());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        sup.subscribe(move |kind, _| sink.borrow_mut().push(kind));

        config.apply(&mut sup).unwrap();
        assert_eq!(*seen.borrow(), [EventKind::HostnameError]);
    }

    #[test]
    fn apply_reports_invalid_network() {
        let config = Config::parse("[[networks]]\nssid = \"\"\n").unwrap();
        let mut sup = Supervisor::new(SimRadio::new(), ManualClock::new(0), Settings::default());
        let err = config.apply(&mut sup).unwrap_err();
        assert!(err.to_string().contains("Invalid network"));
        assert!(sup.networks().is_empty());
    }
}
