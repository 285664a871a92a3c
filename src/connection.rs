//! Active connection queries.
//!
//! Thin wrappers over `nmcli device` and `nmcli connection` used by the
//! [`NmcliRadio`](crate::nmcli::NmcliRadio) backend and the `status` command.
//!
//! # Example
//!
//! ```no_run
//! use wifi_supervisor::connection::{display_status, status};
//!
//! let s = status("wlan0").expect("Status failed");
//! display_status(&s);
//! ```

use crate::error::RadioError;
use crate::nmcli;

/// Represents the current connection status of a WiFi interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// The name of the network interface (e.g., "wlan0").
    pub interface: String,

    /// The raw state string from nmcli (e.g., "100 (connected)").
    pub state: String,

    /// The name of the active connection profile, if any.
    pub connection: Option<String>,

    /// The IPv4 address with CIDR notation (e.g., "192.168.1.20/24").
    pub ip_address: Option<String>,

    pub gateway: Option<String>,
}

/// Disconnects the interface from its current network, keeping the profile.
///
/// # Command Executed
/// ```bash
/// nmcli device disconnect <interface>
/// ```
pub fn disconnect(interface: &str) -> Result<(), RadioError> {
    nmcli::run(&["device", "disconnect", interface]).map(|_| ())
}

/// Retrieves the connection status for the specified interface.
///
/// # Command Executed
/// ```bash
/// nmcli -t device show <interface>
/// ```
pub fn status(interface: &str) -> Result<ConnectionStatus, RadioError> {
    let stdout = nmcli::run(&["-t", "device", "show", interface])?;
    Ok(parse_device_show(interface, &stdout))
}

/// Parses the `KEY:VALUE` lines of `nmcli -t device show`.
///
/// # Parsed Fields
/// - `GENERAL.STATE` - Interface state (e.g., "100 (connected)")
/// - `GENERAL.CONNECTION` - Active connection profile name
/// - `IP4.ADDRESS[1]` - Primary IPv4 address with CIDR
/// - `IP4.GATEWAY` - IPv4 gateway address
pub fn parse_device_show(interface: &str, stdout: &str) -> ConnectionStatus {
    let mut status = ConnectionStatus {
        interface: interface.to_string(),
        state: "unknown".to_string(),
        connection: None,
        ip_address: None,
        gateway: None,
    };

    for line in stdout.lines() {
        // Split on first colon only (value might contain colons)
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let present = !value.is_empty() && value != "--";

        match key {
            "GENERAL.STATE" => status.state = value.to_string(),
            "GENERAL.CONNECTION" if present => status.connection = Some(value.to_string()),
            "IP4.ADDRESS[1]" if present => status.ip_address = Some(value.to_string()),
            "IP4.GATEWAY" if present => status.gateway = Some(value.to_string()),
            _ => {}
        }
    }

    status
}

/// Displays connection status information in a human-readable format.
///
/// # Output Format
/// ```text
/// Interface: wlan0
/// State:     100 (connected)
/// Connected: Home
/// IP:        192.168.1.20/24
/// Gateway:   192.168.1.1
/// ```
pub fn display_status(status: &ConnectionStatus) {
    println!("Interface: {}", status.interface);
    println!("State:     {}", status.state);

    if let Some(ref conn) = status.connection {
        println!("Connected: {}", conn);
    } else {
        println!("Connected: (none)");
    }

    if let Some(ref ip) = status.ip_address {
        println!("IP:        {}", ip);
    }

    if let Some(ref gw) = status.gateway {
        println!("Gateway:   {}", gw);
    }
}

/// Deletes a saved connection profile from NetworkManager.
///
/// # Command Executed
/// ```bash
/// nmcli connection delete <name>
/// ```
pub fn delete_connection(name: &str) -> Result<(), RadioError> {
    nmcli::run(&["connection", "delete", name]).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_connected_device() {
        let stdout = "\
GENERAL.DEVICE:wlan0
GENERAL.STATE:100 (connected)
GENERAL.CONNECTION:Home
IP4.ADDRESS[1]:192.168.1.20/24
IP4.GATEWAY:192.168.1.1
IP4.DNS[1]:192.168.1.1
";
        let status = parse_device_show("wlan0", stdout);
        assert_eq!(status.state, "100 (connected)");
        assert_eq!(status.connection.as_deref(), Some("Home"));
        assert_eq!(status.ip_address.as_deref(), Some("192.168.1.20/24"));
        assert_eq!(status.gateway.as_deref(), Some("192.168.1.1"));
    }

    #[test]
    fn parse_disconnected_device() {
        let stdout = "GENERAL.STATE:30 (disconnected)\nGENERAL.CONNECTION:--\nIP4.GATEWAY:--\n";
        let status = parse_device_show("wlan0", stdout);
        assert_eq!(status.state, "30 (disconnected)");
        assert_eq!(status.connection, None);
        assert_eq!(status.gateway, None);
        assert_eq!(status.ip_address, None);
    }
}
