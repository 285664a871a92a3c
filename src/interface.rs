use std::fs;
use std::path::Path;

use crate::error::RadioError;
use crate::nmcli::{self, split_terse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiInterface {
    pub name: String,
    pub state: String,
    pub is_usb: bool,
}

/// List all WiFi interfaces on the system
pub fn list_wifi_interfaces() -> Result<Vec<WifiInterface>, RadioError> {
    let stdout = nmcli::run(&["-t", "-f", "DEVICE,TYPE,STATE", "device"])?;
    Ok(parse_device_list(&stdout, is_usb_interface))
}

/// Parse `nmcli -t -f DEVICE,TYPE,STATE device`, keeping wifi rows only
fn parse_device_list(stdout: &str, is_usb: impl Fn(&str) -> bool) -> Vec<WifiInterface> {
    stdout
        .lines()
        .map(split_terse)
        .filter(|parts| parts.len() >= 3 && parts[1] == "wifi")
        .map(|parts| WifiInterface {
            is_usb: is_usb(&parts[0]),
            name: parts[0].clone(),
            state: parts[2].clone(),
        })
        .collect()
}

/// Check if a network interface is USB-based by examining sysfs
fn is_usb_interface(interface_name: &str) -> bool {
    let device_path = format!("/sys/class/net/{}/device", interface_name);
    let path = Path::new(&device_path);

    if !path.exists() {
        return false;
    }

    if let Ok(resolved) = fs::read_link(path) {
        if let Some(resolved_str) = resolved.to_str() {
            return resolved_str.contains("usb");
        }
    }

    let uevent_path = format!("{}/uevent", device_path);
    fs::read_to_string(&uevent_path)
        .map(|content| content.contains("usb"))
        .unwrap_or(false)
}

/// Get a specific interface by name, verifying it's a WiFi interface
pub fn get_interface(name: &str) -> Result<WifiInterface, RadioError> {
    let interfaces = list_wifi_interfaces()?;

    interfaces
        .into_iter()
        .find(|i| i.name == name)
        .ok_or_else(|| RadioError::InterfaceNotFound(name.to_string()))
}

/// Pick an interface when none was named: a USB adapter wins, then the
/// first WiFi interface present
fn pick_default(interfaces: Vec<WifiInterface>) -> Result<WifiInterface, RadioError> {
    let mut fallback = None;
    for interface in interfaces {
        if interface.is_usb {
            return Ok(interface);
        }
        if fallback.is_none() {
            fallback = Some(interface);
        }
    }
    fallback.ok_or(RadioError::NoUsbInterfaceFound)
}

/// Resolve interface: use provided name or auto-detect
pub fn resolve_interface(interface: Option<&str>) -> Result<WifiInterface, RadioError> {
    match interface {
        Some(name) => get_interface(name),
        None => pick_default(list_wifi_interfaces()?),
    }
}
