//! Node identity derived from the ESP32 factory MAC address.
//!
//! The identity is the station hostname `tempnode-xxyyzz` (last 3 bytes of
//! the 6-byte MAC in lowercase hex).  It is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - The DHCP hostname the station registers with
//! - The prefix of every MQTT topic and the MQTT client id

use core::fmt::Write;

use crate::app::topics::Identity;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Format: `tempnode-xxyyzz` (15 chars).
pub fn hostname(mac: &MacAddress) -> Identity {
    let mut name = Identity::new();
    let _ = write!(name, "tempnode-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}
