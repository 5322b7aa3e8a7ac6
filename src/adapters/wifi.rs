//! WiFi station-mode adapter.
//!
//! Implements [`StationPort`]: joins an access point with the given
//! credentials and reports link state, RSSI and the station hostname.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via
//!   `esp_idf_svc::wifi`.  The driver is shared with the provisioning
//!   adapter through [`SharedWifi`].
//! - **all other targets**: simulation stubs for host-side tests, with
//!   injectable join failures and link drops.

use core::fmt;
use log::{info, warn};

use super::device_id::{self, MacAddress};
use super::utils::validate_credentials;
use crate::app::ports::{Credentials, StationPort};
use crate::app::topics::Identity;
use crate::error::{Error, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

/// The ESP-IDF driver, shared between station and soft-AP use.
#[cfg(target_os = "espidf")]
pub type SharedWifi = std::sync::Arc<std::sync::Mutex<BlockingWifi<EspWifi<'static>>>>;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl From<ConnectivityError> for Error {
    fn from(_: ConnectivityError) -> Self {
        Error::LinkUnavailable
    }
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WifiState {
    Disconnected,
    Connecting,
    Connected,
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiStation {
    #[cfg(target_os = "espidf")]
    wifi: SharedWifi,
    state: WifiState,
    hostname: Identity,
    /// Simulation: join attempts still to fail.
    #[cfg(not(target_os = "espidf"))]
    sim_fail_joins: u32,
    /// Simulation: total join attempts seen.
    #[cfg(not(target_os = "espidf"))]
    sim_join_counter: u32,
}

impl WifiStation {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: SharedWifi, mac: &MacAddress) -> Self {
        Self {
            wifi,
            state: WifiState::Disconnected,
            hostname: device_id::hostname(mac),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(mac: &MacAddress) -> Self {
        Self {
            state: WifiState::Disconnected,
            hostname: device_id::hostname(mac),
            sim_fail_joins: 0,
            sim_join_counter: 0,
        }
    }

    /// Simulation: make the next `n` joins fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next_joins(&mut self, n: u32) {
        self.sim_fail_joins = n;
    }

    /// Simulation: the access point went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        warn!("WiFi(sim): link dropped");
        self.state = WifiState::Disconnected;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_join_count(&self) -> u32 {
        self.sim_join_counter
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_join(&mut self, credentials: &Credentials) -> core::result::Result<(), ConnectivityError> {
        let mut wifi = self.wifi.lock().map_err(|_| ConnectivityError::ConnectionFailed)?;

        let auth_method = if credentials.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: credentials
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let failed = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi(espidf): {}", e);
            ConnectivityError::ConnectionFailed
        };
        if wifi.is_started().unwrap_or(false) {
            let _ = wifi.disconnect();
            wifi.stop().map_err(failed)?;
        }
        wifi.set_configuration(&config).map_err(failed)?;
        if let Err(e) = wifi.wifi_mut().sta_netif_mut().set_hostname(&self.hostname) {
            warn!("WiFi(espidf): hostname not set ({})", e);
        }
        wifi.start().map_err(failed)?;
        wifi.connect().map_err(failed)?;
        wifi.wait_netif_up().map_err(failed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_join(&mut self, credentials: &Credentials) -> core::result::Result<(), ConnectivityError> {
        self.sim_join_counter = self.sim_join_counter.wrapping_add(1);
        if self.sim_fail_joins > 0 {
            self.sim_fail_joins -= 1;
            warn!("WiFi(sim): simulated join failure (attempt {})", self.sim_join_counter);
            return Err(ConnectivityError::ConnectionFailed);
        }
        info!("WiFi(sim): joined '{}' (attempt {})", credentials.ssid, self.sim_join_counter);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi
            .lock()
            .map(|wifi| wifi.is_connected().unwrap_or(false))
            .unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        (ret == esp_idf_svc::sys::ESP_OK).then_some(ap_info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        // Oscillate around -60 dBm to mimic a real environment.
        let oscillation = ((self.sim_join_counter % 12) as i8) - 6;
        Some(-60_i8.saturating_add(oscillation))
    }
}

// ───────────────────────────────────────────────────────────────
// StationPort
// ───────────────────────────────────────────────────────────────

impl StationPort for WifiStation {
    fn join(&mut self, credentials: &Credentials) -> Result<()> {
        validate_credentials(credentials)?;

        info!("WiFi: connecting to '{}'", credentials.ssid);
        self.state = WifiState::Connecting;

        match self.platform_join(credentials) {
            Ok(()) => {
                self.state = WifiState::Connected;
                info!("WiFi: connected as '{}' (RSSI={:?})", self.hostname, self.rssi());
                Ok(())
            }
            Err(e) => {
                warn!("WiFi: connection failed: {}", e);
                self.state = WifiState::Disconnected;
                Err(e.into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }

    fn rssi(&self) -> Option<i8> {
        if self.is_connected() { self.platform_rssi() } else { None }
    }

    fn hostname(&self) -> Identity {
        self.hostname.clone()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
