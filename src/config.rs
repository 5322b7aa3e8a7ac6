//! Node configuration parameters
//!
//! All tunable parameters for the TempNode system.  The broker address is
//! fixed at build time (`TEMPNODE_BROKER_HOST`); everything else uses the
//! defaults below unless a caller overrides them before the loop starts.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Broker host used when `TEMPNODE_BROKER_HOST` is not set at build time.
pub const DEFAULT_BROKER_HOST: &str = "192.168.1.10";

/// Standard unencrypted MQTT port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

pub type HostString = heapless::String<64>;
pub type PortalString = heapless::String<32>;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Broker ---
    /// Broker hostname or dotted IPv4 address
    pub broker_host: HostString,
    /// Broker TCP port
    pub broker_port: u16,
    /// Upper bound on a single broker handshake (milliseconds)
    pub connect_timeout_ms: u32,

    // --- Timing ---
    /// Sleep between control-loop iterations (milliseconds)
    pub loop_tick_ms: u32,
    /// Ticks between telemetry publications (phase counter period)
    pub telemetry_every_ticks: u32,
    /// Fixed wait between failed reconnect attempts (milliseconds)
    pub reconnect_backoff_ms: u32,

    // --- Provisioning fallback ---
    /// Access-point name offered while provisioning
    pub portal_ssid: PortalString,
    /// Access-point passphrase offered while provisioning
    pub portal_password: PortalString,
    /// How long the portal waits for credentials before giving up (seconds)
    pub portal_timeout_secs: u32,

    // --- Indicator ---
    /// Drive the RGB outputs low for "on" (common-anode LED)
    pub indicator_active_low: bool,
}

fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    // Truncates silently; every compile-time value below fits.
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Broker
            broker_host: fixed(option_env!("TEMPNODE_BROKER_HOST").unwrap_or(DEFAULT_BROKER_HOST)),
            broker_port: DEFAULT_BROKER_PORT,
            connect_timeout_ms: 5_000,

            // Timing
            loop_tick_ms: 250,           // 4 Hz inbound servicing
            telemetry_every_ticks: 240,  // 60 s at 250 ms
            reconnect_backoff_ms: 10_000,

            // Provisioning
            portal_ssid: fixed("TempNode-Setup"),
            portal_password: fixed("tempnode"),
            portal_timeout_secs: 180,

            // Indicator
            indicator_active_low: false,
        }
    }
}

impl NodeConfig {
    /// Telemetry period implied by the tick length and phase counter period.
    pub fn telemetry_period_ms(&self) -> u64 {
        u64::from(self.loop_tick_ms) * u64::from(self.telemetry_every_ticks)
    }

    /// `mqtt://host:port` form used by the device transport.
    pub fn broker_url(&self) -> heapless::String<96> {
        use core::fmt::Write;
        let mut url = heapless::String::new();
        let _ = write!(url, "mqtt://{}:{}", self.broker_host, self.broker_port);
        url
    }

    /// Reject values that would stall or break the control loop.
    pub fn validate(&self) -> Result<()> {
        if self.broker_host.is_empty() {
            return Err(Error::Config("broker_host must not be empty"));
        }
        if self.broker_port == 0 {
            return Err(Error::Config("broker_port must be non-zero"));
        }
        if self.loop_tick_ms == 0 {
            return Err(Error::Config("loop_tick_ms must be non-zero"));
        }
        if self.telemetry_every_ticks == 0 {
            return Err(Error::Config("telemetry_every_ticks must be non-zero"));
        }
        if self.reconnect_backoff_ms == 0 {
            return Err(Error::Config("reconnect_backoff_ms must be non-zero"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::Config("connect_timeout_ms must be non-zero"));
        }
        if self.portal_ssid.is_empty() {
            return Err(Error::Config("portal_ssid must not be empty"));
        }
        if self.portal_password.len() < 8 {
            return Err(Error::Config("portal_password must be at least 8 bytes"));
        }
        Ok(())
    }
}
