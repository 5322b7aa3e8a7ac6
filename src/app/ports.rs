//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (sensor, indicator, Wi-Fi, MQTT, storage, event sinks)
//! implement these traits.  The [`ControlLoop`](super::control::ControlLoop)
//! consumes them via generics, so the domain core never touches hardware
//! directly and runs unchanged against the mocks in `tests/`.
//!
//! Loop pacing uses [`embedded_hal::delay::DelayNs`] directly rather than a
//! bespoke port.

use serde::{Deserialize, Serialize};

use super::codec::Level;
use super::topics::{Channel, Identity};
use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the on-die temperature sensor.
pub trait SensorPort {
    /// Sample the sensor once.  Whole degrees Celsius, saturated to `i8`.
    fn read_celsius(&mut self) -> i8;
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the tri-colour indicator.
pub trait IndicatorPort {
    /// Drive one channel to `level`.
    fn set_level(&mut self, channel: Channel, level: Level) -> Result<()>;

    /// Last level successfully applied to `channel`.
    fn level(&self, channel: Channel) -> Level;
}

// ───────────────────────────────────────────────────────────────
// Network session port
// ───────────────────────────────────────────────────────────────

/// The wireless link as seen by the control loop.
pub trait NetworkPort {
    /// Block until the link is up, running the provisioning fallback if
    /// required.  Returns an error only when every path failed.
    fn connect(&mut self) -> Result<()>;

    /// Non-blocking status query.
    fn is_connected(&self) -> bool;

    /// Node Identity; `None` until [`connect`](Self::connect) has succeeded.
    fn identity(&self) -> Option<&str>;

    /// Relative signal strength (dBm) for status reports.
    fn signal_quality(&self) -> Option<i8>;
}

/// Raw station-mode Wi-Fi driver underneath the network session.
pub trait StationPort {
    /// Join the network described by `credentials`.  Blocks until the
    /// association either completes or fails.
    fn join(&mut self, credentials: &Credentials) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn rssi(&self) -> Option<i8>;

    /// Stable per-unit hostname used as the Node Identity.
    fn hostname(&self) -> Identity;
}

// ───────────────────────────────────────────────────────────────
// Provisioning + credential storage
// ───────────────────────────────────────────────────────────────

/// Wi-Fi station credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl Credentials {
    pub fn new(ssid: &str, password: &str) -> Option<Self> {
        let mut c = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        c.ssid.push_str(ssid).ok()?;
        c.password.push_str(password).ok()?;
        Some(c)
    }
}

/// Result of the provisioning fallback, an opaque external flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    /// The operator submitted credentials.
    Provisioned(Credentials),
    /// Timed out or aborted.
    Failed,
}

/// Captive-portal style provisioning flow.
pub trait ProvisioningPort {
    fn provision(&mut self) -> ProvisioningOutcome;
}

/// Persistent storage for Wi-Fi credentials.
pub trait CredentialStore {
    /// `None` when the device was never provisioned.
    fn load(&self) -> Option<Credentials>;

    fn save(&mut self, credentials: &Credentials) -> Result<()>;

    /// Forget stored credentials.  `Ok(())` even if none were stored.
    fn erase(&mut self) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// MQTT transport port
// ───────────────────────────────────────────────────────────────

/// Raw publish/subscribe transport under the messaging client.
///
/// Implementations must never block in [`poll`](Self::poll): it hands over
/// messages that already arrived and returns.
pub trait MqttTransport {
    /// Perform one connection handshake using `client_id` as session name.
    fn connect(&mut self, client_id: &str) -> Result<()>;

    /// Whether the broker session is currently up.
    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<()>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Deliver up to `max` pending inbound messages to `on_message` and
    /// return how many were delivered.
    fn poll(&mut self, max: usize, on_message: &mut dyn FnMut(&str, &[u8])) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
