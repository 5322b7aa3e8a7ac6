//! Outbound application events.
//!
//! The control loop emits these through the
//! [`EventSink`](super::ports::EventSink) port.  They are observability
//! only: nothing in the domain reads them back.

use super::codec::Level;
use super::topics::{Channel, Identity};
use crate::error::Error;

/// Connectivity of one layer (network link or broker session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

impl LinkState {
    pub const fn from_bool(up: bool) -> Self {
        if up { Self::Connected } else { Self::Disconnected }
    }

    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Per-pass status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub network: LinkState,
    pub broker: LinkState,
    pub signal_dbm: Option<i8>,
    pub temperature_c: i8,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Network identity established; topics bound.
    Online { identity: Identity },

    /// Periodic status line, emitted before every telemetry publish.
    Status(StatusReport),

    /// A broker (re)connect attempt failed; retrying after `retry_in_ms`.
    ReconnectFailed { attempt: u32, error: Error, retry_in_ms: u32 },

    /// Broker session (re)established after `attempts` tries.
    BrokerConnected { attempts: u32 },

    /// Telemetry sample delivered to the transport.
    TelemetryPublished { temperature_c: i8 },

    /// Telemetry sample lost; not retried until the next period.
    TelemetryDropped { temperature_c: i8, error: Error },

    /// Indicator channel changed by an inbound command.
    CommandApplied { channel: Channel, level: Level },

    /// Inbound message ignored (unknown topic, bad payload, driver error).
    CommandRejected { error: Error },
}
