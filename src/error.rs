//! Unified error types for the TempNode firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be returned from the inbound dispatch path and logged without
//! allocation.
//!
//! None of these are fatal: the control loop retries or logs every one of
//! them and keeps running.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The wireless link is down or was never established.
    LinkUnavailable,
    /// One broker handshake did not complete.
    BrokerConnectFailed,
    /// The transport rejected an outbound message.
    PublishFailed,
    /// The transport rejected a subscription request.
    SubscribeFailed,
    /// An inbound command payload could not be decoded.
    MalformedCommand,
    /// An inbound message arrived on a topic with no binding.
    UnrecognizedTopic,
    /// An indicator output could not be driven.
    Actuator,
    /// Non-volatile credential storage failed.
    Storage,
    /// The provisioning fallback did not yield working credentials.
    Provisioning,
    /// Configuration is invalid.
    Config(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// A sensor read failed after a successful init.
    Sensor(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkUnavailable => write!(f, "network link unavailable"),
            Self::BrokerConnectFailed => write!(f, "broker connect failed"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::MalformedCommand => write!(f, "malformed command payload"),
            Self::UnrecognizedTopic => write!(f, "unrecognized topic"),
            Self::Actuator => write!(f, "indicator output write failed"),
            Self::Storage => write!(f, "credential storage failed"),
            Self::Provisioning => write!(f, "provisioning failed"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Sensor(msg) => write!(f, "sensor read: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
