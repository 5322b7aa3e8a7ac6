//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the connectivity-and-telemetry rules for the node:
//! topic bindings, command routing, broker session handling, retry
//! policy, and the control loop that paces them.  All interaction with
//! hardware and the network happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod codec;
pub mod control;
pub mod events;
pub mod messaging;
pub mod phase;
pub mod ports;
pub mod retry;
pub mod router;
pub mod session;
pub mod topics;
