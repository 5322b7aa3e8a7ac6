//! Actuator drivers.

pub mod indicator;
