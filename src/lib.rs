//! TempNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod pins;

// Adapters, drivers and sensors carry host simulation backends so the
// crate builds and tests without the ESP-IDF toolchain.
pub mod adapters;
pub mod drivers;
pub mod sensors;
