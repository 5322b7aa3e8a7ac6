//! TempNode Firmware: Main Entry Point
//!
//! Hexagonal architecture: the control loop only sees port traits, the
//! adapters below wire them to the ESP-IDF drivers.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiStation      SoftApProvisioner   NvsCredentialStore       │
//! │  (StationPort)    (ProvisioningPort)  (CredentialStore)        │
//! │  EspMqttTransport RgbIndicator        OnDieTemperature         │
//! │  (MqttTransport)  (IndicatorPort)     (SensorPort)             │
//! │  LogEventSink (EventSink)             FreeRtos (DelayNs)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ControlLoop · NetworkSession · MessagingClient        │    │
//! │  │  CommandRouter · PhaseCounter · RetryPolicy            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::info;

use tempnode::adapters::credentials::NvsCredentialStore;
use tempnode::adapters::device_id;
use tempnode::adapters::log_sink::LogEventSink;
use tempnode::adapters::mqtt::EspMqttTransport;
use tempnode::adapters::provisioning::SoftApProvisioner;
use tempnode::adapters::time::system_delay;
use tempnode::adapters::wifi::{SharedWifi, WifiStation};
use tempnode::app::control::ControlLoop;
use tempnode::app::messaging::MessagingClient;
use tempnode::app::retry::{ExponentialBackoff, FixedBackoff};
use tempnode::app::router::CommandRouter;
use tempnode::app::session::NetworkSession;
use tempnode::config::NodeConfig;
use tempnode::drivers::indicator::RgbIndicator;
use tempnode::pins;
use tempnode::sensors::temperature::OnDieTemperature;

/// First retry delay when rejoining the access point.
const LINK_RETRY_BASE_MS: u32 = 1_000;

/// Sample the boot-reset input (active LOW, pulled up).
fn boot_reset_requested() -> Result<bool> {
    // SAFETY: the pin is not claimed anywhere else and the driver is
    // dropped before this returns.
    let mut pin = PinDriver::input(unsafe { AnyIOPin::new(pins::BOOT_RESET_GPIO) })?;
    pin.set_pull(Pull::Up)?;
    FreeRtos::delay_ms(10);
    Ok(pin.is_low())
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("TempNode v{}", env!("CARGO_PKG_VERSION"));

    let config = NodeConfig::default();
    config.validate()?;
    info!(
        "Config: broker={} telemetry every {} ms, reconnect backoff {} ms",
        config.broker_url(),
        config.telemetry_period_ms(),
        config.reconnect_backoff_ms
    );

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. GPIO ───────────────────────────────────────────────
    let reset_requested = boot_reset_requested()?;
    if reset_requested {
        info!("Boot-reset input asserted");
    }

    // SAFETY: the indicator GPIOs are used only by these drivers.
    let (red, green, blue) = unsafe {
        (
            AnyOutputPin::new(pins::LED_R_GPIO),
            AnyOutputPin::new(pins::LED_G_GPIO),
            AnyOutputPin::new(pins::LED_B_GPIO),
        )
    };
    let mut indicator = RgbIndicator::new(
        PinDriver::output(red)?,
        PinDriver::output(green)?,
        PinDriver::output(blue)?,
        config.indicator_active_low,
    );
    indicator.all_off();

    let sensor = OnDieTemperature::install()?;

    // ── 3. Network session ────────────────────────────────────
    let mac = device_id::read_mac();
    let store = NvsCredentialStore::new()?;
    let wifi = BlockingWifi::wrap(EspWifi::new(peripherals.modem, sysloop.clone(), None)?, sysloop)?;
    let wifi: SharedWifi = Arc::new(Mutex::new(wifi));

    let session = NetworkSession::new(
        WifiStation::new(wifi.clone(), &mac),
        SoftApProvisioner::new(wifi, &config, system_delay()),
        store,
        ExponentialBackoff::new(LINK_RETRY_BASE_MS, config.reconnect_backoff_ms),
        system_delay(),
        reset_requested,
    );

    // ── 4. Messaging + control loop ───────────────────────────
    let client = MessagingClient::new(EspMqttTransport::new(&config), CommandRouter::new(indicator));

    let mut node = ControlLoop::new(
        &config,
        session,
        client,
        sensor,
        system_delay(),
        LogEventSink::new(),
        FixedBackoff::new(config.reconnect_backoff_ms),
    );

    node.setup();
    info!("System ready. Entering control loop.");
    node.run()
}
