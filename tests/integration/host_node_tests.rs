//! End-to-end run of the node on the host backends of the real adapters:
//! simulated Wi-Fi, in-memory NVS, soft-AP provisioning signal, loopback
//! MQTT broker, and the RGB driver over in-memory pins.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use tempnode::adapters::credentials::NvsCredentialStore;
use tempnode::adapters::log_sink::LogEventSink;
use tempnode::adapters::mqtt::SimMqttTransport;
use tempnode::adapters::provisioning::{SoftApProvisioner, submit_credentials};
use tempnode::adapters::time::system_delay;
use tempnode::adapters::wifi::WifiStation;
use tempnode::adapters::device_id;
use tempnode::app::control::ControlLoop;
use tempnode::app::messaging::MessagingClient;
use tempnode::app::ports::{CredentialStore, NetworkPort};
use tempnode::app::retry::{ExponentialBackoff, FixedBackoff};
use tempnode::app::router::CommandRouter;
use tempnode::app::session::NetworkSession;
use tempnode::config::NodeConfig;
use tempnode::drivers::indicator::RgbIndicator;
use tempnode::sensors::temperature::{OnDieTemperature, sim_set_temperature};

use crate::mock_hw::{MockDelay, Trace};

#[derive(Default)]
struct MemPin {
    high: bool,
}

impl ErrorType for MemPin {
    type Error = Infallible;
}

impl OutputPin for MemPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

#[test]
fn first_boot_to_telemetry_and_commands() {
    let trace = Trace::default();
    let config = NodeConfig {
        telemetry_every_ticks: 4,
        ..NodeConfig::default()
    };
    let mac = device_id::read_mac();

    // Operator submits credentials on the setup AP.
    submit_credentials("HomeWiFi", "mysecret8").unwrap();
    sim_set_temperature(23);

    let session = NetworkSession::new(
        WifiStation::new(&mac),
        SoftApProvisioner::new(&config, system_delay()),
        NvsCredentialStore::new().unwrap(),
        ExponentialBackoff::new(1_000, config.reconnect_backoff_ms),
        MockDelay::new(&trace),
        false,
    );
    let indicator = RgbIndicator::new(MemPin::default(), MemPin::default(), MemPin::default(), false);
    let client = MessagingClient::new(SimMqttTransport::new(), CommandRouter::new(indicator));

    let mut node = ControlLoop::new(
        &config,
        session,
        client,
        OnDieTemperature::install().unwrap(),
        MockDelay::new(&trace),
        LogEventSink::new(),
        FixedBackoff::new(config.reconnect_backoff_ms),
    );

    node.setup();
    assert_eq!(node.network().identity(), Some("tempnode-efcafe"));
    assert!(node.network().store().load().is_some());

    assert!(node.step());
    let transport = node.client().transport();
    assert_eq!(transport.connects(), 1);
    assert_eq!(transport.subscriptions().len(), 3);
    assert_eq!(
        transport.published(),
        &[("tempnode-efcafe/Temperature".to_owned(), b"23".to_vec())]
    );

    assert!(node.client_mut().transport_mut().sim_deliver("tempnode-efcafe/RGB-Led/Green", b"1"));
    node.step();
    let leds = node.client().handler().indicator();
    assert!(leds.green().pin().high);
    assert!(!leds.red().pin().high);
    assert!(!leds.blue().pin().high);

    // Broker bounces between passes; nothing comes back until the next
    // telemetry pass reconnects and resubscribes.
    let transport = node.client_mut().transport_mut();
    transport.sim_set_reachable(false);
    transport.sim_set_reachable(true);
    assert!(!node.client_mut().transport_mut().sim_deliver("tempnode-efcafe/RGB-Led/Red", b"1"));
    assert!(!node.step());
    assert!(!node.step());
    assert!(node.step());

    let transport = node.client().transport();
    assert_eq!(transport.connects(), 2);
    assert_eq!(transport.subscriptions().len(), 3);
    assert_eq!(transport.published().len(), 2);

    assert!(node.client_mut().transport_mut().sim_deliver("tempnode-efcafe/RGB-Led/Red", b"1"));
    node.step();
    assert!(node.client().handler().indicator().red().pin().high);
}
