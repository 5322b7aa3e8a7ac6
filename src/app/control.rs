//! Control loop: the single owner of every piece of runtime state.
//!
//! ```text
//!  setup():  NetworkPort::connect ──▶ bind topics
//!
//!  step():   ┌─ phase boundary? ─────────────────────────────────────┐
//!            │  sample ─▶ status report ─▶ ensure broker ─▶ publish   │
//!            └───────────────────────────────────────────────────────┘
//!            service_inbound ─▶ sleep(tick)
//! ```
//!
//! Fully serial: the reconnect loop blocks the whole node until the
//! broker accepts a session (with the default unbounded policy), and no
//! publish is attempted in between.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::codec::encode_temperature;
use super::events::{AppEvent, LinkState, StatusReport};
use super::messaging::MessagingClient;
use super::phase::PhaseCounter;
use super::ports::{EventSink, MqttTransport, NetworkPort, SensorPort};
use super::retry::{FixedBackoff, RetryPolicy};
use super::router::InboundHandler;
use super::topics::Identity;
use crate::config::NodeConfig;
use crate::error::{Error, Result};

pub struct ControlLoop<N, T, H, S, D, E, R = FixedBackoff> {
    network: N,
    client: MessagingClient<T, H>,
    sensor: S,
    delay: D,
    sink: E,
    retry: R,
    phase: PhaseCounter,
    tick_ms: u32,
    link_backoff_ms: u32,
}

impl<N, T, H, S, D, E, R> ControlLoop<N, T, H, S, D, E, R>
where
    N: NetworkPort,
    T: MqttTransport,
    H: InboundHandler,
    S: SensorPort,
    D: DelayNs,
    E: EventSink,
    R: RetryPolicy,
{
    pub fn new(
        config: &NodeConfig,
        network: N,
        client: MessagingClient<T, H>,
        sensor: S,
        delay: D,
        sink: E,
        retry: R,
    ) -> Self {
        Self {
            network,
            client,
            sensor,
            delay,
            sink,
            retry,
            phase: PhaseCounter::new(config.telemetry_every_ticks),
            tick_ms: config.loop_tick_ms,
            link_backoff_ms: config.reconnect_backoff_ms,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn client(&self) -> &MessagingClient<T, H> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut MessagingClient<T, H> {
        &mut self.client
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring the link up (retrying at the link backoff forever) and bind
    /// the topics to the resulting identity.
    pub fn setup(&mut self) {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.network.connect().and_then(|()| self.bind_identity()) {
                Ok(()) => break,
                Err(error) => {
                    warn!("setup: network not ready ({}), retry in {} ms", error, self.link_backoff_ms);
                    self.delay.delay_ms(self.link_backoff_ms);
                }
            }
        }
        info!("setup: complete after {} attempt(s)", attempt);
    }

    /// One loop iteration.  Returns `true` when it was a telemetry pass.
    pub fn step(&mut self) -> bool {
        let boundary = self.phase.tick();
        if boundary {
            self.telemetry_pass();
        }
        self.client.service_inbound(&mut self.sink);
        self.delay.delay_ms(self.tick_ms);
        boundary
    }

    /// Run forever; only a device reset ends this.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    // ── Paced actions ─────────────────────────────────────────

    fn telemetry_pass(&mut self) {
        let temperature_c = self.sensor.read_celsius();

        let broker = self.client.refresh_state();

        self.sink.emit(&AppEvent::Status(StatusReport {
            network: LinkState::from_bool(self.network.is_connected()),
            broker,
            signal_dbm: self.network.signal_quality(),
            temperature_c,
        }));

        if !broker.is_connected() {
            if let Err(error) = self.ensure_connected() {
                self.sink.emit(&AppEvent::TelemetryDropped { temperature_c, error });
                return;
            }
        }

        let payload = encode_temperature(temperature_c);
        match self.client.publish_telemetry(payload.as_bytes()) {
            Ok(()) => self.sink.emit(&AppEvent::TelemetryPublished { temperature_c }),
            Err(error) => self.sink.emit(&AppEvent::TelemetryDropped { temperature_c, error }),
        }
    }

    /// Blocking reconnect: retry per policy until the broker session is up.
    /// Returns an error only when the policy gives up.
    pub fn ensure_connected(&mut self) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_reconnect() {
                Ok(()) => {
                    self.sink.emit(&AppEvent::BrokerConnected { attempts: attempt });
                    return Ok(());
                }
                Err(error) => {
                    let Some(retry_in_ms) = self.retry.next_delay_ms(attempt) else {
                        warn!("reconnect: giving up after {} attempt(s)", attempt);
                        return Err(error);
                    };
                    self.sink.emit(&AppEvent::ReconnectFailed { attempt, error, retry_in_ms });
                    self.delay.delay_ms(retry_in_ms);
                }
            }
        }
    }

    fn try_reconnect(&mut self) -> Result<()> {
        if !self.network.is_connected() {
            self.network.connect()?;
        }
        self.bind_identity()?;
        let report = self.client.reconnect()?;
        if !report.all_ok() {
            warn!("reconnect: {} subscription(s) failed", report.failures());
        }
        Ok(())
    }

    fn bind_identity(&mut self) -> Result<()> {
        let identity = self.network.identity().ok_or(Error::LinkUnavailable)?;
        let fresh = self.client.topics().is_none_or(|t| t.identity() != identity);
        self.client.bind_identity(identity)?;
        if fresh {
            let identity =
                Identity::try_from(identity).map_err(|()| Error::Config("identity longer than 32 bytes"))?;
            self.sink.emit(&AppEvent::Online { identity });
        }
        Ok(())
    }
}
