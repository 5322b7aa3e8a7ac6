//! MQTT transport adapters.
//!
//! Implements [`MqttTransport`].  Both adapters feed inbound messages
//! through an [`InboundQueue`], a bounded `embassy_sync` channel between
//! the producer (the ESP-IDF MQTT event task, or the in-memory broker)
//! and `poll()`, which only drains what is already queued.
//!
//! | Adapter            | Target  | Broker                         |
//! |--------------------|---------|--------------------------------|
//! | `EspMqttTransport` | espidf  | `esp_idf_svc::mqtt::client`    |
//! | `SimMqttTransport` | host    | in-memory loopback             |

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::topics::{MAX_TOPIC_LEN, Topic};

/// Queue depth between the transport callback and the control loop.
pub const INBOUND_QUEUE_DEPTH: usize = 8;

/// Longest command payload kept; anything longer is dropped at the queue.
pub const MAX_PAYLOAD_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Topic,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundMessage {
    /// `None` if the topic or payload exceeds its bound.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        if topic.len() > MAX_TOPIC_LEN {
            return None;
        }
        let mut t = Topic::new();
        t.push_str(topic).ok()?;
        Some(Self {
            topic: t,
            payload: heapless::Vec::from_slice(payload).ok()?,
        })
    }
}

/// Bounded, lock-free-to-the-caller inbound queue.
pub struct InboundQueue {
    channel: Channel<CriticalSectionRawMutex, InboundMessage, INBOUND_QUEUE_DEPTH>,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    pub const fn new() -> Self {
        Self { channel: Channel::new() }
    }

    /// Enqueue without blocking.  Oversized and overflowing messages are
    /// dropped; returns whether the message was kept.
    pub fn push(&self, topic: &str, payload: &[u8]) -> bool {
        let Some(message) = InboundMessage::new(topic, payload) else {
            warn!("mqtt: dropping oversized message on '{}' ({} bytes)", topic, payload.len());
            return false;
        };
        if self.channel.try_send(message).is_err() {
            warn!("mqtt: inbound queue full, dropping message on '{}'", topic);
            return false;
        }
        true
    }

    pub fn pop(&self) -> Option<InboundMessage> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn clear(&self) {
        self.channel.clear();
    }

    /// Hand up to `max` queued messages to `on_message`.
    pub fn drain(&self, max: usize, on_message: &mut dyn FnMut(&str, &[u8])) -> usize {
        let mut handled = 0;
        while handled < max {
            let Some(message) = self.pop() else { break };
            on_message(&message.topic, &message.payload);
            handled += 1;
        }
        handled
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF transport
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspMqttTransport;

#[cfg(target_os = "espidf")]
mod esp {
    use core::sync::atomic::{AtomicBool, Ordering};

    use embedded_hal::delay::DelayNs;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration, QoS,
    };
    use log::{info, warn};

    use super::InboundQueue;
    use crate::app::ports::MqttTransport;
    use crate::config::NodeConfig;
    use crate::error::{Error, Result};

    /// Filled from the MQTT event task, drained by the control loop.
    static INBOUND: InboundQueue = InboundQueue::new();

    /// Broker session state as last reported by the event task.
    static SESSION_UP: AtomicBool = AtomicBool::new(false);

    const CONNECT_POLL_MS: u32 = 50;

    fn on_event(event: EspMqttEvent<'_>) {
        match event.payload() {
            EventPayload::Connected(_) => {
                SESSION_UP.store(true, Ordering::Release);
            }
            EventPayload::Disconnected => {
                SESSION_UP.store(false, Ordering::Release);
            }
            EventPayload::Received {
                topic: Some(topic),
                data,
                details: Details::Complete,
                ..
            } => {
                INBOUND.push(topic, data);
            }
            EventPayload::Received { .. } => {
                warn!("mqtt: dropping fragmented message");
            }
            EventPayload::Error(e) => {
                warn!("mqtt: client error {:?}", e);
            }
            _ => {}
        }
    }

    pub struct EspMqttTransport {
        url: heapless::String<96>,
        connect_timeout_ms: u32,
        client: Option<EspMqttClient<'static>>,
        delay: FreeRtos,
    }

    impl EspMqttTransport {
        pub fn new(config: &NodeConfig) -> Self {
            Self {
                url: config.broker_url(),
                connect_timeout_ms: config.connect_timeout_ms,
                client: None,
                delay: FreeRtos,
            }
        }

        fn teardown(&mut self) {
            self.client = None;
            SESSION_UP.store(false, Ordering::Release);
            INBOUND.clear();
        }
    }

    impl MqttTransport for EspMqttTransport {
        fn connect(&mut self, client_id: &str) -> Result<()> {
            self.teardown();

            // Sessions come up only through `connect()`, which resubscribes.
            let conf = MqttClientConfiguration {
                client_id: Some(client_id),
                disable_auto_reconnect: true,
                ..Default::default()
            };
            let client = EspMqttClient::new_cb(&self.url, &conf, on_event).map_err(|e| {
                warn!("mqtt: client create failed ({})", e);
                Error::BrokerConnectFailed
            })?;
            self.client = Some(client);

            let mut waited_ms = 0;
            while !SESSION_UP.load(Ordering::Acquire) {
                if waited_ms >= self.connect_timeout_ms {
                    self.teardown();
                    return Err(Error::BrokerConnectFailed);
                }
                self.delay.delay_ms(CONNECT_POLL_MS);
                waited_ms += CONNECT_POLL_MS;
            }
            info!("mqtt: session up at {} as '{}'", self.url, client_id);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.client.is_some() && SESSION_UP.load(Ordering::Acquire)
        }

        fn subscribe(&mut self, topic: &str) -> Result<()> {
            let client = self.client.as_mut().ok_or(Error::SubscribeFailed)?;
            client.subscribe(topic, QoS::AtMostOnce).map(|_| ()).map_err(|e| {
                warn!("mqtt: subscribe '{}' failed ({})", topic, e);
                Error::SubscribeFailed
            })
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
            let client = self.client.as_mut().ok_or(Error::PublishFailed)?;
            client
                .publish(topic, QoS::AtMostOnce, false, payload)
                .map(|_| ())
                .map_err(|e| {
                    warn!("mqtt: publish '{}' failed ({})", topic, e);
                    Error::PublishFailed
                })
        }

        fn poll(&mut self, max: usize, on_message: &mut dyn FnMut(&str, &[u8])) -> usize {
            INBOUND.drain(max, on_message)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host loopback transport
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::SimMqttTransport;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use log::info;

    use super::InboundQueue;
    use crate::app::ports::MqttTransport;
    use crate::error::{Error, Result};

    /// In-memory broker: a publish to a subscribed topic is delivered
    /// back through the inbound queue, like a real broker echo.
    pub struct SimMqttTransport {
        reachable: bool,
        connected: bool,
        connects: u32,
        subscriptions: Vec<String>,
        published: Vec<(String, Vec<u8>)>,
        inbound: InboundQueue,
    }

    impl Default for SimMqttTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SimMqttTransport {
        pub fn new() -> Self {
            Self {
                reachable: true,
                connected: false,
                connects: 0,
                subscriptions: Vec::new(),
                published: Vec::new(),
                inbound: InboundQueue::new(),
            }
        }

        pub fn sim_set_reachable(&mut self, reachable: bool) {
            self.reachable = reachable;
            if !reachable {
                self.connected = false;
            }
        }

        /// Deliver a message from another client.  Dropped unless subscribed.
        pub fn sim_deliver(&mut self, topic: &str, payload: &[u8]) -> bool {
            self.connected && self.subscriptions.iter().any(|s| s == topic) && self.inbound.push(topic, payload)
        }

        pub fn subscriptions(&self) -> &[String] {
            &self.subscriptions
        }

        pub fn published(&self) -> &[(String, Vec<u8>)] {
            &self.published
        }

        pub fn connects(&self) -> u32 {
            self.connects
        }

        pub fn pending(&self) -> usize {
            self.inbound.len()
        }
    }

    impl MqttTransport for SimMqttTransport {
        fn connect(&mut self, client_id: &str) -> Result<()> {
            self.connects += 1;
            // Clean session: nothing carries over.
            self.subscriptions.clear();
            self.inbound.clear();
            if !self.reachable {
                self.connected = false;
                return Err(Error::BrokerConnectFailed);
            }
            self.connected = true;
            info!("mqtt(sim): session up as '{}'", client_id);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn subscribe(&mut self, topic: &str) -> Result<()> {
            if !self.connected {
                return Err(Error::SubscribeFailed);
            }
            if !self.subscriptions.iter().any(|s| s == topic) {
                self.subscriptions.push(topic.to_owned());
            }
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
            if !self.connected {
                return Err(Error::PublishFailed);
            }
            self.published.push((topic.to_owned(), payload.to_vec()));
            if self.subscriptions.iter().any(|s| s == topic) {
                self.inbound.push(topic, payload);
            }
            Ok(())
        }

        fn poll(&mut self, max: usize, on_message: &mut dyn FnMut(&str, &[u8])) -> usize {
            self.inbound.drain(max, on_message)
        }
    }
}
