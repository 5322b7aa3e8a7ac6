//! Messaging client: broker session state on top of an [`MqttTransport`].
//!
//! ```text
//!                reconnect() ok
//!   Disconnected ─────────────────▶ Connected
//!        ▲                              │
//!        └──────────────────────────────┘
//!     publish / subscribe / service reports the session down
//! ```
//!
//! Subscriptions do not survive a reconnect: every successful
//! [`reconnect`](MessagingClient::reconnect) subscribes to all command
//! bindings again, each one independently.
//!
//! Inbound messages are handed to the registered [`InboundHandler`] from
//! inside [`service_inbound`](MessagingClient::service_inbound).  The
//! handler only ever sees the topic bindings, never the transport, so it
//! cannot reconnect or publish from within dispatch.

use log::{info, warn};

use super::events::{AppEvent, LinkState};
use super::ports::{EventSink, MqttTransport};
use super::router::InboundHandler;
use super::topics::{Channel, TopicSet};
use crate::error::{Error, Result};

/// Most inbound messages handled by one `service_inbound` call.
pub const MAX_INBOUND_PER_SERVICE: usize = 8;

/// Outcome of the subscriptions made by one successful reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionReport {
    results: [Option<bool>; 3],
}

impl SubscriptionReport {
    fn record(&mut self, channel: Channel, ok: bool) {
        self.results[channel.index()] = Some(ok);
    }

    /// `None` if no subscription was attempted for `channel`.
    pub fn subscribed(&self, channel: Channel) -> Option<bool> {
        self.results[channel.index()]
    }

    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|r| *r == Some(true))
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| **r == Some(false)).count()
    }
}

pub struct MessagingClient<T, H> {
    transport: T,
    handler: H,
    topics: Option<TopicSet>,
    state: LinkState,
}

impl<T: MqttTransport, H: InboundHandler> MessagingClient<T, H> {
    pub fn new(transport: T, handler: H) -> Self {
        Self {
            transport,
            handler,
            topics: None,
            state: LinkState::Disconnected,
        }
    }

    // ── Topic bindings ────────────────────────────────────────

    /// (Re)build the bindings for `identity`.  A changed identity drops the
    /// session so the next reconnect subscribes to the new topics.
    pub fn bind_identity(&mut self, identity: &str) -> Result<()> {
        if self.topics.as_ref().is_some_and(|t| t.identity() == identity) {
            return Ok(());
        }
        let topics = TopicSet::new(identity)?;
        info!("mqtt: topics bound to '{}'", identity);
        if self.topics.is_some() {
            self.state = LinkState::Disconnected;
        }
        self.topics = Some(topics);
        Ok(())
    }

    pub fn topics(&self) -> Option<&TopicSet> {
        self.topics.as_ref()
    }

    // ── State ─────────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Lazy disconnect detection: trust the transport's view once it
    /// reports the session gone.  Returns the refreshed state.
    pub fn refresh_state(&mut self) -> LinkState {
        if self.state.is_connected() && !self.transport.is_connected() {
            warn!("mqtt: broker session lost");
            self.state = LinkState::Disconnected;
        }
        self.state
    }

    // ── Operations ────────────────────────────────────────────

    /// One handshake using the Node Identity as session name, then one
    /// subscription per command binding.
    pub fn reconnect(&mut self) -> Result<SubscriptionReport> {
        let Some(topics) = self.topics.as_ref() else {
            return Err(Error::LinkUnavailable);
        };

        if let Err(e) = self.transport.connect(topics.identity()) {
            self.state = LinkState::Disconnected;
            warn!("mqtt: connect as '{}' failed: {}", topics.identity(), e);
            return Err(Error::BrokerConnectFailed);
        }
        self.state = LinkState::Connected;
        info!("mqtt: connected as '{}'", topics.identity());

        let mut report = SubscriptionReport::default();
        for (channel, topic) in topics.commands() {
            match self.transport.subscribe(topic) {
                Ok(()) => {
                    info!("mqtt: subscribed '{}'", topic);
                    report.record(channel, true);
                }
                Err(e) => {
                    warn!("mqtt: subscribe '{}' failed: {}", topic, e);
                    report.record(channel, false);
                }
            }
        }
        Ok(report)
    }

    fn ensure_ready(&mut self) -> Result<()> {
        if self.refresh_state().is_connected() {
            Ok(())
        } else {
            Err(Error::LinkUnavailable)
        }
    }

    /// Send one message.  Never retried here; a rejected send drops the
    /// session so the next pass reconnects.
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        let sent = send(&mut self.transport, topic, payload);
        self.mark_down_on_failure(sent)
    }

    /// Publish on the telemetry binding.
    pub fn publish_telemetry(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        let topic = self.topics.as_ref().ok_or(Error::LinkUnavailable)?.telemetry();
        let sent = send(&mut self.transport, topic, payload);
        self.mark_down_on_failure(sent)
    }

    fn mark_down_on_failure(&mut self, sent: Result<()>) -> Result<()> {
        if sent.is_err() && self.state.is_connected() {
            warn!("mqtt: marking session down after failed publish");
            self.state = LinkState::Disconnected;
        }
        sent
    }

    /// Pump the transport and dispatch pending inbound messages.
    ///
    /// Handles at most [`MAX_INBOUND_PER_SERVICE`] messages and never
    /// waits for new ones.  Returns the number delivered.
    pub fn service_inbound(&mut self, sink: &mut impl EventSink) -> usize {
        let topics = self.topics.as_ref();
        let handler = &mut self.handler;
        let delivered = self
            .transport
            .poll(MAX_INBOUND_PER_SERVICE, &mut |topic: &str, payload: &[u8]| {
                Self::dispatch(&mut *handler, topics, topic, payload, &mut *sink);
            });
        self.refresh_state();
        delivered
    }

    /// Forward one delivered message to the handler and report the outcome.
    pub fn dispatch(
        handler: &mut H,
        topics: Option<&TopicSet>,
        topic: &str,
        payload: &[u8],
        sink: &mut impl EventSink,
    ) {
        let outcome = match topics {
            Some(t) => handler.on_message(t, topic, payload),
            None => Err(Error::UnrecognizedTopic),
        };
        match outcome {
            Ok((channel, level)) => sink.emit(&AppEvent::CommandApplied { channel, level }),
            Err(error) => sink.emit(&AppEvent::CommandRejected { error }),
        }
    }
}

fn send<T: MqttTransport>(transport: &mut T, topic: &str, payload: &[u8]) -> Result<()> {
    transport.publish(topic, payload).map_err(|e| {
        warn!("mqtt: publish '{}' failed: {}", topic, e);
        Error::PublishFailed
    })
}
