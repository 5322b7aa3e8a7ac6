//! Command Router: inbound message → indicator channel.
//!
//! Matches the topic exactly against the command bindings, decodes the
//! payload (see [`codec`](super::codec)) and drives the matching channel.
//! Nothing here panics or propagates past the messaging client: every
//! failure is returned as a value, logged, and dropped by the caller.

use log::{debug, warn};

use super::codec::{Level, decode_command};
use super::ports::IndicatorPort;
use super::topics::{Channel, TopicSet};
use crate::error::{Error, Result};

/// Handler registered once with the messaging client and invoked
/// synchronously for every delivered message.
pub trait InboundHandler {
    fn on_message(&mut self, topics: &TopicSet, topic: &str, payload: &[u8]) -> Result<(Channel, Level)>;
}

/// Resolve a message to its target without side effects.
pub fn route(topics: &TopicSet, topic: &str, payload: &[u8]) -> Result<(Channel, Level)> {
    let channel = topics.channel_for(topic).ok_or(Error::UnrecognizedTopic)?;
    let level = decode_command(payload)?;
    Ok((channel, level))
}

/// Routes commands onto an owned indicator.
pub struct CommandRouter<I> {
    indicator: I,
}

impl<I: IndicatorPort> CommandRouter<I> {
    pub fn new(indicator: I) -> Self {
        Self { indicator }
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn indicator_mut(&mut self) -> &mut I {
        &mut self.indicator
    }
}

impl<I: IndicatorPort> InboundHandler for CommandRouter<I> {
    fn on_message(&mut self, topics: &TopicSet, topic: &str, payload: &[u8]) -> Result<(Channel, Level)> {
        let (channel, level) = match route(topics, topic, payload) {
            Ok(target) => target,
            Err(Error::UnrecognizedTopic) => {
                debug!("router: ignoring message on '{}'", topic);
                return Err(Error::UnrecognizedTopic);
            }
            Err(e) => {
                warn!("router: {} on '{}' ({} bytes: {:02x?})", e, topic, payload.len(), payload);
                return Err(e);
            }
        };
        self.indicator.set_level(channel, level)?;
        debug!("router: {:?} -> {}", channel, level.0);
        Ok((channel, level))
    }
}
