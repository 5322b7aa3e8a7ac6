//! Topic bindings: logical channels mapped onto concrete MQTT topics.
//!
//! Every topic is namespaced by the Node Identity:
//!
//! ```text
//!   <identity>/Temperature      telemetry (publish)
//!   <identity>/RGB-Led/Red      command   (subscribe)
//!   <identity>/RGB-Led/Green    command   (subscribe)
//!   <identity>/RGB-Led/Blue     command   (subscribe)
//! ```
//!
//! The identity is only known once the network session is up, so a
//! [`TopicSet`] is built at that point and rebuilt if the identity changes.

use core::fmt::Write;

use crate::error::{Error, Result};

pub const TELEMETRY_SUFFIX: &str = "/Temperature";
pub const RED_SUFFIX: &str = "/RGB-Led/Red";
pub const GREEN_SUFFIX: &str = "/RGB-Led/Green";
pub const BLUE_SUFFIX: &str = "/RGB-Led/Blue";

/// Maximum length of a Node Identity.
pub const MAX_IDENTITY_LEN: usize = 32;
/// Maximum length of any topic string (identity + longest suffix fits).
pub const MAX_TOPIC_LEN: usize = 64;

pub type Identity = heapless::String<MAX_IDENTITY_LEN>;
pub type Topic = heapless::String<MAX_TOPIC_LEN>;

/// One indicator colour channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Red => RED_SUFFIX,
            Self::Green => GREEN_SUFFIX,
            Self::Blue => BLUE_SUFFIX,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

/// Concrete topics for one Node Identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    identity: Identity,
    telemetry: Topic,
    commands: [Topic; 3],
}

fn join(identity: &str, suffix: &str) -> Result<Topic> {
    let mut topic = Topic::new();
    write!(topic, "{identity}{suffix}").map_err(|_| Error::Config("identity too long for topic"))?;
    Ok(topic)
}

impl TopicSet {
    /// Build every binding for `identity`.
    pub fn new(identity: &str) -> Result<Self> {
        if identity.is_empty() {
            return Err(Error::Config("identity must not be empty"));
        }
        let mut id = Identity::new();
        id.push_str(identity)
            .map_err(|_| Error::Config("identity longer than 32 bytes"))?;

        Ok(Self {
            telemetry: join(identity, TELEMETRY_SUFFIX)?,
            commands: [
                join(identity, RED_SUFFIX)?,
                join(identity, GREEN_SUFFIX)?,
                join(identity, BLUE_SUFFIX)?,
            ],
            identity: id,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn telemetry(&self) -> &str {
        &self.telemetry
    }

    pub fn command(&self, channel: Channel) -> &str {
        &self.commands[channel.index()]
    }

    /// Every command binding, in channel order.
    pub fn commands(&self) -> impl Iterator<Item = (Channel, &str)> {
        Channel::ALL.into_iter().map(|c| (c, self.command(c)))
    }

    /// Exact match of an inbound topic against the command bindings.
    pub fn channel_for(&self, topic: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|&c| self.command(c) == topic)
    }
}
