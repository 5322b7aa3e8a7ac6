//! Fuzz target: inbound MQTT message → queue → command router
//!
//! The first input byte picks the topic length; the rest is split into a
//! topic (lossy UTF-8) and a payload.  The message goes through the
//! bounded inbound queue and then `route()`.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A routed message always came in on one of the three exact bindings
//! - Payloads longer than the queue bound never reach the router
//!
//! cargo fuzz run fuzz_inbound_dispatch

#![no_main]

use libfuzzer_sys::fuzz_target;
use tempnode::adapters::mqtt::{InboundQueue, MAX_PAYLOAD_LEN};
use tempnode::app::router::route;
use tempnode::app::topics::TopicSet;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (topic_bytes, payload) = rest.split_at(split);
    let topic = String::from_utf8_lossy(topic_bytes);

    let queue = InboundQueue::new();
    let kept = queue.push(&topic, payload);
    assert!(!kept || payload.len() <= MAX_PAYLOAD_LEN);

    let topics = TopicSet::new("tempnode-efcafe").unwrap();
    while let Some(message) = queue.pop() {
        if let Ok((channel, _level)) = route(&topics, &message.topic, &message.payload) {
            assert_eq!(topics.command(channel), message.topic.as_str());
        }
    }
});
