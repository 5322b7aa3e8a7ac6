//! Integration tests for the messaging client in isolation.

use tempnode::app::codec::Level;
use tempnode::app::events::{AppEvent, LinkState};
use tempnode::app::messaging::MessagingClient;
use tempnode::app::router::CommandRouter;
use tempnode::app::topics::Channel;
use tempnode::error::Error;

use crate::mock_hw::{MockIndicator, MockTransport, Op, RecordingSink, Trace};

type Client = MessagingClient<MockTransport, CommandRouter<MockIndicator>>;

fn client(trace: &Trace) -> Client {
    MessagingClient::new(MockTransport::new(trace), CommandRouter::new(MockIndicator::default()))
}

#[test]
fn reconnect_requires_an_identity() {
    let trace = Trace::default();
    let mut c = client(&trace);
    assert_eq!(c.reconnect(), Err(Error::LinkUnavailable));
    assert!(trace.ops().is_empty());
}

#[test]
fn failed_handshake_leaves_session_down() {
    let trace = Trace::default();
    let mut c = client(&trace);
    c.transport_mut().fail_connects = 1;
    c.bind_identity("node").unwrap();

    assert_eq!(c.reconnect(), Err(Error::BrokerConnectFailed));
    assert_eq!(c.state(), LinkState::Disconnected);
    assert!(trace.subscriptions().is_empty());
}

#[test]
fn subscription_report_tracks_each_channel() {
    let trace = Trace::default();
    let mut c = client(&trace);
    c.transport_mut().refuse_subscribe.push("node/RGB-Led/Green".to_owned());
    c.bind_identity("node").unwrap();

    let report = c.reconnect().unwrap();
    assert!(c.is_connected());
    assert_eq!(report.subscribed(Channel::Red), Some(true));
    assert_eq!(report.subscribed(Channel::Green), Some(false));
    assert_eq!(report.subscribed(Channel::Blue), Some(true));
    assert_eq!(report.failures(), 1);
    assert!(!report.all_ok());
}

#[test]
fn publish_while_disconnected_never_reaches_transport() {
    let trace = Trace::default();
    let mut c = client(&trace);
    c.bind_identity("node").unwrap();
    assert_eq!(c.publish_telemetry(b"21"), Err(Error::LinkUnavailable));
    assert_eq!(c.publish("node/other", b"x"), Err(Error::LinkUnavailable));
    assert!(trace.publishes().is_empty());
}

#[test]
fn transport_drop_is_detected_lazily() {
    let trace = Trace::default();
    let mut c = client(&trace);
    c.bind_identity("node").unwrap();
    c.reconnect().unwrap();

    c.transport_mut().connected = false;
    assert_eq!(c.state(), LinkState::Connected);
    assert_eq!(c.refresh_state(), LinkState::Disconnected);
}

#[test]
fn rebinding_to_a_new_identity_drops_the_session() {
    let trace = Trace::default();
    let mut c = client(&trace);
    c.bind_identity("node").unwrap();
    c.reconnect().unwrap();

    c.bind_identity("node").unwrap();
    assert!(c.is_connected());

    c.bind_identity("renamed").unwrap();
    assert!(!c.is_connected());
    assert_eq!(c.topics().map(|t| t.telemetry()), Some("renamed/Temperature"));
}

#[test]
fn telemetry_goes_to_the_bound_topic() {
    let trace = Trace::default();
    let mut c = client(&trace);
    c.bind_identity("node").unwrap();
    c.reconnect().unwrap();
    c.publish_telemetry(b"-12").unwrap();
    assert_eq!(trace.ops().last(), Some(&Op::Publish("node/Temperature".to_owned(), b"-12".to_vec())));
}

#[test]
fn service_inbound_dispatches_and_reports() {
    let trace = Trace::default();
    let mut c = client(&trace);
    let mut sink = RecordingSink::default();
    c.bind_identity("node").unwrap();
    c.reconnect().unwrap();

    c.transport_mut().deliver("node/RGB-Led/Blue", b"true");
    c.transport_mut().deliver("node/Temperature", b"21");
    assert_eq!(c.service_inbound(&mut sink), 2);
    assert_eq!(c.service_inbound(&mut sink), 0);

    assert_eq!(
        sink.events,
        vec![
            AppEvent::CommandApplied { channel: Channel::Blue, level: Level::ON },
            AppEvent::CommandRejected { error: Error::UnrecognizedTopic },
        ]
    );
}

#[test]
fn messages_before_binding_are_rejected() {
    let trace = Trace::default();
    let mut c = client(&trace);
    let mut sink = RecordingSink::default();
    c.transport_mut().deliver("node/RGB-Led/Red", b"1");
    assert_eq!(c.service_inbound(&mut sink), 1);
    assert_eq!(sink.events, vec![AppEvent::CommandRejected { error: Error::UnrecognizedTopic }]);
}

#[test]
fn failed_publish_drops_the_session_even_if_transport_reports_up() {
    let trace = Trace::default();
    let mut c = client(&trace);
    c.bind_identity("node").unwrap();
    c.reconnect().unwrap();
    c.transport_mut().fail_publish = true;

    assert_eq!(c.publish_telemetry(b"21"), Err(Error::PublishFailed));
    assert!(c.transport().connected);
    assert_eq!(c.state(), LinkState::Disconnected);
    // No further sends until a reconnect.
    assert_eq!(c.publish_telemetry(b"21"), Err(Error::LinkUnavailable));

    c.transport_mut().fail_publish = false;
    c.reconnect().unwrap();
    c.publish_telemetry(b"22").unwrap();
    assert_eq!(trace.publishes().len(), 1);
}
