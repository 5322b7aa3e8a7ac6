//! Integration tests for the control loop: pacing, blocking reconnect,
//! resubscription and inbound command dispatch, all against mocks.

use tempnode::app::codec::Level;
use tempnode::app::control::ControlLoop;
use tempnode::app::events::{AppEvent, LinkState};
use tempnode::app::messaging::{MAX_INBOUND_PER_SERVICE, MessagingClient};
use tempnode::app::ports::IndicatorPort;
use tempnode::app::retry::{Bounded, FixedBackoff};
use tempnode::app::router::CommandRouter;
use tempnode::app::topics::Channel;
use tempnode::config::NodeConfig;
use tempnode::error::Error;

use crate::mock_hw::{MockDelay, MockIndicator, MockNetwork, MockSensor, MockTransport, Op, RecordingSink, Trace};

const ID: &str = "tempnode-aabbcc";
const RED: &str = "tempnode-aabbcc/RGB-Led/Red";
const GREEN: &str = "tempnode-aabbcc/RGB-Led/Green";
const BLUE: &str = "tempnode-aabbcc/RGB-Led/Blue";
const TEMPERATURE: &str = "tempnode-aabbcc/Temperature";

type Node<R = FixedBackoff> =
    ControlLoop<MockNetwork, MockTransport, CommandRouter<MockIndicator>, MockSensor, MockDelay, RecordingSink, R>;

fn config(every_ticks: u32) -> NodeConfig {
    NodeConfig {
        telemetry_every_ticks: every_ticks,
        ..NodeConfig::default()
    }
}

fn build<R>(trace: &Trace, cfg: &NodeConfig, transport: MockTransport, celsius: i8, retry: R) -> Node<R>
where
    R: tempnode::app::retry::RetryPolicy,
{
    ControlLoop::new(
        cfg,
        MockNetwork::new(trace, ID),
        MessagingClient::new(transport, CommandRouter::new(MockIndicator::default())),
        MockSensor::new(celsius),
        MockDelay::new(trace),
        RecordingSink::default(),
        retry,
    )
}

/// Node after `setup()`, broker not yet contacted, trace cleared.
fn ready_node(trace: &Trace, cfg: &NodeConfig, transport: MockTransport, celsius: i8) -> Node {
    let mut node = build(trace, cfg, transport, celsius, FixedBackoff::new(cfg.reconnect_backoff_ms));
    node.setup();
    trace.clear();
    node
}

fn levels(node: &Node) -> [Level; 3] {
    let ind = node.client().handler().indicator();
    [ind.level(Channel::Red), ind.level(Channel::Green), ind.level(Channel::Blue)]
}

// ── Setup ─────────────────────────────────────────────────────

#[test]
fn setup_binds_identity_before_any_broker_traffic() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut node = build(&trace, &cfg, MockTransport::new(&trace), 21, FixedBackoff::new(10_000));
    node.setup();

    assert_eq!(trace.ops(), vec![Op::LinkConnect]);
    assert_eq!(node.client().topics().map(|t| t.telemetry()), Some(TEMPERATURE));
    assert!(node.sink().events.iter().any(|e| matches!(e, AppEvent::Online { identity } if identity == ID)));
}

#[test]
fn setup_retries_link_until_up() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut node = build(&trace, &cfg, MockTransport::new(&trace), 21, FixedBackoff::new(10_000));
    node.network_mut().fail_connects = 2;
    node.setup();

    assert_eq!(
        trace.ops(),
        vec![
            Op::LinkConnect,
            Op::Sleep(10_000),
            Op::LinkConnect,
            Op::Sleep(10_000),
            Op::LinkConnect,
        ]
    );
    assert!(node.client().topics().is_some());
}

#[test]
fn online_is_reported_once_per_bound_identity() {
    let trace = Trace::default();
    let cfg = config(1);
    let mut node = build(&trace, &cfg, MockTransport::new(&trace), 21, Bounded::new(FixedBackoff::new(10_000), 2));
    node.setup();
    node.step();

    node.network_mut().connected = false;
    node.network_mut().identity = Some("tempnode-ddeeff".to_owned());
    node.client_mut().transport_mut().connected = false;
    node.step();

    let online = |node: &Node<Bounded<FixedBackoff>>| {
        node.sink()
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Online { identity } => Some(identity.as_str().to_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(online(&node), vec![ID.to_owned(), "tempnode-ddeeff".to_owned()]);

    // An identity too long to bind is refused and never reported.
    node.network_mut().connected = false;
    node.network_mut().identity = Some("n".repeat(40));
    node.client_mut().transport_mut().connected = false;
    assert!(matches!(node.ensure_connected(), Err(Error::Config(_))));
    assert_eq!(online(&node).len(), 2);
}

// ── Pacing ────────────────────────────────────────────────────

#[test]
fn telemetry_on_first_tick_then_once_per_period() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);

    let boundaries: Vec<bool> = (0..9).map(|_| node.step()).collect();
    assert_eq!(boundaries, vec![true, false, false, false, true, false, false, false, true]);

    let publishes = trace.publishes();
    assert_eq!(publishes.len(), 3);
    assert!(publishes.iter().all(|(t, p)| t == TEMPERATURE && p == b"21"));
    // Every iteration ends with exactly one tick sleep.
    assert_eq!(trace.sleeps(), vec![cfg.loop_tick_ms; 9]);
}

#[test]
fn negative_temperature_is_published_as_decimal_text() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), -7);
    node.step();
    assert_eq!(trace.publishes(), vec![(TEMPERATURE.to_owned(), b"-7".to_vec())]);
}

#[test]
fn status_report_precedes_publish() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();

    let events = &node.sink().events;
    let status = events.iter().position(|e| matches!(e, AppEvent::Status(_))).unwrap();
    let published = events
        .iter()
        .position(|e| matches!(e, AppEvent::TelemetryPublished { temperature_c: 21 }))
        .unwrap();
    assert!(status < published);

    let AppEvent::Status(report) = &events[status] else { unreachable!() };
    assert_eq!(report.network, LinkState::Connected);
    assert_eq!(report.broker, LinkState::Disconnected);
    assert_eq!(report.signal_dbm, Some(-55));
    assert_eq!(report.temperature_c, 21);
}

// ── Blocking reconnect ────────────────────────────────────────

#[test]
fn unreachable_broker_is_retried_at_fixed_backoff_without_publishing() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut transport = MockTransport::new(&trace);
    transport.fail_connects = 3;
    let mut node = ready_node(&trace, &cfg, transport, 21);

    node.step();

    assert_eq!(
        trace.ops(),
        vec![
            Op::BrokerConnect { ok: false },
            Op::Sleep(10_000),
            Op::BrokerConnect { ok: false },
            Op::Sleep(10_000),
            Op::BrokerConnect { ok: false },
            Op::Sleep(10_000),
            Op::BrokerConnect { ok: true },
            Op::Subscribe(RED.to_owned()),
            Op::Subscribe(GREEN.to_owned()),
            Op::Subscribe(BLUE.to_owned()),
            Op::Publish(TEMPERATURE.to_owned(), b"21".to_vec()),
            Op::Sleep(cfg.loop_tick_ms),
        ]
    );

    let sink = node.sink();
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ReconnectFailed { retry_in_ms: 10_000, error: Error::BrokerConnectFailed, .. })),
        3
    );
    assert_eq!(sink.count(|e| matches!(e, AppEvent::BrokerConnected { attempts: 4 })), 1);
}

#[test]
fn broker_session_name_is_the_node_identity() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();
    assert_eq!(node.client().transport().client_ids, vec![ID.to_owned()]);
}

#[test]
fn every_reconnect_resubscribes_all_three_bindings_once() {
    let trace = Trace::default();
    let cfg = config(2);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);

    node.step();
    node.step();
    // Broker drops the session between passes.
    node.client_mut().transport_mut().connected = false;
    node.step();

    let subs = trace.subscriptions();
    assert_eq!(subs, vec![RED, GREEN, BLUE, RED, GREEN, BLUE]);
    assert_eq!(node.client().transport().connect_calls, 2);
    assert_eq!(trace.publishes().len(), 2);
}

#[test]
fn refused_subscription_does_not_block_the_others_or_telemetry() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut transport = MockTransport::new(&trace);
    transport.refuse_subscribe.push(GREEN.to_owned());
    let mut node = ready_node(&trace, &cfg, transport, 21);

    node.step();

    assert_eq!(trace.subscriptions(), vec![RED, GREEN, BLUE]);
    assert_eq!(trace.publishes().len(), 1);
}

#[test]
fn link_loss_reconnects_network_before_broker() {
    let trace = Trace::default();
    let cfg = config(1);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();
    trace.clear();

    // Both the access point and the broker session went away.
    node.network_mut().connected = false;
    node.client_mut().transport_mut().connected = false;
    node.step();

    let ops = trace.ops();
    assert_eq!(ops[0], Op::LinkConnect);
    assert_eq!(ops[1], Op::BrokerConnect { ok: true });
    assert_eq!(trace.publishes().len(), 1);
}

#[test]
fn link_that_stays_down_blocks_without_publishing() {
    let trace = Trace::default();
    let cfg = config(1);
    let mut node = build(&trace, &cfg, MockTransport::new(&trace), 21, Bounded::new(FixedBackoff::new(10_000), 3));
    node.setup();
    node.network_mut().connected = false;
    node.network_mut().fail_connects = u32::MAX;
    trace.clear();

    node.step();

    assert_eq!(
        trace.ops(),
        vec![
            Op::LinkConnect,
            Op::Sleep(10_000),
            Op::LinkConnect,
            Op::Sleep(10_000),
            Op::LinkConnect,
            Op::Sleep(cfg.loop_tick_ms),
        ]
    );
    assert_eq!(
        node.sink().count(|e| matches!(e, AppEvent::ReconnectFailed { error: Error::LinkUnavailable, .. })),
        2
    );
}

#[test]
fn bounded_policy_gives_up_and_drops_the_sample() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut transport = MockTransport::new(&trace);
    transport.fail_connects = u32::MAX;
    let mut node = build(&trace, &cfg, transport, 21, Bounded::new(FixedBackoff::new(10_000), 2));
    node.setup();
    trace.clear();

    assert!(node.step());

    assert_eq!(
        trace.ops(),
        vec![
            Op::BrokerConnect { ok: false },
            Op::Sleep(10_000),
            Op::BrokerConnect { ok: false },
            Op::Sleep(cfg.loop_tick_ms),
        ]
    );
    assert_eq!(
        node.sink().count(|e| matches!(e, AppEvent::TelemetryDropped { temperature_c: 21, error: Error::BrokerConnectFailed })),
        1
    );
    // The loop keeps running.
    assert!(!node.step());
}

#[test]
fn failed_publish_is_not_retried_until_next_period() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();
    node.client_mut().transport_mut().fail_publish = true;
    for _ in 0..4 {
        node.step();
    }
    assert_eq!(
        node.sink().count(|e| matches!(e, AppEvent::TelemetryDropped { error: Error::PublishFailed, .. })),
        1
    );
    assert!(!node.client().is_connected());
}

#[test]
fn rejected_publish_on_live_session_forces_reconnect_next_period() {
    let trace = Trace::default();
    let cfg = config(2);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();
    node.step();

    // Transport still reports the session up but refuses the send.
    node.client_mut().transport_mut().fail_publish = true;
    node.step();
    assert!(node.client().transport().connected);
    assert_eq!(node.client().state(), LinkState::Disconnected);

    node.client_mut().transport_mut().fail_publish = false;
    trace.clear();
    node.step();
    node.step();

    assert_eq!(node.client().transport().connect_calls, 2);
    assert_eq!(trace.subscriptions(), vec![RED, GREEN, BLUE]);
    assert_eq!(trace.publishes().len(), 1);
    assert!(node.client().is_connected());
}

// ── Inbound dispatch ──────────────────────────────────────────

#[test]
fn red_command_changes_only_red() {
    let trace = Trace::default();
    let cfg = config(4);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();

    node.client_mut().transport_mut().deliver(RED, b"1");
    node.step();

    assert_eq!(levels(&node), [Level::ON, Level::OFF, Level::OFF]);
    assert_eq!(node.client().handler().indicator().writes, vec![(Channel::Red, Level::ON)]);
    assert_eq!(
        node.sink().count(|e| matches!(e, AppEvent::CommandApplied { channel: Channel::Red, .. })),
        1
    );
}

#[test]
fn inbound_is_serviced_on_non_boundary_ticks() {
    let trace = Trace::default();
    let cfg = config(240);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    assert!(node.step());

    node.client_mut().transport_mut().deliver(BLUE, b"on");
    assert!(!node.step());
    assert_eq!(levels(&node), [Level::OFF, Level::OFF, Level::ON]);
}

#[test]
fn unknown_topic_and_malformed_payload_leave_state_unchanged() {
    let trace = Trace::default();
    let cfg = config(240);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();

    let transport = node.client_mut().transport_mut();
    transport.deliver("tempnode-aabbcc/RGB-Led/Purple", b"1");
    transport.deliver("someone-else/RGB-Led/Red", b"1");
    transport.deliver(GREEN, b"maybe");
    transport.deliver(GREEN, b"");
    node.step();

    assert_eq!(levels(&node), [Level::OFF; 3]);
    assert!(node.client().handler().indicator().writes.is_empty());
    let sink = node.sink();
    assert_eq!(sink.count(|e| matches!(e, AppEvent::CommandRejected { error: Error::UnrecognizedTopic })), 2);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::CommandRejected { error: Error::MalformedCommand })), 2);
}

#[test]
fn service_is_bounded_per_iteration() {
    let trace = Trace::default();
    let cfg = config(240);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();

    for i in 0..12u8 {
        let payload = if i % 2 == 0 { b"1" } else { b"0" };
        node.client_mut().transport_mut().deliver(RED, payload);
    }
    node.step();
    assert_eq!(node.client().handler().indicator().writes.len(), MAX_INBOUND_PER_SERVICE);
    assert_eq!(node.client().transport().inbound.len(), 12 - MAX_INBOUND_PER_SERVICE);

    node.step();
    assert_eq!(node.client().handler().indicator().writes.len(), 12);
    // Last message was "0".
    assert_eq!(levels(&node)[0], Level::OFF);
}

#[test]
fn commands_apply_in_arrival_order() {
    let trace = Trace::default();
    let cfg = config(240);
    let mut node = ready_node(&trace, &cfg, MockTransport::new(&trace), 21);
    node.step();

    let transport = node.client_mut().transport_mut();
    transport.deliver(GREEN, b"1");
    transport.deliver(GREEN, b"0");
    transport.deliver(BLUE, b"128");
    node.step();

    assert_eq!(
        node.client().handler().indicator().writes,
        vec![(Channel::Green, Level::ON), (Channel::Green, Level::OFF), (Channel::Blue, Level(128))]
    );
}
