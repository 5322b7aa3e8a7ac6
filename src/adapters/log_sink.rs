//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Each line starts with a fixed tag so serial captures can be grepped.

use log::{info, warn};

use crate::app::events::{AppEvent, LinkState};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn up_down(state: LinkState) -> &'static str {
    if state.is_connected() { "up" } else { "down" }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Online { identity } => {
                info!("NET   | online as {}", identity);
            }
            AppEvent::Status(s) => match s.signal_dbm {
                Some(dbm) => info!(
                    "STATUS | wifi={} ({} dBm) | mqtt={} | T={}\u{00b0}C",
                    up_down(s.network),
                    dbm,
                    up_down(s.broker),
                    s.temperature_c,
                ),
                None => info!(
                    "STATUS | wifi={} | mqtt={} | T={}\u{00b0}C",
                    up_down(s.network),
                    up_down(s.broker),
                    s.temperature_c,
                ),
            },
            AppEvent::ReconnectFailed { attempt, error, retry_in_ms } => {
                warn!("MQTT  | attempt {} failed ({}), retry in {} ms", attempt, error, retry_in_ms);
            }
            AppEvent::BrokerConnected { attempts } => {
                info!("MQTT  | connected after {} attempt(s)", attempts);
            }
            AppEvent::TelemetryPublished { temperature_c } => {
                info!("TELEM | {}\u{00b0}C published", temperature_c);
            }
            AppEvent::TelemetryDropped { temperature_c, error } => {
                warn!("TELEM | {}\u{00b0}C dropped: {}", temperature_c, error);
            }
            AppEvent::CommandApplied { channel, level } => {
                info!("CMD   | {:?} <- {}", channel, level.0);
            }
            AppEvent::CommandRejected { error } => {
                warn!("CMD   | ignored: {}", error);
            }
        }
    }
}
