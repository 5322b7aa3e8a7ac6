//! Wire encodings for telemetry and command payloads.
//!
//! Telemetry: decimal ASCII of a one-byte signed temperature, e.g. `-7`,
//! `23`, `127`.  No terminator is sent.
//!
//! Commands (after trimming ASCII whitespace):
//!
//! | Payload                         | Level        |
//! |---------------------------------|--------------|
//! | raw byte `0x00` / `0x01`        | off / on     |
//! | `0` / `1`                       | off / on     |
//! | `off` `on` `false` `true` (any case) | off / on |
//! | decimal `0..=255`               | intensity    |
//!
//! Anything else is [`Error::MalformedCommand`].

use core::fmt::Write;

use crate::error::{Error, Result};

/// Sign + 3 digits, plus one byte of headroom for a C-string terminator.
pub type TemperaturePayload = heapless::String<5>;

/// Longest command payload accepted.
pub const MAX_COMMAND_LEN: usize = 8;

/// Output level for one indicator channel (0 = off, 255 = full).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(pub u8);

impl Level {
    pub const OFF: Self = Self(0);
    pub const ON: Self = Self(u8::MAX);

    pub const fn is_on(self) -> bool {
        self.0 > 0
    }
}

/// Encode one temperature sample for publication.
pub fn encode_temperature(celsius: i8) -> TemperaturePayload {
    let mut out = TemperaturePayload::new();
    // "-128" is the longest value and always fits.
    let _ = write!(out, "{celsius}");
    out
}

/// Parse a telemetry payload back into a sample.
pub fn decode_temperature(payload: &[u8]) -> Option<i8> {
    core::str::from_utf8(payload).ok()?.trim().parse().ok()
}

/// Decode a command payload into an indicator level.
pub fn decode_command(payload: &[u8]) -> Result<Level> {
    match payload {
        [0x00] => return Ok(Level::OFF),
        [0x01] => return Ok(Level::ON),
        _ => {}
    }
    if payload.len() > MAX_COMMAND_LEN {
        return Err(Error::MalformedCommand);
    }
    let text = core::str::from_utf8(payload)
        .map_err(|_| Error::MalformedCommand)?
        .trim();
    if text.is_empty() {
        return Err(Error::MalformedCommand);
    }

    if text.eq_ignore_ascii_case("on") || text.eq_ignore_ascii_case("true") || text == "1" {
        return Ok(Level::ON);
    }
    if text.eq_ignore_ascii_case("off") || text.eq_ignore_ascii_case("false") || text == "0" {
        return Ok(Level::OFF);
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedCommand);
    }
    text.parse::<u8>()
        .map(Level)
        .map_err(|_| Error::MalformedCommand)
}
