//! RGB indicator driver.
//!
//! One [`ChannelDriver`] per colour, each over an
//! [`embedded_hal::digital::OutputPin`].  Outputs are binary: any non-zero
//! [`Level`] switches the channel on.  `active_low` inverts the pin for
//! common-anode LEDs.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `esp_idf_hal::gpio::PinDriver` output pins.
//! On host/test: any `OutputPin` (the tests use an in-memory pin).

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::codec::Level;
use crate::app::ports::IndicatorPort;
use crate::app::topics::Channel;
use crate::error::{Error, Result};

pub struct ChannelDriver<P> {
    pin: P,
    active_low: bool,
    level: Level,
}

impl<P: OutputPin> ChannelDriver<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self {
            pin,
            active_low,
            level: Level::OFF,
        }
    }

    /// Drive the pin for `level`.  On failure the recorded level is kept.
    pub fn apply(&mut self, level: Level) -> Result<()> {
        let high = level.is_on() != self.active_low;
        let written = if high { self.pin.set_high() } else { self.pin.set_low() };
        written.map_err(|_| Error::Actuator)?;
        self.level = level;
        Ok(())
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

pub struct RgbIndicator<R, G, B> {
    red: ChannelDriver<R>,
    green: ChannelDriver<G>,
    blue: ChannelDriver<B>,
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> RgbIndicator<R, G, B> {
    pub fn new(red: R, green: G, blue: B, active_low: bool) -> Self {
        Self {
            red: ChannelDriver::new(red, active_low),
            green: ChannelDriver::new(green, active_low),
            blue: ChannelDriver::new(blue, active_low),
        }
    }

    /// Switch every channel off (boot state).
    pub fn all_off(&mut self) {
        for channel in Channel::ALL {
            if let Err(e) = self.set_level(channel, Level::OFF) {
                warn!("indicator: {:?} off failed: {}", channel, e);
            }
        }
    }

    pub fn red(&self) -> &ChannelDriver<R> {
        &self.red
    }

    pub fn green(&self) -> &ChannelDriver<G> {
        &self.green
    }

    pub fn blue(&self) -> &ChannelDriver<B> {
        &self.blue
    }
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> IndicatorPort for RgbIndicator<R, G, B> {
    fn set_level(&mut self, channel: Channel, level: Level) -> Result<()> {
        match channel {
            Channel::Red => self.red.apply(level),
            Channel::Green => self.green.apply(level),
            Channel::Blue => self.blue.apply(level),
        }
    }

    fn level(&self, channel: Channel) -> Level {
        match channel {
            Channel::Red => self.red.level(),
            Channel::Green => self.green.level(),
            Channel::Blue => self.blue.level(),
        }
    }
}
