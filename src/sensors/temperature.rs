//! On-die temperature sensor (ESP32-S2/S3/C-series `temperature_sensor`
//! peripheral; the classic ESP32 has none).
//!
//! Reports whole degrees Celsius as `i8`.  Readings are rounded to the
//! nearest degree and saturate at the `i8` bounds; a failed read yields
//! the last good value.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: the `temperature_sensor` driver (installed once in
//! [`OnDieTemperature::install`], range -10..80 C).
//! On host/test: reads from a static `AtomicI8` for injection.

use core::sync::atomic::{AtomicBool, AtomicI8, Ordering};

use log::warn;

use crate::app::ports::SensorPort;
use crate::error::{Error, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

static SIM_TEMPERATURE_C: AtomicI8 = AtomicI8::new(21);
static SIM_FAIL_NEXT_READ: AtomicBool = AtomicBool::new(false);

/// Inject the next host-side reading.
pub fn sim_set_temperature(celsius: i8) {
    SIM_TEMPERATURE_C.store(celsius, Ordering::Relaxed);
}

/// Make the next host-side read fail once.
pub fn sim_fail_next_read() {
    SIM_FAIL_NEXT_READ.store(true, Ordering::Relaxed);
}

/// Round to the nearest degree and clamp into `i8`.  NaN maps to 0.
pub fn to_whole_celsius(celsius: f32) -> i8 {
    if celsius.is_nan() {
        return 0;
    }
    let rounded = if celsius >= 0.0 { celsius + 0.5 } else { celsius - 0.5 };
    // `as` saturates float-to-int conversions.
    rounded as i8
}

pub struct OnDieTemperature {
    #[cfg(target_os = "espidf")]
    handle: temperature_sensor_handle_t,
    last_good: i8,
}

impl OnDieTemperature {
    #[cfg(target_os = "espidf")]
    pub fn install() -> Result<Self> {
        let config = temperature_sensor_config_t {
            range_min: -10,
            range_max: 80,
            ..Default::default()
        };
        let mut handle: temperature_sensor_handle_t = core::ptr::null_mut();
        let ret = unsafe { temperature_sensor_install(&config, &mut handle) };
        if ret != ESP_OK {
            return Err(Error::Init("temperature_sensor_install"));
        }
        let ret = unsafe { temperature_sensor_enable(handle) };
        if ret != ESP_OK {
            return Err(Error::Init("temperature_sensor_enable"));
        }
        Ok(Self { handle, last_good: 0 })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn install() -> Result<Self> {
        Ok(Self { last_good: 0 })
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&self) -> Result<f32> {
        let mut celsius = 0.0f32;
        let ret = unsafe { temperature_sensor_get_celsius(self.handle, &mut celsius) };
        if ret != ESP_OK {
            return Err(Error::Sensor("temperature_sensor_get_celsius"));
        }
        Ok(celsius)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&self) -> Result<f32> {
        if SIM_FAIL_NEXT_READ.swap(false, Ordering::Relaxed) {
            return Err(Error::Sensor("simulated read failure"));
        }
        Ok(f32::from(SIM_TEMPERATURE_C.load(Ordering::Relaxed)))
    }
}

impl SensorPort for OnDieTemperature {
    fn read_celsius(&mut self) -> i8 {
        match self.read_raw() {
            Ok(raw) => {
                self.last_good = to_whole_celsius(raw);
            }
            Err(e) => warn!("temperature: read failed ({}), reusing {} C", e, self.last_good),
        }
        self.last_good
    }
}
