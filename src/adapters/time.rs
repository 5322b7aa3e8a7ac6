//! Blocking delay used to pace the control loop.
//!
//! - **`target_os = "espidf"`**: `FreeRtos` (yields to the scheduler, tick
//!   resolution).
//! - **`not(target_os = "espidf")`**: [`StdDelay`] over
//!   `std::thread::sleep` for host-side runs.
//!
//! Both implement [`embedded_hal::delay::DelayNs`], which is all the
//! application core sees.

#[cfg(target_os = "espidf")]
pub type SystemDelay = esp_idf_svc::hal::delay::FreeRtos;

#[cfg(not(target_os = "espidf"))]
pub type SystemDelay = StdDelay;

/// The platform delay, for wiring in `main` and host harnesses.
pub const fn system_delay() -> SystemDelay {
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::hal::delay::FreeRtos
    }
    #[cfg(not(target_os = "espidf"))]
    {
        StdDelay
    }
}

/// Host delay.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

#[cfg(not(target_os = "espidf"))]
impl embedded_hal::delay::DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
