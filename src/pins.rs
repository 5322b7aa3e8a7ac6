//! GPIO pin assignments for the TempNode board (ESP32-S3).
//!
//! Single source of truth: the device entry point references this module
//! rather than hard-coding pin numbers.
//!
//! GPIO 26-32 carry SPI flash/PSRAM on S3 modules and must stay unclaimed.

// ---------------------------------------------------------------------------
// RGB indicator (discrete LEDs or one common-cathode RGB LED)
// ---------------------------------------------------------------------------

pub const LED_R_GPIO: i32 = 11;
pub const LED_G_GPIO: i32 = 12;
pub const LED_B_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Boot-reset input
// ---------------------------------------------------------------------------

/// Held LOW at boot to erase stored Wi-Fi credentials and open the
/// provisioning portal.  Internal pull-up enabled.  Shares the BOOT
/// button on S3 dev boards.
pub const BOOT_RESET_GPIO: i32 = 0;

/// Reserved for the module's SPI flash and PSRAM.
pub const FLASH_PSRAM_GPIOS: core::ops::RangeInclusive<i32> = 26..=32;
