// TWatch - Peripheral drivers
//
// The traits are what the rest of the firmware uses; the ESP-IDF
// implementations only exist when building for the watch.

use std::time::Duration;

#[cfg(target_os = "espidf")]
pub mod backlight;
#[cfg(target_os = "espidf")]
pub mod bma423;
#[cfg(target_os = "espidf")]
pub mod haptic;
#[cfg(target_os = "espidf")]
pub mod storage;

/// Vibration motor.
pub trait Vibrate {
    /// Vibrate for `duration`. With `blocking` the call returns after the
    /// motor stopped, otherwise immediately.
    fn vibrate(&mut self, duration: Duration, blocking: bool);
}

/// Display backlight, 0 = off.
pub trait Backlight {
    fn brightness(&self) -> u8;
    fn set_brightness(&mut self, level: u8);
}
