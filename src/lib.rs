// TWatch - Motion & power core
//
// Accelerometer interrupt handling, step counting, feature configuration and
// the listener tables the rest of the firmware hangs off.

pub mod callback;
pub mod config;
pub mod drivers;
pub mod events;
pub mod irq;
pub mod listeners;
pub mod motion;
pub mod powermgm;
pub mod tasks;

#[cfg(target_os = "espidf")]
pub mod firmware;

/// Milliseconds since boot (wraps at ~49 days, fine for timeouts).
#[cfg(target_os = "espidf")]
pub fn now_ms() -> u32 {
    unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
}

