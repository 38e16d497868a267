// TWatch - Default event listeners
//
// Glue between the motion / power events and the peripherals. All of these
// run on the motion task, so they only poke hardware and return.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{DISPLAY_MIN_BRIGHTNESS, HAPTIC_PULSE_MS};
use crate::drivers::{Backlight, Vibrate};
use crate::events::*;
use crate::motion::sensor::MotionSensor;
use crate::motion::Bma;
use crate::powermgm::PowerMgm;

/// Short non-blocking buzz on double-click, as tactile acknowledgement.
pub fn register_haptic_feedback<S, V>(bma: &mut Bma<'_, S>, motor: Arc<Mutex<V>>) -> bool
where
    S: MotionSensor,
    V: Vibrate + Send + 'static,
{
    bma.register_cb(BMACTL_DOUBLECLICK, move |_, _| {
        if let Ok(mut motor) = motor.lock() {
            motor.vibrate(Duration::from_millis(HAPTIC_PULSE_MS), false);
        }
        true
    }, "haptic feedback")
}

pub fn register_step_logger<S: MotionSensor>(bma: &mut Bma<'_, S>) -> bool {
    bma.register_cb(BMACTL_STEPCOUNTER, |_, steps| {
        log::info!("steps: {}", steps);
        true
    }, "step logger")
}

/// Backlight off in standby, back to the previous level on wakeup.
pub fn register_backlight<B>(power: &mut PowerMgm, backlight: Arc<Mutex<B>>) -> bool
where
    B: Backlight + Send + 'static,
{
    let mut saved = None;
    power.register_cb(POWERMGM_STANDBY | POWERMGM_WAKEUP, move |event, _| {
        let Ok(mut backlight) = backlight.lock() else {
            return false;
        };
        if event & POWERMGM_STANDBY != 0 {
            saved = Some(backlight.brightness());
            backlight.set_brightness(0);
        } else if event & POWERMGM_WAKEUP != 0 {
            let level = saved.take().unwrap_or(DISPLAY_MIN_BRIGHTNESS);
            backlight.set_brightness(level.max(DISPLAY_MIN_BRIGHTNESS));
        }
        true
    }, "backlight")
}
