// TWatch - TFT Backlight
//
// LEDC PWM on the backlight pin; brightness 0..=255 maps linearly onto duty.

use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcChannel, LedcDriver, LedcTimer, LedcTimerDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;

use crate::config::*;

use super::Backlight;

pub struct PwmBacklight<T: LedcTimer + 'static> {
    // Dropping the timer driver stops the PWM.
    _timer: LedcTimerDriver<'static, T>,
    driver: LedcDriver<'static>,
    level: u8,
}

impl<T: LedcTimer + 'static> PwmBacklight<T> {
    pub fn new<C>(
        channel: impl Peripheral<P = C> + 'static,
        timer: impl Peripheral<P = T> + 'static,
        pin: impl Peripheral<P = impl OutputPin> + 'static,
    ) -> anyhow::Result<Self>
    where
        C: LedcChannel<SpeedMode = <T as LedcTimer>::SpeedMode>,
    {
        let timer = LedcTimerDriver::new(
            timer,
            &TimerConfig::new().frequency(BACKLIGHT_PWM_HZ.Hz().into()),
        )?;
        let driver = LedcDriver::new(channel, &timer, pin)?;

        let mut backlight = Self { _timer: timer, driver, level: 0 };
        backlight.set_brightness(DISPLAY_DEFAULT_BRIGHTNESS);
        Ok(backlight)
    }
}

impl<T: LedcTimer + 'static> Backlight for PwmBacklight<T> {
    fn brightness(&self) -> u8 {
        self.level
    }

    fn set_brightness(&mut self, level: u8) {
        let max = self.driver.get_max_duty();
        let duty = max * u32::from(level) / u32::from(DISPLAY_MAX_BRIGHTNESS);
        match self.driver.set_duty(duty) {
            Ok(()) => self.level = level,
            Err(e) => log::error!("backlight duty {} failed: {}", duty, e),
        }
    }
}
