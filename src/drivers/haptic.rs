// TWatch - Haptic Motor Driver
//
// GPIO-driven vibration motor. Non-blocking pulses run on a short-lived
// helper thread so listeners on the motion task return immediately.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

use super::Vibrate;

type MotorPin = PinDriver<'static, AnyOutputPin, Output>;

pub struct HapticDriver {
    pin: Arc<Mutex<MotorPin>>,
}

impl HapticDriver {
    pub fn new(pin: MotorPin) -> Self {
        Self { pin: Arc::new(Mutex::new(pin)) }
    }

    fn buzz(pin: &Mutex<MotorPin>, duration: Duration) {
        let Ok(mut pin) = pin.lock() else {
            return;
        };
        let _ = pin.set_high();
        thread::sleep(duration);
        let _ = pin.set_low();
    }
}

impl Vibrate for HapticDriver {
    fn vibrate(&mut self, duration: Duration, blocking: bool) {
        if blocking {
            Self::buzz(&self.pin, duration);
            return;
        }

        let pin = Arc::clone(&self.pin);
        let spawned = thread::Builder::new()
            .name("haptic".into())
            .stack_size(2048)
            .spawn(move || Self::buzz(&pin, duration));
        if let Err(e) = spawned {
            log::warn!("haptic thread spawn failed: {}", e);
        }
    }
}
