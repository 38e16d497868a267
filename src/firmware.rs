// TWatch - Firmware bring-up
//
// Boot sequence:
//   1. Mount SPIFFS (feature flags, BMA423 feature image).
//   2. Bring up the sensor I2C bus and the BMA423.
//   3. Attach the INT1 interrupt to the motion event group.
//   4. Register the default listeners (haptic, backlight, step log).
//   5. Run the motion task forever.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use esp_idf_hal::gpio::{AnyInputPin, Input, InputPin, InterruptType, OutputPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::prelude::*;

use crate::config::*;
use crate::drivers::backlight::PwmBacklight;
use crate::drivers::bma423::Bma423;
use crate::drivers::haptic::HapticDriver;
use crate::drivers::storage::mount_spiffs;
use crate::irq::InterruptLine;
use crate::listeners;
use crate::motion::settings::ConfigStore;
use crate::motion::stepcounter::RetainedSteps;
use crate::motion::Bma;
use crate::powermgm::PowerMgm;
use crate::tasks;

// Survives software resets and watchdog resets, not power cycles. The marker
// inside tells which one happened.
#[link_section = ".noinit"]
static mut RETAINED_STEPS: RetainedSteps = RetainedSteps::zeroed();

/// INT1 input. esp-idf-hal disables a GPIO interrupt after it fired, so the
/// motion task re-enables it once the event has been consumed.
struct Int1Line {
    pin: PinDriver<'static, AnyInputPin, Input>,
}

impl InterruptLine for Int1Line {
    fn rearm(&mut self) -> anyhow::Result<()> {
        self.pin.enable_interrupt()?;
        Ok(())
    }
}

pub fn run() -> anyhow::Result<()> {
    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("TWatch firmware starting");

    let peripherals = Peripherals::take()?;

    // ---- Storage ----------------------------------------------------------
    mount_spiffs()?;
    let image_path = Path::new(SPIFFS_BASE_PATH).join(BMA423_FEATURE_IMAGE_FILE);
    let feature_image = fs::read(&image_path).unwrap_or_else(|e| {
        log::error!("Can't open file: {}! ({})", image_path.display(), e);
        Vec::new()
    });

    // ---- I2C bus (sensor bus: BMA423) -------------------------------------
    let i2c_config = I2cConfig::new().baudrate(400u32.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21, // SDA
        peripherals.pins.gpio22, // SCL
        &i2c_config,
    )?;
    let i2c_bus: &'static Mutex<I2cDriver<'static>> = Box::leak(Box::new(Mutex::new(i2c)));

    // ---- Power management & motion driver ---------------------------------
    let mut power = PowerMgm::new(crate::now_ms());

    // SAFETY: the only reference ever taken to RETAINED_STEPS, handed to the
    // motion driver for the rest of the program.
    let steps: &'static mut RetainedSteps =
        unsafe { &mut *core::ptr::addr_of_mut!(RETAINED_STEPS) };

    let sensor = Bma423::new(i2c_bus, feature_image);
    if !sensor.is_connected() {
        log::error!("BMA423 not responding on I2C");
    }
    let mut bma = Bma::setup(sensor, ConfigStore::new(SPIFFS_BASE_PATH), steps, power.handle())?;

    // ---- INT1 -> motion event group ---------------------------------------
    // GPIO39 is input-only without pulls; the BMA423 drives INT1 push-pull.
    let mut int1 = PinDriver::input(peripherals.pins.gpio39.downgrade_input())?;
    int1.set_interrupt_type(InterruptType::PosEdge)?;
    let signal = bma.irq_signal();
    // SAFETY: the closure runs in ISR context. It only ORs a bit into an
    // atomic through an `Arc` cloned here, before the interrupt is enabled.
    unsafe { int1.subscribe(move || signal.raise())? };
    int1.enable_interrupt()?;

    // ---- Peripherals & listeners ------------------------------------------
    let haptic_pin = PinDriver::output(peripherals.pins.gpio4.downgrade_output())?;
    let motor = Arc::new(Mutex::new(HapticDriver::new(haptic_pin)));
    let backlight = Arc::new(Mutex::new(PwmBacklight::new(
        peripherals.ledc.channel0,
        peripherals.ledc.timer0,
        peripherals.pins.gpio12,
    )?));

    listeners::register_haptic_feedback(&mut bma, motor);
    listeners::register_step_logger(&mut bma);
    listeners::register_backlight(&mut power, backlight);

    // ---- Motion task -------------------------------------------------------
    let line = Int1Line { pin: int1 };
    let handle = thread::Builder::new()
        .name("motion".into())
        .stack_size(STACK_MOTION)
        .spawn(move || tasks::motion::motion_task(bma, power, line, crate::now_ms))?;

    log::info!("Boot complete, entering normal operation");
    // The motion task never returns; getting here means it panicked.
    if let Err(e) = handle.join() {
        log::error!("motion task panicked: {:?}", e);
    }
    Ok(())
}
