// TWatch - BMA423 Accelerometer Driver
//
// Register-level driver over the shared sensor I2C bus. The step counter,
// wakeup (double-tap) and tilt features run on the chip; this driver maps
// their interrupts to INT1 and reads status and counters back.
//
// The feature engine runs Bosch's configuration image, which is lost on every
// reset. It is a vendor blob kept on SPIFFS and uploaded by `begin()`.

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use esp_idf_hal::i2c::I2cDriver;

use crate::config::*;
use crate::motion::sensor::*;

/// Thread-safe handle to a shared I2C bus.
pub type SharedBus = &'static Mutex<I2cDriver<'static>>;

// BMA423 register addresses
const REG_CHIP_ID: u8 = 0x00;
const REG_INT_STATUS_0: u8 = 0x1C;
const REG_STEP_COUNTER_0: u8 = 0x1E; // 4 bytes, little endian
const REG_INTERNAL_STATUS: u8 = 0x2A;
const REG_ACC_CONF: u8 = 0x40;
const REG_INT1_IO_CTRL: u8 = 0x53;
const REG_INT_LATCH: u8 = 0x55;
const REG_INT1_MAP: u8 = 0x56;
const REG_INIT_CTRL: u8 = 0x59;
const REG_RESERVED_5B: u8 = 0x5B; // feature image write address, low nibble
const REG_RESERVED_5C: u8 = 0x5C; // feature image write address, high byte
const REG_FEATURE_CONFIG: u8 = 0x5E;
const REG_PWR_CONF: u8 = 0x7C;
const REG_PWR_CTRL: u8 = 0x7D;
const REG_CMD: u8 = 0x7E;

const CHIP_ID_EXPECTED: u8 = 0x13;
const CMD_SOFT_RESET: u8 = 0xB6;
const INTERNAL_STATUS_INIT_OK: u8 = 0x01;
const INT1_OUTPUT_EN_ACTIVE_HIGH: u8 = 0x0A;
const ACC_ENABLE: u8 = 0x04;
const ACC_CONF_100HZ_AVG: u8 = 0x17;

const FEATURE_IMAGE_CHUNK: usize = 32;
const FEATURE_CONFIG_LEN: usize = 64;
const FEATURE_AXES_REMAP_OFFSET: usize = 0x3C;

pub struct Bma423 {
    bus: SharedBus,
    feature_image: Vec<u8>,
}

impl Bma423 {
    pub fn new(bus: SharedBus, feature_image: Vec<u8>) -> Self {
        Self { bus, feature_image }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&self) -> bool {
        matches!(self.read_reg(REG_CHIP_ID), Ok(CHIP_ID_EXPECTED))
    }

    fn bus(&self) -> anyhow::Result<std::sync::MutexGuard<'_, I2cDriver<'static>>> {
        self.bus.lock().map_err(|_| anyhow::anyhow!("sensor I2C bus poisoned"))
    }

    fn read_reg(&self, reg: u8) -> anyhow::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_regs(reg, &mut buf)?;
        Ok(buf[0])
    }

    fn read_regs(&self, reg: u8, buf: &mut [u8]) -> anyhow::Result<()> {
        self.bus()?
            .write_read(I2C_ADDR_BMA423, &[reg], buf, I2C_TIMEOUT_TICKS)
            .with_context(|| format!("BMA423 read {:#04x}", reg))
    }

    fn write_reg(&self, reg: u8, value: u8) -> anyhow::Result<()> {
        self.bus()?
            .write(I2C_ADDR_BMA423, &[reg, value], I2C_TIMEOUT_TICKS)
            .with_context(|| format!("BMA423 write {:#04x}", reg))
    }

    fn write_burst(&self, reg: u8, data: &[u8]) -> anyhow::Result<()> {
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(reg);
        frame.extend_from_slice(data);
        self.bus()?
            .write(I2C_ADDR_BMA423, &frame, I2C_TIMEOUT_TICKS)
            .with_context(|| format!("BMA423 burst write {:#04x}", reg))
    }

    /// Stream the feature image into the chip, `FEATURE_IMAGE_CHUNK` bytes at
    /// a time. The write address is in 16-bit words.
    fn load_feature_image(&self) -> anyhow::Result<()> {
        if self.feature_image.is_empty() {
            anyhow::bail!("no BMA423 feature image");
        }

        self.write_reg(REG_INIT_CTRL, 0x00)?;
        for (i, chunk) in self.feature_image.chunks(FEATURE_IMAGE_CHUNK).enumerate() {
            let word = (i * FEATURE_IMAGE_CHUNK / 2) as u16;
            self.write_reg(REG_RESERVED_5B, (word & 0x0F) as u8)?;
            self.write_reg(REG_RESERVED_5C, (word >> 4) as u8)?;
            self.write_burst(REG_FEATURE_CONFIG, chunk)?;
        }
        self.write_reg(REG_INIT_CTRL, 0x01)?;
        thread::sleep(Duration::from_millis(150));
        Ok(())
    }

    fn update_reg(&self, reg: u8, mask: u8, set: bool) -> anyhow::Result<()> {
        let value = self.read_reg(reg)?;
        let value = if set { value | mask } else { value & !mask };
        self.write_reg(reg, value)
    }
}

impl MotionSensor for Bma423 {
    fn begin(&mut self) -> anyhow::Result<()> {
        let id = self.read_reg(REG_CHIP_ID)?;
        if id != CHIP_ID_EXPECTED {
            anyhow::bail!("BMA423 not found (chip id {:#04x})", id);
        }

        // Soft reset restarts the hardware step counter; the retained total
        // in RAM carries the steps over.
        self.write_reg(REG_CMD, CMD_SOFT_RESET)?;
        thread::sleep(Duration::from_millis(2));

        // Advanced power save off while configuring.
        self.write_reg(REG_PWR_CONF, 0x00)?;
        thread::sleep(Duration::from_millis(1));

        if let Err(e) = self.load_feature_image() {
            log::error!("{:#}", e);
        }
        let status = self.read_reg(REG_INTERNAL_STATUS)?;
        if status & INTERNAL_STATUS_INIT_OK == 0 {
            log::warn!("BMA423 feature engine not ready (status {:#04x})", status);
        }

        self.write_reg(REG_ACC_CONF, ACC_CONF_100HZ_AVG)?;
        self.write_reg(REG_PWR_CTRL, ACC_ENABLE)?;
        self.write_reg(REG_INT1_IO_CTRL, INT1_OUTPUT_EN_ACTIVE_HIGH)?;
        self.write_reg(REG_INT_LATCH, 0x00)?;

        log::info!("BMA423 initialised (100Hz, INT1 push-pull active high)");
        Ok(())
    }

    fn read_interrupt(&mut self) -> anyhow::Result<InterruptStatus> {
        // Reading INT_STATUS_0 also clears it on the chip.
        self.read_reg(REG_INT_STATUS_0).map(InterruptStatus)
    }

    fn step_counter(&mut self) -> anyhow::Result<u32> {
        let mut raw = [0u8; 4];
        self.read_regs(REG_STEP_COUNTER_0, &mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    fn enable_feature_interrupt(&mut self, feature: Feature, enable: bool) -> anyhow::Result<()> {
        let mask = match feature {
            Feature::StepCounter => INT_STEP_COUNTER,
            Feature::DoubleClick => INT_DOUBLE_CLICK,
            Feature::Tilt        => INT_TILT,
        };
        self.update_reg(REG_INT1_MAP, mask, enable)
    }

    fn set_remap_axes(&mut self, remap: &AxesRemap) -> anyhow::Result<()> {
        let mut page = [0u8; FEATURE_CONFIG_LEN];
        self.read_regs(REG_FEATURE_CONFIG, &mut page)?;

        let bytes = remap.to_register_bytes();
        page[FEATURE_AXES_REMAP_OFFSET] = bytes[0];
        page[FEATURE_AXES_REMAP_OFFSET + 1] = bytes[1];

        self.write_burst(REG_FEATURE_CONFIG, &page)
    }
}
