// TWatch - Hardware & System Configuration
// Target: LilyGO T-Watch 2020 (ESP32, BMA423 accelerometer)

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (T-Watch 2020 pinout)
// ---------------------------------------------------------------------------
pub const PIN_BMA_INT1: i32 = 39;   // BMA423 INT1 (input only, rising edge)
pub const PIN_HAPTIC: i32 = 4;      // Vibration motor
pub const PIN_BACKLIGHT: i32 = 12;  // TFT backlight (LEDC PWM)
pub const PIN_I2C_SDA: i32 = 21;    // Sensor I2C data line
pub const PIN_I2C_SCL: i32 = 22;    // Sensor I2C clock line

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_BMA423: u8 = 0x19;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Storage (SPIFFS mounted through the ESP-IDF VFS)
// ---------------------------------------------------------------------------
pub const SPIFFS_BASE_PATH: &str = "/spiffs";
pub const SPIFFS_BASE_PATH_C: &core::ffi::CStr = c"/spiffs"; // for esp_vfs_spiffs_register
pub const SPIFFS_MAX_FILES: usize = 5;
pub const BMA_JSON_CONFIG_FILE: &str = "bma.json";
pub const BMA_LEGACY_CONFIG_FILE: &str = "bma.cfg";
pub const BMA423_FEATURE_IMAGE_FILE: &str = "bma423.fw"; // Bosch config blob

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_MOTION: usize = 8192;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const MOTION_POLL_INTERVAL_MS: u64 = 20;
pub const INACTIVITY_TIMEOUT_MS: u32 = 30_000;   // no motion for 30 s -> standby
pub const HAPTIC_PULSE_MS: u64 = 50;
pub const BACKLIGHT_PWM_HZ: u32 = 12_000;

// ---------------------------------------------------------------------------
// Motion driver
// ---------------------------------------------------------------------------
/// How many times the interrupt status register is re-read before a poll gives
/// up and leaves the interrupt pending for the next one.
pub const BMA_INT_READ_RETRIES: u32 = 10;
/// Marker stored next to the retained step counters; anything else means the
/// retained RAM did not survive (cold boot).
pub const STEPCOUNTER_VALID_MARKER: u32 = 0xa5a5_a5a5;
/// Step payload is a short decimal string (15 characters + terminator).
pub const STEP_PAYLOAD_MAX_LEN: usize = 15;

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------
pub const DISPLAY_MAX_BRIGHTNESS: u8 = 255;
pub const DISPLAY_MIN_BRIGHTNESS: u8 = 8;
pub const DISPLAY_DEFAULT_BRIGHTNESS: u8 = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spiffs_paths_agree() {
        assert_eq!(SPIFFS_BASE_PATH_C.to_str(), Ok(SPIFFS_BASE_PATH));
    }
}
