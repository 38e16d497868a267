// TWatch - Step counter retained across warm resets
//
// The three words live in RAM that the bootloader does not clear, so they
// survive a software reset or watchdog but not a power cycle. `marker` tells
// the two apart.

use crate::config::STEPCOUNTER_VALID_MARKER;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetainedSteps {
    pub marker: u32,
    /// Last hardware reading folded in since boot.
    pub before_reset: u32,
    /// Steps accumulated before the current boot.
    pub total: u32,
}

impl RetainedSteps {
    pub const fn zeroed() -> Self {
        Self { marker: 0, before_reset: 0, total: 0 }
    }

    /// Boot-time check. On a cold boot (marker missing) everything is reset
    /// and the marker written. In both cases the last reading of the previous
    /// boot is folded into the running total. Returns `true` for a warm reset.
    pub fn validate(&mut self) -> bool {
        let warm = self.marker == STEPCOUNTER_VALID_MARKER;
        if !warm {
            log::info!("stepcounter not valid. reset");
            *self = Self {
                marker: STEPCOUNTER_VALID_MARKER,
                before_reset: 0,
                total: 0,
            };
        }

        self.total = self.total.wrapping_add(self.before_reset);
        self.before_reset = 0;
        warm
    }

    /// Fold the current hardware reading in and return the reported total.
    ///
    /// The hardware counter only moves forward. A reading below the last one
    /// means the chip was reset behind our back: keep what it had counted so
    /// the reported total never goes backwards.
    pub fn fold(&mut self, hw_counter: u32) -> u32 {
        if hw_counter < self.before_reset {
            log::warn!(
                "step counter went backwards ({} -> {}), assuming chip reset",
                self.before_reset,
                hw_counter
            );
            self.total = self.total.wrapping_add(self.before_reset);
        }
        self.before_reset = hw_counter;
        self.reported()
    }

    pub fn reported(&self) -> u32 {
        self.total.wrapping_add(self.before_reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_boot_starts_from_hardware_reading() {
        // Garbage left in uninitialised RAM.
        let mut steps = RetainedSteps { marker: 0x1234_5678, before_reset: 999, total: 42 };
        assert!(!steps.validate());
        assert_eq!(steps.marker, STEPCOUNTER_VALID_MARKER);
        assert_eq!(steps.fold(17), 17);
    }

    #[test]
    fn warm_reset_adds_previous_total() {
        let mut steps = RetainedSteps::zeroed();
        steps.validate();
        steps.fold(100);
        steps.fold(250);
        assert_eq!(steps.reported(), 250);

        // Reset: chip counter restarts, retained words survive.
        assert!(steps.validate());
        assert_eq!(steps.total, 250);
        assert_eq!(steps.fold(30), 280);
    }

    #[test]
    fn reported_total_never_decreases() {
        let mut steps = RetainedSteps::zeroed();
        steps.validate();
        let mut last = 0;
        for reading in [5, 40, 41, 3, 10, 2, 90] {
            let reported = steps.fold(reading);
            assert!(reported >= last, "{} < {}", reported, last);
            last = reported;
        }
        assert_eq!(last, 41 + 10 + 90);
    }
}
