// TWatch - System Events & Event Bits
//
// Event bits are per-domain: a motion listener mask is never compared with a
// power-management bit.

/// Bitmask naming one or more occurrences inside one event domain.
pub type EventBits = u32;

// ---------------------------------------------------------------------------
// Motion (BMA423) domain
// ---------------------------------------------------------------------------
/// Raised from the INT1 interrupt handler, cleared by the motion poll.
pub const BMACTL_EVENT_INT: EventBits = 1 << 0;
pub const BMACTL_DOUBLECLICK: EventBits = 1 << 1;
pub const BMACTL_TILT: EventBits = 1 << 2;
pub const BMACTL_STEPCOUNTER: EventBits = 1 << 3;

// ---------------------------------------------------------------------------
// Power-management domain
// ---------------------------------------------------------------------------
pub const POWERMGM_STANDBY: EventBits = 1 << 0;
pub const POWERMGM_WAKEUP: EventBits = 1 << 1;
pub const POWERMGM_STANDBY_REQUEST: EventBits = 1 << 2;
pub const POWERMGM_WAKEUP_REQUEST: EventBits = 1 << 3;
pub const POWERMGM_BMA_DOUBLECLICK: EventBits = 1 << 4;
pub const POWERMGM_BMA_TILT: EventBits = 1 << 5;

// ---------------------------------------------------------------------------
// Classified motion events (one per poll at most)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    DoubleClick,
    Tilt,
    /// New reported step total.
    StepCount(u32),
}

impl MotionEvent {
    /// Listener bit this event is dispatched under.
    pub fn event_bits(&self) -> EventBits {
        match self {
            Self::DoubleClick  => BMACTL_DOUBLECLICK,
            Self::Tilt         => BMACTL_TILT,
            Self::StepCount(_) => BMACTL_STEPCOUNTER,
        }
    }
}

// ---------------------------------------------------------------------------
// Power transitions reported by the power-management poll
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTransition {
    Standby,
    Wakeup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_bits_are_distinct_powers_of_two() {
        let bits = [BMACTL_EVENT_INT, BMACTL_DOUBLECLICK, BMACTL_TILT, BMACTL_STEPCOUNTER];
        for (i, a) in bits.iter().enumerate() {
            assert!(a.is_power_of_two());
            for b in &bits[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
    }

    #[test]
    fn motion_event_maps_to_listener_bit() {
        assert_eq!(MotionEvent::DoubleClick.event_bits(), BMACTL_DOUBLECLICK);
        assert_eq!(MotionEvent::Tilt.event_bits(), BMACTL_TILT);
        assert_eq!(MotionEvent::StepCount(12).event_bits(), BMACTL_STEPCOUNTER);
    }
}
