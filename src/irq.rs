// TWatch - Interrupt Event Bridge
//
// An `EventGroup` is a word of event bits shared between an interrupt handler
// and task context. The ISR side only ever ORs bits in: no allocation, no
// locks, no register access. Everything else happens in the task that polls
// the group.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::events::EventBits;

#[derive(Debug, Default)]
pub struct EventGroup {
    bits: AtomicU32,
}

impl EventGroup {
    pub const fn new() -> Self {
        Self { bits: AtomicU32::new(0) }
    }

    /// Interrupt-safe: a single atomic OR.
    #[inline(always)]
    pub fn set_bits_from_isr(&self, bits: EventBits) {
        self.bits.fetch_or(bits, Ordering::Release);
    }

    pub fn set_bits(&self, bits: EventBits) {
        self.bits.fetch_or(bits, Ordering::Release);
    }

    pub fn get_bits(&self) -> EventBits {
        self.bits.load(Ordering::Acquire)
    }

    /// Clear `bits` and return the value the group held before.
    pub fn clear_bits(&self, bits: EventBits) -> EventBits {
        self.bits.fetch_and(!bits, Ordering::AcqRel)
    }

    /// Atomically take and clear every bit in `mask` that is currently set.
    pub fn take_bits(&self, mask: EventBits) -> EventBits {
        self.clear_bits(mask) & mask
    }
}

/// Handle given to the interrupt handler for one line. Cloned into the ISR
/// closure once at attach time, so raising it never allocates.
#[derive(Clone)]
pub struct IrqSignal {
    group: Arc<EventGroup>,
    bits: EventBits,
}

impl IrqSignal {
    pub fn new(group: Arc<EventGroup>, bits: EventBits) -> Self {
        Self { group, bits }
    }

    #[inline(always)]
    pub fn raise(&self) {
        self.group.set_bits_from_isr(self.bits);
    }
}

/// An interrupt line that has to be re-armed from task context after it fired.
pub trait InterruptLine {
    fn rearm(&mut self) -> anyhow::Result<()>;
}

/// Lines that stay armed (and host tests).
impl InterruptLine for () {
    fn rearm(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::events::{BMACTL_EVENT_INT, BMACTL_TILT};

    #[test]
    fn bits_stay_set_until_cleared() {
        let group = EventGroup::new();
        group.set_bits_from_isr(BMACTL_EVENT_INT);
        assert_eq!(group.get_bits(), BMACTL_EVENT_INT);
        // Nobody polled yet: the bit is still there.
        assert_eq!(group.get_bits() & BMACTL_EVENT_INT, BMACTL_EVENT_INT);

        let before = group.clear_bits(BMACTL_EVENT_INT);
        assert_eq!(before, BMACTL_EVENT_INT);
        assert_eq!(group.get_bits(), 0);
    }

    #[test]
    fn take_bits_leaves_other_bits_alone() {
        let group = EventGroup::new();
        group.set_bits(BMACTL_EVENT_INT | BMACTL_TILT);
        assert_eq!(group.take_bits(BMACTL_TILT), BMACTL_TILT);
        assert_eq!(group.get_bits(), BMACTL_EVENT_INT);
        assert_eq!(group.take_bits(BMACTL_TILT), 0);
    }

    #[test]
    fn signal_raised_from_another_thread_is_observed() {
        let group = Arc::new(EventGroup::new());
        let signal = IrqSignal::new(Arc::clone(&group), BMACTL_EVENT_INT);

        thread::spawn(move || signal.raise()).join().unwrap();

        assert_eq!(group.take_bits(BMACTL_EVENT_INT), BMACTL_EVENT_INT);
    }
}
