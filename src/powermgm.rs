// TWatch - Power Management
//
// Collects power events from other drivers (motion double-click / tilt,
// explicit standby and wakeup requests), tracks inactivity and decides when
// the watch enters or leaves standby. Listeners get `POWERMGM_STANDBY` or
// `POWERMGM_WAKEUP` before the transition is reported to the caller.

use std::sync::Arc;

use crate::callback::CallbackTable;
use crate::config::INACTIVITY_TIMEOUT_MS;
use crate::events::*;
use crate::irq::EventGroup;

/// Cheap clonable handle other drivers use to raise power events.
#[derive(Clone)]
pub struct PowerHandle {
    events: Arc<EventGroup>,
}

impl PowerHandle {
    pub fn set_event(&self, bits: EventBits) {
        self.events.set_bits(bits);
    }
}

pub struct PowerMgm {
    events: Arc<EventGroup>,
    callbacks: CallbackTable<()>,
    standby: bool,
    last_activity_ms: u32,
    inactivity_timeout_ms: u32,
}

impl PowerMgm {
    pub fn new(now_ms: u32) -> Self {
        Self {
            events: Arc::new(EventGroup::new()),
            callbacks: CallbackTable::new("powermgm"),
            standby: false,
            last_activity_ms: now_ms,
            inactivity_timeout_ms: INACTIVITY_TIMEOUT_MS,
        }
    }

    pub fn with_inactivity_timeout(mut self, timeout_ms: u32) -> Self {
        self.inactivity_timeout_ms = timeout_ms;
        self
    }

    pub fn handle(&self) -> PowerHandle {
        PowerHandle { events: Arc::clone(&self.events) }
    }

    pub fn is_standby(&self) -> bool {
        self.standby
    }

    /// Listen for `POWERMGM_STANDBY` / `POWERMGM_WAKEUP`. Must not block.
    pub fn register_cb<F>(&mut self, event: EventBits, callback: F, id: &'static str) -> bool
    where
        F: FnMut(EventBits, &()) -> bool + Send + 'static,
    {
        self.callbacks.register(event, callback, id)
    }

    /// Drain pending power events and perform at most one transition.
    pub fn poll(&mut self, now_ms: u32) -> Option<PowerTransition> {
        let bits = self.events.take_bits(
            POWERMGM_STANDBY_REQUEST
                | POWERMGM_WAKEUP_REQUEST
                | POWERMGM_BMA_DOUBLECLICK
                | POWERMGM_BMA_TILT,
        );

        let motion = bits & (POWERMGM_BMA_DOUBLECLICK | POWERMGM_BMA_TILT) != 0;
        if motion || bits & POWERMGM_WAKEUP_REQUEST != 0 {
            self.last_activity_ms = now_ms;
        }

        if self.standby {
            if motion || bits & POWERMGM_WAKEUP_REQUEST != 0 {
                return Some(self.transition(PowerTransition::Wakeup));
            }
            return None;
        }

        if bits & POWERMGM_STANDBY_REQUEST != 0 {
            return Some(self.transition(PowerTransition::Standby));
        }

        // Wrapping: now_ms overflows after ~49 days.
        if now_ms.wrapping_sub(self.last_activity_ms) > self.inactivity_timeout_ms {
            log::info!("Inactivity timeout ({} ms), going to standby", self.inactivity_timeout_ms);
            return Some(self.transition(PowerTransition::Standby));
        }
        None
    }

    fn transition(&mut self, to: PowerTransition) -> PowerTransition {
        let event = match to {
            PowerTransition::Standby => POWERMGM_STANDBY,
            PowerTransition::Wakeup  => POWERMGM_WAKEUP,
        };
        self.standby = to == PowerTransition::Standby;
        self.callbacks.send(event, &());
        to
    }
}
