// TWatch - Motion driver (BMA423)
//
// Interrupt -> poll -> classify -> dispatch.
//
// The INT1 handler only raises `BMACTL_EVENT_INT` in the motion event group.
// `poll()` runs in task context: it reads the chip's interrupt status, picks
// the first of double-click, tilt, step-count that is flagged, updates the
// step total and fans the event out to the registered listeners.

pub mod sensor;
pub mod settings;
pub mod stepcounter;


use std::sync::Arc;

use anyhow::Context;

use crate::callback::CallbackTable;
use crate::config::{BMA_INT_READ_RETRIES, STEP_PAYLOAD_MAX_LEN};
use crate::events::*;
use crate::irq::{EventGroup, IrqSignal};
use crate::powermgm::PowerHandle;

use self::sensor::{AxesRemap, Feature, InterruptStatus, MotionSensor};
use self::settings::{ConfigStore, MotionConfig};
use self::stepcounter::RetainedSteps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    InterruptPending,
    Classifying,
}

pub struct Bma<'r, S: MotionSensor> {
    sensor: S,
    store: ConfigStore,
    config: MotionConfig,
    steps: &'r mut RetainedSteps,
    events: Arc<EventGroup>,
    power: PowerHandle,
    callbacks: CallbackTable<str>,
    state: MotionState,
    // Status already read off the chip (which clears it there) but not yet
    // turned into an event.
    pending_status: Option<InterruptStatus>,
}

impl<'r, S: MotionSensor> Bma<'r, S> {
    /// Bring the driver up: validate the retained step counter, load the
    /// persisted feature flags, start the chip and apply the flags.
    pub fn setup(
        sensor: S,
        store: ConfigStore,
        steps: &'r mut RetainedSteps,
        power: PowerHandle,
    ) -> anyhow::Result<Self> {
        steps.validate();
        let config = store.load();

        let mut bma = Self {
            sensor,
            store,
            config,
            steps,
            events: Arc::new(EventGroup::new()),
            power,
            callbacks: CallbackTable::new("bma"),
            state: MotionState::Idle,
            pending_status: None,
        };

        bma.sensor.begin()?;
        bma.reload_settings();
        log::info!(
            "BMA423 ready (stepcounter:{} doubleclick:{} tilt:{}, {} steps)",
            bma.config.stepcounter,
            bma.config.doubleclick,
            bma.config.tilt,
            bma.steps.reported()
        );
        Ok(bma)
    }

    /// Signal for the INT1 interrupt handler.
    pub fn irq_signal(&self) -> IrqSignal {
        IrqSignal::new(Arc::clone(&self.events), BMACTL_EVENT_INT)
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn steps(&self) -> u32 {
        self.steps.reported()
    }

    pub fn config(&self) -> MotionConfig {
        self.config
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Listen for `BMACTL_*` events. Step events carry the total as a decimal
    /// string, double-click and tilt an empty one. Callbacks run on the motion
    /// task and must not block.
    pub fn register_cb<F>(&mut self, event: EventBits, callback: F, id: &'static str) -> bool
    where
        F: FnMut(EventBits, &str) -> bool + Send + 'static,
    {
        self.callbacks.register(event, callback, id)
    }

    /// Handle at most one pending interrupt. On a sensor error the interrupt
    /// stays pending and the next poll picks up where this one stopped.
    pub fn poll(&mut self) -> Option<MotionEvent> {
        if self.events.get_bits() & BMACTL_EVENT_INT == 0 {
            self.state = MotionState::Idle;
            return None;
        }

        // The status register has to be consumed before the bit is cleared,
        // otherwise the next edge could be lost.
        let status = match self.pending_status.take() {
            Some(status) => status,
            None => {
                self.state = MotionState::InterruptPending;
                self.read_interrupt_status()?
            }
        };
        self.state = MotionState::Classifying;

        let event = match self.classify(status) {
            Ok(event) => event,
            Err(e) => {
                log::error!("{:#}, retry next poll", e);
                self.pending_status = Some(status);
                return None;
            }
        };
        self.events.clear_bits(BMACTL_EVENT_INT);
        self.state = MotionState::Idle;

        if let Some(event) = event {
            self.dispatch(event);
        }
        event
    }

    fn read_interrupt_status(&mut self) -> Option<InterruptStatus> {
        for attempt in 1..=BMA_INT_READ_RETRIES {
            match self.sensor.read_interrupt() {
                Ok(status) => return Some(status),
                Err(e) => log::debug!("interrupt status read {} failed: {}", attempt, e),
            }
        }
        log::warn!("interrupt status unreadable, retry next poll");
        None
    }

    /// First match wins: double-click, then tilt, then step count.
    fn classify(&mut self, status: InterruptStatus) -> anyhow::Result<Option<MotionEvent>> {
        if status.is_double_click() {
            self.power.set_event(POWERMGM_BMA_DOUBLECLICK);
            return Ok(Some(MotionEvent::DoubleClick));
        }
        if status.is_tilt() {
            self.power.set_event(POWERMGM_BMA_TILT);
            return Ok(Some(MotionEvent::Tilt));
        }
        if status.is_step_counter() {
            let counter = self.sensor.step_counter().context("step counter read failed")?;
            return Ok(Some(MotionEvent::StepCount(self.steps.fold(counter))));
        }

        log::debug!("unhandled BMA interrupt status {:#04x}", status.0);
        Ok(None)
    }

    fn fold_step_counter(&mut self) -> Option<u32> {
        match self.sensor.step_counter() {
            Ok(counter) => Some(self.steps.fold(counter)),
            Err(e) => {
                log::error!("step counter read failed: {}", e);
                None
            }
        }
    }

    fn dispatch(&mut self, event: MotionEvent) {
        match event {
            MotionEvent::StepCount(total) => {
                let msg = step_payload(total);
                self.callbacks.send(BMACTL_STEPCOUNTER, &msg);
            }
            other => {
                self.callbacks.send(other.event_bits(), "");
            }
        }
    }

    /// Going to standby: stop step interrupts from waking the CPU.
    pub fn standby(&mut self) {
        log::info!("go standby");
        if self.config.stepcounter {
            self.apply(Feature::StepCounter, false);
        }
    }

    /// Back from standby: re-enable step interrupts and publish the total
    /// counted while asleep.
    pub fn wakeup(&mut self) {
        log::info!("go wakeup");
        if self.config.stepcounter {
            self.apply(Feature::StepCounter, true);
        }
        if let Some(total) = self.fold_step_counter() {
            self.dispatch(MotionEvent::StepCount(total));
        }
    }

    /// Push every feature flag to the chip.
    pub fn reload_settings(&mut self) {
        for feature in Feature::ALL {
            self.apply(feature, self.config.get(feature));
        }
    }

    pub fn get_config(&self, feature: Feature) -> bool {
        self.config.get(feature)
    }

    /// `set_config` by persisted key (`"stepcounter"`, `"doubleclick"`,
    /// `"tilt"`). Unknown names are rejected.
    pub fn set_feature(&mut self, name: &str, enable: bool) -> bool {
        let Some(feature) = Feature::from_key(name) else {
            log::warn!("unknown motion feature {:?}", name);
            return false;
        };
        self.set_config(feature, enable);
        true
    }

    /// Change a feature flag. The new value is persisted before it is applied,
    /// so after a power loss in between the stored value is what the next boot
    /// applies.
    pub fn set_config(&mut self, feature: Feature, enable: bool) {
        self.config.set(feature, enable);
        self.store.save(&self.config);
        self.reload_settings();
    }

    /// Match the sensor axes to the display rotation (0, 90, 180, 270 deg).
    pub fn set_rotate_tilt(&mut self, rotation: u32) {
        let Some(remap) = AxesRemap::for_rotation(rotation) else {
            log::warn!("unsupported rotation {}", rotation);
            return;
        };
        if let Err(e) = self.sensor.set_remap_axes(&remap) {
            log::error!("axis remap failed: {}", e);
        }
    }

    fn apply(&mut self, feature: Feature, enable: bool) {
        if let Err(e) = self.sensor.enable_feature_interrupt(feature, enable) {
            log::error!("enable {} interrupt failed: {}", feature.key(), e);
        }
    }
}

/// Decimal step count, at most `STEP_PAYLOAD_MAX_LEN` characters.
pub fn step_payload(total: u32) -> String {
    let mut msg = total.to_string();
    msg.truncate(STEP_PAYLOAD_MAX_LEN);
    msg
}
