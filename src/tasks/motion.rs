// TWatch - Motion Task
//
// Owns the motion driver and power management. Every tick it handles a
// pending accelerometer interrupt, lets power management decide on standby,
// forwards the decision to the motion driver and re-arms INT1.
// Runs for the life of the device.

use std::thread;
use std::time::Duration;

use crate::config::*;
use crate::events::{MotionEvent, PowerTransition};
use crate::irq::InterruptLine;
use crate::motion::sensor::MotionSensor;
use crate::motion::Bma;
use crate::powermgm::PowerMgm;

pub fn motion_task<S, L>(
    mut bma: Bma<'_, S>,
    mut power: PowerMgm,
    mut irq: L,
    now_ms: impl Fn() -> u32,
) -> !
where
    S: MotionSensor,
    L: InterruptLine,
{
    log::info!("Motion task started");

    let interval = Duration::from_millis(MOTION_POLL_INTERVAL_MS);
    loop {
        tick(&mut bma, &mut power, &mut irq, now_ms());
        thread::sleep(interval);
    }
}

/// One pass of the motion loop.
pub fn tick<S, L>(
    bma: &mut Bma<'_, S>,
    power: &mut PowerMgm,
    irq: &mut L,
    now_ms: u32,
) -> (Option<MotionEvent>, Option<PowerTransition>)
where
    S: MotionSensor,
    L: InterruptLine,
{
    let event = bma.poll();

    let transition = power.poll(now_ms);
    match transition {
        Some(PowerTransition::Standby) => bma.standby(),
        Some(PowerTransition::Wakeup)  => bma.wakeup(),
        None => {}
    }

    if let Err(e) = irq.rearm() {
        log::error!("INT1 re-arm failed: {}", e);
    }
    (event, transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::sensor::{Feature, INT_DOUBLE_CLICK, INT_STEP_COUNTER};
    use crate::motion::settings::ConfigStore;
    use crate::motion::stepcounter::RetainedSteps;
    use crate::motion::tests::FakeSensor;

    struct CountingLine(u32);

    impl InterruptLine for CountingLine {
        fn rearm(&mut self) -> anyhow::Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    #[test]
    fn standby_and_wakeup_reach_the_motion_driver() {
        let dir = tempfile::tempdir().unwrap();
        let mut power = PowerMgm::new(0).with_inactivity_timeout(1000);
        let mut steps = RetainedSteps::zeroed();
        let mut bma =
            Bma::setup(FakeSensor::default(), ConfigStore::new(dir.path()), &mut steps, power.handle())
                .unwrap();
        let mut line = CountingLine(0);

        assert_eq!(tick(&mut bma, &mut power, &mut line, 10), (None, None));

        // Idle long enough: standby turns the step interrupt off.
        assert_eq!(
            tick(&mut bma, &mut power, &mut line, 1500),
            (None, Some(PowerTransition::Standby))
        );
        assert_eq!(bma.sensor_mut().last_enable(Feature::StepCounter), Some(false));

        // A step interrupt alone does not wake the watch.
        bma.sensor_mut().counter = 12;
        bma.sensor_mut().push_status(INT_STEP_COUNTER);
        bma.irq_signal().raise();
        assert_eq!(
            tick(&mut bma, &mut power, &mut line, 1600),
            (Some(MotionEvent::StepCount(12)), None)
        );

        // Double-click wakes it in the same tick.
        bma.sensor_mut().push_status(INT_DOUBLE_CLICK);
        bma.irq_signal().raise();
        assert_eq!(
            tick(&mut bma, &mut power, &mut line, 1700),
            (Some(MotionEvent::DoubleClick), Some(PowerTransition::Wakeup))
        );
        assert_eq!(bma.sensor_mut().last_enable(Feature::StepCounter), Some(true));
        assert_eq!(line.0, 4);
    }
}
