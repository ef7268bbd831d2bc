//! Job bodies for both node variants.
//!
//! Each builder takes ownership of (or a reference to) its sensor state and
//! returns the closure the scheduler runs.  Shared collaborators (the
//! publisher and the ADC) come in through [`NodeIo`] and are borrowed only
//! for the duration of one call; jobs never overlap, so the `RefCell`s are
//! never contended.

use embedded_hal::digital::InputPin;
use log::{debug, info};

use crate::app::reports::{self, Report};
use crate::error::{Error, Result};
use crate::node::NodeIo;
use crate::scheduler::{JobContext, Scheduler};
use crate::sensors::contact::ContactSensor;
use crate::sensors::light::LightSensor;
use crate::sensors::motion::MotionSensor;
use crate::sensors::temperature::TemperatureSensor;

/// Register `action` every `period_secs`.  A full job table is an init error.
pub fn register<'j, F>(
    sched: &mut Scheduler<'j>,
    label: &'static str,
    period_secs: u32,
    action: F,
) -> Result<()>
where
    F: FnMut(&mut JobContext<'_>) -> Result<()> + 'j,
{
    sched
        .register(label, period_secs as u64 * 1000, action)
        .map(|_| ())
        .ok_or(Error::Init("job table full"))
}

fn emit(io: NodeIo<'_>, report: &Report) -> Result<()> {
    reports::publish(&mut *io.publisher.borrow_mut(), &io.config.topic_prefix, report)
}

pub fn temperature<'j>(
    sensor: TemperatureSensor,
    io: NodeIo<'j>,
) -> impl FnMut(&mut JobContext<'_>) -> Result<()> + 'j {
    move |_ctx: &mut JobContext<'_>| {
        let celsius = sensor.read(&mut *io.adc.borrow_mut())?;
        emit(io, &Report::Temperature(celsius))
    }
}

/// Hold the indicator in its "processing" state for `blink_ms`.  The
/// scheduler lights it around every job, so waiting here is the blink.
pub fn heartbeat(blink_ms: u32) -> impl FnMut(&mut JobContext<'_>) -> Result<()> {
    move |ctx: &mut JobContext<'_>| {
        debug!("Heartbeat at {}ms", ctx.now_ms);
        ctx.clock.delay_ms(blink_ms);
        Ok(())
    }
}

/// Fast motion path.  `rearm` re-enables the edge interrupt, which some
/// GPIO drivers disable after every trigger.
pub fn motion_alert<'j, R>(
    sensor: &'j MotionSensor,
    io: NodeIo<'j>,
    mut rearm: R,
) -> impl FnMut(&mut JobContext<'_>) -> Result<()> + 'j
where
    R: FnMut() -> Result<()> + 'j,
{
    move |ctx: &mut JobContext<'_>| {
        if let Some(presence) = sensor.alert(ctx.now_ms) {
            emit(io, &Report::Motion(presence))?;
        }
        rearm()
    }
}

pub fn motion_refresh<'j>(
    sensor: &'j MotionSensor,
    io: NodeIo<'j>,
) -> impl FnMut(&mut JobContext<'_>) -> Result<()> + 'j {
    move |ctx: &mut JobContext<'_>| match sensor.refresh(ctx.now_ms) {
        Some(presence) => emit(io, &Report::Motion(presence)),
        None => Ok(()),
    }
}

pub fn contact<'j, P>(
    mut sensor: ContactSensor<P>,
    io: NodeIo<'j>,
) -> impl FnMut(&mut JobContext<'_>) -> Result<()> + 'j
where
    P: InputPin + 'j,
{
    move |ctx: &mut JobContext<'_>| match sensor.poll(&mut *ctx.clock)? {
        Some(level) => {
            info!("Contact: now {}", level.as_str());
            emit(io, &Report::Contact(level))
        }
        None => Ok(()),
    }
}

pub fn light<'j>(
    mut sensor: LightSensor,
    io: NodeIo<'j>,
) -> impl FnMut(&mut JobContext<'_>) -> Result<()> + 'j {
    move |_ctx: &mut JobContext<'_>| {
        let change = sensor.poll(&mut *io.adc.borrow_mut())?;
        match change {
            Some(level) => {
                info!("Light: now {}", level.as_str());
                emit(io, &Report::Light(level))
            }
            None => Ok(()),
        }
    }
}
