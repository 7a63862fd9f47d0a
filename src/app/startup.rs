//! Startup: output self-test and actuator reconciliation.
//!
//! After an unclean restart the outputs come up low.  Reconciliation
//! switches the light back on if the current time falls inside the light
//! window.  The pump is left off: whether it was mid-burst is not recorded
//! anywhere, and the next `pump_on_task` firing restarts the cycle.

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use log::info;

use crate::error::Result;

use super::events::GrowEvent;
use super::light::{LightCycle, LightWindow};
use super::ports::{ActuatorPort, EventSink, Level};
use super::pump::PumpCycle;

/// Self-test sequence: (light, pump, hold in ms) per step.
const SYSTEM_CHECK_STEPS: [(Level, Level, u32); 4] = [
    (Level::On, Level::Off, 5_000),
    (Level::On, Level::On, 30_000),
    (Level::On, Level::Off, 10_000),
    (Level::Off, Level::Off, 2_000),
];

/// Cycle both outputs so an operator can see the relays click.
pub fn system_check(
    light: &mut LightCycle,
    pump: &mut PumpCycle,
    hw: &mut impl ActuatorPort,
    sink: &mut impl EventSink,
    delay: &mut impl DelayNs,
) -> Result<()> {
    info!("System check: start");
    sink.emit(&GrowEvent::SystemCheckStarted);
    for (light_level, pump_level, hold_ms) in SYSTEM_CHECK_STEPS {
        light.drive(hw, light_level)?;
        pump.drive(hw, pump_level)?;
        delay.delay_ms(hold_ms);
    }
    info!("System check: done");
    sink.emit(&GrowEvent::SystemCheckCompleted);
    Ok(())
}

/// Bring the light in line with `window` at `now`.  Returns whether the
/// light was switched on.
///
/// `window` is `None` when the first sun-time lookup failed; the light then
/// stays off until a refresh succeeds.
pub fn reconcile(
    now: NaiveDateTime,
    window: Option<LightWindow>,
    light: &mut LightCycle,
    hw: &mut impl ActuatorPort,
    sink: &mut impl EventSink,
) -> Result<bool> {
    let should_be_lit = window.is_some_and(|w| w.contains(now.time()));
    sink.emit(&GrowEvent::ProgramStarted);
    info!(
        "Startup: {} with window {:?}, light {}",
        now,
        window,
        if should_be_lit { "on" } else { "off" }
    );
    if should_be_lit {
        light.light_on(hw, sink)?;
    }
    Ok(should_be_lit)
}
