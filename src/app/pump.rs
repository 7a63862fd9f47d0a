//! Pump burst cycle.
//!
//! A recurring `pump_on_task` job starts a burst every `pump_cycle_hours`.
//! Each burst arms exactly one `pump_off_task` one-shot `pump_on_minutes`
//! later.  The two tags are disjoint, so re-arming the off-timer never
//! disturbs the on-cycle's own recurrence.

use chrono::{Duration, NaiveDateTime};
use log::info;

use crate::config::ControllerConfig;
use crate::error::Result;
use crate::scheduler::{JobId, Scheduler, Tag, Trigger};

use super::commands::Task;
use super::events::GrowEvent;
use super::ports::{ActuatorPort, EventSink, Level, Output};

/// Owns the pump's logical state.
pub struct PumpCycle {
    cycle: Duration,
    on_for: Duration,
    running: bool,
}

impl PumpCycle {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            cycle: config.pump_cycle(),
            on_for: config.pump_on(),
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Install the recurring burst job.  It is only removed at shutdown.
    pub fn install(&self, sched: &mut Scheduler<Task>, now: NaiveDateTime) -> Result<JobId> {
        Ok(sched.schedule(Tag::PumpOn, Trigger::Every(self.cycle), Task::PumpOn, now)?)
    }

    /// Start a burst: replace any stale off-timer, arm a fresh one, drive
    /// the pump high.
    pub fn pump_on(
        &mut self,
        now: NaiveDateTime,
        sched: &mut Scheduler<Task>,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        sched.cancel_tag(Tag::PumpOff);
        sched.schedule(Tag::PumpOff, Trigger::After(self.on_for), Task::PumpOff, now)?;
        self.drive(hw, Level::On)?;
        info!("Pump: on for {} min", self.on_for.num_minutes());
        sink.emit(&GrowEvent::PumpOn);
        Ok(())
    }

    /// End the burst and drop the off-timer.
    pub fn pump_off(
        &mut self,
        sched: &mut Scheduler<Task>,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        sched.cancel_tag(Tag::PumpOff);
        self.drive(hw, Level::Off)?;
        info!("Pump: off");
        sink.emit(&GrowEvent::PumpOff);
        Ok(())
    }

    /// Set the output without touching jobs or recording an event.
    pub(crate) fn drive(&mut self, hw: &mut impl ActuatorPort, level: Level) -> Result<()> {
        hw.set(Output::Pump, level)?;
        self.running = level == Level::On;
        Ok(())
    }
}
