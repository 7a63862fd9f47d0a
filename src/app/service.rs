//! Control loop: the hexagonal core.
//!
//! [`Controller`] owns the scheduler and both cycle managers.  Ports are
//! bundled in a [`Rig`] and passed in at call sites, so the whole loop is
//! testable with mock adapters.
//!
//! ```text
//!  SunTimeProvider ─▶ ┌─────────────────────────────┐ ──▶ EventSink
//!  Geocoder        ─▶ │          Controller          │
//!  SensorPort      ─▶ │ Scheduler · Light · Pump     │ ──▶ ActuatorPort
//!                     └─────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! `Idle ──start──▶ Running ──stop button / fault──▶ Stopping ──▶ Stopped`
//!
//! Cleanup (outputs low, job table cleared, port released) runs exactly
//! once per [`Controller::run`], on every exit path.

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::scheduler::{JobId, JobRunner, Scheduler, Tag, TickReport, Trigger};

use super::commands::Task;
use super::events::GrowEvent;
use super::light::LightCycle;
use super::ports::{
    ActuatorPort, Clock, EventSink, Geocoder, Input, Level, Output, SensorPort, SunTimeProvider,
};
use super::pump::PumpCycle;
use super::startup;

// ───────────────────────────────────────────────────────────────
// Rig (port bundle)
// ───────────────────────────────────────────────────────────────

/// Every driven adapter the controller talks to.
pub struct Rig<H, K, S, E> {
    pub hw: H,
    pub sky: K,
    pub sensors: S,
    pub sink: E,
}

// ───────────────────────────────────────────────────────────────
// Controller state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Why [`Controller::run`] returned.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// The stop input was asserted.
    StopButton,
    /// A fatal error escaped startup or the loop.
    Fault(Error),
}

impl core::fmt::Display for StopReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::StopButton => write!(f, "stop button pressed"),
            Self::Fault(e) => write!(f, "fault: {e}"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller {
    config: ControllerConfig,
    sched: Scheduler<Task>,
    light: LightCycle,
    pump: PumpCycle,
    state: ControlState,
    /// First fatal error raised inside a job action this tick.
    fatal: Option<Error>,
    poll_ms: u32,
    tick_count: u64,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        let light = LightCycle::new(&config);
        let pump = PumpCycle::new(&config);
        let poll_ms = u32::try_from(config.poll_interval_ms).unwrap_or(u32::MAX);
        Self {
            config,
            sched: Scheduler::new(),
            light,
            pump,
            state: ControlState::Idle,
            fatal: None,
            poll_ms,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run until the stop input is asserted or a fatal error occurs, then
    /// clean up.
    pub fn run<H, K, S, E>(
        &mut self,
        rig: &mut Rig<H, K, S, E>,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
    ) -> StopReason
    where
        H: ActuatorPort,
        K: SunTimeProvider + Geocoder,
        S: SensorPort,
        E: EventSink,
    {
        let outcome = self
            .start(rig, clock, delay)
            .and_then(|()| self.poll(rig, clock, delay));
        let reason = match outcome {
            Ok(()) => StopReason::StopButton,
            Err(e) => {
                error!("Controller: {} after {} ticks", e, self.tick_count);
                StopReason::Fault(e)
            }
        };
        self.shutdown(rig, &reason);
        reason
    }

    /// Compute the light window, optionally self-test the outputs,
    /// reconcile the light, and install the recurring jobs.
    pub fn start<H, K, S, E>(
        &mut self,
        rig: &mut Rig<H, K, S, E>,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
    ) -> Result<()>
    where
        H: ActuatorPort,
        K: SunTimeProvider + Geocoder,
        S: SensorPort,
        E: EventSink,
    {
        self.state = ControlState::Running;
        info!("Controller: starting");

        let window = match self
            .light
            .refresh(clock.now(), &mut self.sched, &mut rig.sky, &mut rig.sink)
        {
            Ok(w) => Some(w),
            Err(Error::Lookup(e)) => {
                warn!("Controller: starting without a light window ({})", e);
                None
            }
            Err(e) => return Err(e),
        };

        if self.config.system_check {
            startup::system_check(&mut self.light, &mut self.pump, &mut rig.hw, &mut rig.sink, delay)?;
        }

        let now = clock.now();
        startup::reconcile(now, window, &mut self.light, &mut rig.hw, &mut rig.sink)?;

        self.light
            .install(self.config.light_refresh_at, &mut self.sched, now)?;
        self.pump.install(&mut self.sched, now)?;
        self.sched.schedule(
            Tag::Measurement,
            Trigger::Every(self.config.measurement_interval()),
            Task::Measure,
            now,
        )?;
        info!("Controller: running with {} jobs", self.sched.len());
        Ok(())
    }

    /// Poll loop: run due jobs, sleep one quantum, check the stop input.
    fn poll<H, K, S, E>(
        &mut self,
        rig: &mut Rig<H, K, S, E>,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
    ) -> Result<()>
    where
        H: ActuatorPort,
        K: SunTimeProvider + Geocoder,
        S: SensorPort,
        E: EventSink,
    {
        loop {
            self.tick(rig, clock.now())?;
            delay.delay_ms(self.poll_ms);
            if rig.hw.read(Input::StopButton)? {
                info!("Controller: stop button pressed");
                self.state = ControlState::Stopping;
                return Ok(());
            }
        }
    }

    /// One scheduler pass at `now`.  Job faults are contained; a fatal one
    /// is returned after every due job has had its turn.
    pub fn tick<H, K, S, E>(&mut self, rig: &mut Rig<H, K, S, E>, now: NaiveDateTime) -> Result<TickReport>
    where
        H: ActuatorPort,
        K: SunTimeProvider + Geocoder,
        S: SensorPort,
        E: EventSink,
    {
        self.tick_count += 1;
        let mut runner = TaskRunner {
            light: &mut self.light,
            pump: &mut self.pump,
            rig,
            fatal: &mut self.fatal,
        };
        let report = self.sched.run_pending(now, &mut runner);
        match self.fatal.take() {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Force outputs low, drop every job, release the port.  Idempotent;
    /// each step is attempted even if an earlier one failed.
    pub fn shutdown<H, K, S, E>(&mut self, rig: &mut Rig<H, K, S, E>, reason: &StopReason)
    where
        H: ActuatorPort,
        E: EventSink,
    {
        if self.state == ControlState::Stopped {
            return;
        }
        self.state = ControlState::Stopping;
        info!("Controller: shutting down ({})", reason);
        rig.sink.emit(&GrowEvent::Stopping(reason.to_string()));

        if let Err(e) = self.light.drive(&mut rig.hw, Level::Off) {
            error!("Controller: could not force {:?} low: {}", Output::Light, e);
        }
        if let Err(e) = self.pump.drive(&mut rig.hw, Level::Off) {
            error!("Controller: could not force {:?} low: {}", Output::Pump, e);
        }
        self.sched.clear();
        if let Err(e) = rig.hw.release() {
            error!("Controller: port release failed: {}", e);
        }
        self.state = ControlState::Stopped;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn scheduler(&self) -> &Scheduler<Task> {
        &self.sched
    }

    pub fn light(&self) -> &LightCycle {
        &self.light
    }

    pub fn pump(&self) -> &PumpCycle {
        &self.pump
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

// ───────────────────────────────────────────────────────────────
// Task runner
// ───────────────────────────────────────────────────────────────

/// Interprets [`Task`]s against the cycle managers and ports.
struct TaskRunner<'a, H, K, S, E> {
    light: &'a mut LightCycle,
    pump: &'a mut PumpCycle,
    rig: &'a mut Rig<H, K, S, E>,
    fatal: &'a mut Option<Error>,
}

impl<H, K, S, E> JobRunner<Task> for TaskRunner<'_, H, K, S, E>
where
    H: ActuatorPort,
    K: SunTimeProvider + Geocoder,
    S: SensorPort,
    E: EventSink,
{
    fn fire(&mut self, task: &Task, now: NaiveDateTime, sched: &mut Scheduler<Task>) -> Result<()> {
        let rig = &mut *self.rig;
        match task {
            Task::LightOn => self.light.light_on(&mut rig.hw, &mut rig.sink),
            Task::LightOff => self.light.light_off(&mut rig.hw, &mut rig.sink),
            Task::RefreshLight => {
                match self.light.refresh(now, sched, &mut rig.sky, &mut rig.sink) {
                    Ok(_) => self.light.catch_up(now, &mut rig.hw, &mut rig.sink).map(|_| ()),
                    // Already recorded and a retry is armed.
                    Err(Error::Lookup(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            Task::PumpOn => self.pump.pump_on(now, sched, &mut rig.hw, &mut rig.sink),
            Task::PumpOff => self.pump.pump_off(sched, &mut rig.hw, &mut rig.sink),
            Task::Measure => {
                let snapshot = rig.sensors.sample()?;
                rig.sink.emit(&GrowEvent::MeasurementsMade(snapshot));
                Ok(())
            }
        }
    }

    fn job_failed(&mut self, id: JobId, tag: Tag, error: &Error) {
        error!("Controller: job {} ({}) failed: {}", id, tag, error);
        self.rig.sink.emit(&GrowEvent::JobFailed {
            tag,
            reason: error.to_string(),
        });
        if error.is_fatal() && self.fatal.is_none() {
            *self.fatal = Some(error.clone());
        }
    }
}
