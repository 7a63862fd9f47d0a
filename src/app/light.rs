//! Grow-light cycle.
//!
//! The light runs from a fixed offset before sunset until a fixed offset
//! after the next sunrise.  [`LightCycle::refresh`] derives that window
//! from the almanac and reinstalls the two daily `light_task` jobs; the
//! refresh itself is scheduled nightly under `light_update_task`.
//!
//! Window edges are wall-clock times of day.  Shifting a sun time by an
//! offset wraps around midnight instead of moving to another date, so the
//! window usually straddles midnight (`on` in the evening, `off` in the
//! morning).

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use log::{info, warn};

use crate::config::{ControllerConfig, Site};
use crate::error::{Error, Result};
use crate::scheduler::{JobId, Scheduler, Tag, Trigger};

use super::commands::Task;
use super::events::GrowEvent;
use super::ports::{ActuatorPort, Coordinates, EventSink, Geocoder, Level, Output, SunTimeProvider, SunTimes};

// ═══════════════════════════════════════════════════════════════
//  Light window
// ═══════════════════════════════════════════════════════════════

/// Daily light-on / light-off pair, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightWindow {
    pub on: NaiveTime,
    pub off: NaiveTime,
}

impl LightWindow {
    /// `on = sunset - before_sunset`, `off = sunrise + after_sunrise`,
    /// both wrapped to a time of day.
    pub fn from_sun(sun: SunTimes, before_sunset: Duration, after_sunrise: Duration) -> Self {
        let (on, _) = sun.sunset.overflowing_sub_signed(before_sunset);
        let (off, _) = sun.sunrise.overflowing_add_signed(after_sunrise);
        Self {
            on: to_minute(on),
            off: to_minute(off),
        }
    }

    /// Whether `on` comes after `off` on the clock face.
    pub fn straddles_midnight(&self) -> bool {
        self.on > self.off
    }

    /// Whether the light should be on at `now`.  Both edges inclusive.
    pub fn contains(&self, now: NaiveTime) -> bool {
        if self.straddles_midnight() {
            now >= self.on || now <= self.off
        } else {
            now >= self.on && now <= self.off
        }
    }
}

fn to_minute(t: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}

// ═══════════════════════════════════════════════════════════════
//  Cycle manager
// ═══════════════════════════════════════════════════════════════

/// Owns the light's logical state and the current window.
pub struct LightCycle {
    before_sunset: Duration,
    after_sunrise: Duration,
    retry_after: Duration,
    site: Site,
    /// Cached geocoding result for [`Site::Place`].
    coordinates: Option<Coordinates>,
    window: Option<LightWindow>,
    lit: bool,
}

impl LightCycle {
    pub fn new(config: &ControllerConfig) -> Self {
        let coordinates = match config.site {
            Site::Coordinates(c) => Some(c),
            Site::Place { .. } => None,
        };
        Self {
            before_sunset: config.before_sunset(),
            after_sunrise: config.after_sunrise(),
            retry_after: config.lookup_retry(),
            site: config.site.clone(),
            coordinates,
            window: None,
            lit: false,
        }
    }

    /// Window currently installed, `None` until the first successful refresh.
    pub fn window(&self) -> Option<LightWindow> {
        self.window
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Install the nightly refresh job.
    pub fn install(
        &self,
        refresh_at: NaiveTime,
        sched: &mut Scheduler<Task>,
        now: NaiveDateTime,
    ) -> Result<JobId> {
        Ok(sched.schedule(Tag::LightUpdate, Trigger::DailyAt(refresh_at), Task::RefreshLight, now)?)
    }

    /// Recompute today's window and replace the `light_task` jobs.
    ///
    /// On a lookup failure the previous window and its jobs stay in force
    /// and a single retry is armed under `light_retry_task`.
    pub fn refresh(
        &mut self,
        now: NaiveDateTime,
        sched: &mut Scheduler<Task>,
        sky: &mut (impl SunTimeProvider + Geocoder),
        sink: &mut impl EventSink,
    ) -> Result<LightWindow> {
        let window = match self.compute_window(now, sky) {
            Ok(w) => w,
            Err(e) => {
                warn!("Light: sun time lookup failed: {}", e);
                sink.emit(&GrowEvent::SunLookupFailed(e.to_string()));
                sched.cancel_tag(Tag::LightRetry);
                sched.schedule(
                    Tag::LightRetry,
                    Trigger::After(self.retry_after),
                    Task::RefreshLight,
                    now,
                )?;
                return Err(e);
            }
        };

        sched.cancel_tag(Tag::Light);
        sched.cancel_tag(Tag::LightRetry);
        sched.schedule(Tag::Light, Trigger::DailyAt(window.on), Task::LightOn, now)?;
        sched.schedule(Tag::Light, Trigger::DailyAt(window.off), Task::LightOff, now)?;
        self.window = Some(window);

        info!(
            "Light: window {}–{}",
            window.on.format("%H:%M"),
            window.off.format("%H:%M")
        );
        sink.emit(&GrowEvent::SunTimesUpdated {
            on: window.on,
            off: window.off,
        });
        Ok(window)
    }

    fn compute_window(
        &mut self,
        now: NaiveDateTime,
        sky: &mut (impl SunTimeProvider + Geocoder),
    ) -> Result<LightWindow> {
        let at = self.coordinates(sky)?;
        let sun = sky.sun_times(now.date(), at)?;
        Ok(LightWindow::from_sun(sun, self.before_sunset, self.after_sunrise))
    }

    fn coordinates(&mut self, sky: &mut impl Geocoder) -> Result<Coordinates> {
        if let Some(c) = self.coordinates {
            return Ok(c);
        }
        let place = match &self.site {
            Site::Place { place } => place.as_str(),
            Site::Coordinates(c) => return Ok(*c),
        };
        let c = sky.locate(place).map_err(Error::from)?;
        info!("Light: '{}' is at {:.4}, {:.4}", place, c.latitude, c.longitude);
        self.coordinates = Some(c);
        Ok(c)
    }

    /// Switch the light if it disagrees with the installed window at `now`.
    ///
    /// Needed after a refresh outside startup: the replacement jobs only
    /// fire on their next edge, and an edge that moved across `now` would
    /// otherwise be skipped for a whole day.  Returns whether it switched.
    pub fn catch_up(
        &mut self,
        now: NaiveDateTime,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<bool> {
        let Some(window) = self.window else {
            return Ok(false);
        };
        match (window.contains(now.time()), self.lit) {
            (true, false) => self.light_on(hw, sink)?,
            (false, true) => self.light_off(hw, sink)?,
            _ => return Ok(false),
        }
        info!("Light: caught up with window at {}", now.time().format("%H:%M"));
        Ok(true)
    }

    // ── Actuation ─────────────────────────────────────────────

    pub fn light_on(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) -> Result<()> {
        self.drive(hw, Level::On)?;
        info!("Light: on");
        sink.emit(&GrowEvent::LightsOn);
        Ok(())
    }

    pub fn light_off(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) -> Result<()> {
        self.drive(hw, Level::Off)?;
        info!("Light: off");
        sink.emit(&GrowEvent::LightsOff);
        Ok(())
    }

    /// Set the output without recording an activity event.
    pub(crate) fn drive(&mut self, hw: &mut impl ActuatorPort, level: Level) -> Result<()> {
        hw.set(Output::Light, level)?;
        self.lit = level == Level::On;
        Ok(())
    }
}
