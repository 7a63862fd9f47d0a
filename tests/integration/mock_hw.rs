//! Mock adapters for integration tests.
//!
//! Records every actuator call and every emitted event so tests can assert
//! on the full history without touching GPIO, the network, or the
//! filesystem.  [`SimClock`] doubles as the loop's delay so simulated time
//! only moves when the controller sleeps.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use embedded_hal::delay::DelayNs;

use growbox::app::events::GrowEvent;
use growbox::app::ports::{
    ActuatorPort, Clock, Coordinates, EventSink, Geocoder, Input, Level, Output, SensorPort,
    SensorSnapshot, SunTimeProvider, SunTimes,
};
use growbox::app::service::Rig;
use growbox::config::{ControllerConfig, Site};
use growbox::error::{ActuatorFault, LookupError, SensorError};

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// `day` June 2024 at `h:m`.
pub fn june(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_time(hm(h, m))
}

/// Sunrise 06:00, sunset 20:00: with the default 2 h offsets the window
/// is 18:00 to 08:00.
pub fn sun(rise: NaiveTime, set: NaiveTime) -> SunTimes {
    SunTimes {
        sunrise: rise,
        sunset: set,
    }
}

pub fn default_sun() -> SunTimes {
    sun(hm(6, 0), hm(20, 0))
}

pub const ST_LOUIS: Coordinates = Coordinates {
    latitude: 38.627,
    longitude: -90.199,
};

/// Defaults with the self-test off, explicit coordinates and a one-minute
/// polling quantum.
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        system_check: false,
        site: Site::Coordinates(ST_LOUIS),
        poll_interval_ms: 60_000,
        ..ControllerConfig::default()
    }
}

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCall {
    Set(Output, Level),
    Release,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<HwCall>,
    /// The stop button reads high from this read onwards (1-based).
    pub stop_on_read: Option<usize>,
    pub reads: usize,
    /// Writes matching this fail with `EIO`.
    pub fail_on: Option<(Output, Level)>,
    released: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            stop_on_read: None,
            reads: 0,
            fail_on: None,
            released: false,
        }
    }

    pub fn stopping_after(reads: usize) -> Self {
        Self {
            stop_on_read: Some(reads),
            ..Self::new()
        }
    }

    /// Current level of `output` (outputs start low).
    pub fn level(&self, output: Output) -> Level {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                HwCall::Set(o, level) if *o == output => Some(*level),
                _ => None,
            })
            .unwrap_or(Level::Off)
    }

    pub fn sets(&self, output: Output) -> Vec<Level> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Set(o, level) if *o == output => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn release_count(&self) -> usize {
        self.calls.iter().filter(|c| **c == HwCall::Release).count()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn set(&mut self, output: Output, level: Level) -> Result<(), ActuatorFault> {
        if self.released {
            return Err(ActuatorFault::Released);
        }
        if self.fail_on == Some((output, level)) {
            return Err(ActuatorFault::WriteFailed {
                output,
                reason: "EIO".into(),
            });
        }
        self.calls.push(HwCall::Set(output, level));
        Ok(())
    }

    fn read(&mut self, input: Input) -> Result<bool, ActuatorFault> {
        assert_eq!(input, Input::StopButton);
        if self.released {
            return Err(ActuatorFault::Released);
        }
        self.reads += 1;
        Ok(self.stop_on_read.is_some_and(|n| self.reads >= n))
    }

    fn release(&mut self) -> Result<(), ActuatorFault> {
        self.calls.push(HwCall::Release);
        self.released = true;
        Ok(())
    }
}

// ── MockSky ───────────────────────────────────────────────────

/// Scripted sun times.  Queued responses are served first, then `fallback`.
pub struct MockSky {
    pub queued: VecDeque<Result<SunTimes, LookupError>>,
    pub fallback: SunTimes,
    pub lookups: Vec<(NaiveDate, Coordinates)>,
    pub locate_calls: usize,
    pub place_found: bool,
}

#[allow(dead_code)]
impl MockSky {
    pub fn new() -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: default_sun(),
            lookups: Vec::new(),
            locate_calls: 0,
            place_found: true,
        }
    }

    pub fn then(mut self, response: Result<SunTimes, LookupError>) -> Self {
        self.queued.push_back(response);
        self
    }
}

impl Default for MockSky {
    fn default() -> Self {
        Self::new()
    }
}

impl SunTimeProvider for MockSky {
    fn sun_times(&mut self, date: NaiveDate, at: Coordinates) -> Result<SunTimes, LookupError> {
        self.lookups.push((date, at));
        self.queued.pop_front().unwrap_or(Ok(self.fallback))
    }
}

impl Geocoder for MockSky {
    fn locate(&mut self, place: &str) -> Result<Coordinates, LookupError> {
        self.locate_calls += 1;
        if self.place_found {
            Ok(ST_LOUIS)
        } else {
            Err(LookupError::PlaceNotFound(place.to_owned()))
        }
    }
}

// ── MockSensors ───────────────────────────────────────────────

pub struct MockSensors {
    pub next: Result<SensorSnapshot, SensorError>,
    pub samples: usize,
}

impl Default for MockSensors {
    fn default() -> Self {
        Self {
            next: Ok(SensorSnapshot {
                water_temperature_c: Some(21.0),
                ph: Some(6.1),
                ..SensorSnapshot::default()
            }),
            samples: 0,
        }
    }
}

impl SensorPort for MockSensors {
    fn sample(&mut self) -> Result<SensorSnapshot, SensorError> {
        self.samples += 1;
        self.next.clone()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<GrowEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&GrowEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn position(&self, event: &GrowEvent) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &GrowEvent) {
        self.events.push(event.clone());
    }
}

// ── SimClock ──────────────────────────────────────────────────

/// Shared simulated wall clock.  Clones see the same time.
#[derive(Clone)]
pub struct SimClock(Rc<Cell<NaiveDateTime>>);

#[allow(dead_code)]
impl SimClock {
    pub fn at(t: NaiveDateTime) -> Self {
        Self(Rc::new(Cell::new(t)))
    }

    pub fn set(&self, t: NaiveDateTime) {
        self.0.set(t);
    }

    pub fn advance(&self, d: Duration) {
        self.0.set(self.0.get() + d);
    }
}

impl Clock for SimClock {
    fn now(&self) -> NaiveDateTime {
        self.0.get()
    }
}

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(Duration::nanoseconds(i64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(Duration::milliseconds(i64::from(ms)));
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type MockRig = Rig<MockHardware, MockSky, MockSensors, RecordingSink>;

pub fn rig(hw: MockHardware, sky: MockSky) -> MockRig {
    Rig {
        hw,
        sky,
        sensors: MockSensors::default(),
        sink: RecordingSink::default(),
    }
}
