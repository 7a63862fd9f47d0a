//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (GPIO pins, the almanac, the activity log, the wall
//! clock) implement these traits.  The [`Controller`](super::service::Controller)
//! and the cycle managers consume them via generics, so the domain core
//! never touches hardware, the network, or the filesystem directly.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ActuatorFault, LookupError, SensorError};

use super::events::GrowEvent;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → GPIO)
// ───────────────────────────────────────────────────────────────

/// Digital outputs driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    Light,
    Pump,
}

/// Digital inputs watched by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    StopButton,
}

/// Logical output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    On,
    Off,
}

impl From<bool> for Level {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// Binary control of the light and pump outputs plus the stop input.
///
/// Every failure is an [`ActuatorFault`] and is fatal to the run.
pub trait ActuatorPort {
    /// Drive an output.  Setting an output to its current level is a no-op
    /// at the hardware level and must succeed.
    fn set(&mut self, output: Output, level: Level) -> Result<(), ActuatorFault>;

    /// Read a digital input (`true` = asserted).
    fn read(&mut self, input: Input) -> Result<bool, ActuatorFault>;

    /// Force every output low and hand the pins back to the OS.
    /// Further `set`/`read` calls fail with [`ActuatorFault::Released`].
    fn release(&mut self) -> Result<(), ActuatorFault>;
}

// ───────────────────────────────────────────────────────────────
// Sky ports (driven adapters: domain → almanac / geocoder)
// ───────────────────────────────────────────────────────────────

/// Geographic position in decimal degrees (north and east positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Local sunrise and sunset for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: NaiveTime,
    pub sunset: NaiveTime,
}

/// Supplies local sunrise/sunset.  Possibly network-backed, so it may fail.
pub trait SunTimeProvider {
    fn sun_times(&mut self, date: NaiveDate, at: Coordinates) -> Result<SunTimes, LookupError>;
}

/// Resolves a place name to coordinates.
pub trait Geocoder {
    fn locate(&mut self, place: &str) -> Result<Coordinates, LookupError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: probes → domain)
// ───────────────────────────────────────────────────────────────

/// One round of environmental readings.  Probes that are not fitted
/// report `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    pub air_temperature_c: Option<f32>,
    pub water_temperature_c: Option<f32>,
    pub ph: Option<f32>,
    pub ec_ms_per_cm: Option<f32>,
}

impl SensorSnapshot {
    pub fn is_empty(&self) -> bool {
        self.air_temperature_c.is_none()
            && self.water_temperature_c.is_none()
            && self.ph.is_none()
            && self.ec_ms_per_cm.is_none()
    }
}

pub trait SensorPort {
    fn sample(&mut self) -> Result<SensorSnapshot, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → activity log)
// ───────────────────────────────────────────────────────────────

/// The domain records [`GrowEvent`]s through this port.  Adapters decide
/// where they go (append-only log file, console, test recorder).
/// Timestamps are the adapter's concern.
pub trait EventSink {
    fn emit(&mut self, event: &GrowEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Current local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}
