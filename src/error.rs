//! Unified error types for the GrowBox controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  The variants line up with how
//! the loop treats them:
//!
//! | Variant     | Severity                                             |
//! |-------------|------------------------------------------------------|
//! | `Config`    | fatal before the loop starts                         |
//! | `Lookup`    | recoverable; stale light window stays in force       |
//! | `Actuator`  | fatal to the run; triggers the cleanup path          |
//! | `Sensor`    | recoverable; logged as a job fault                   |
//! | `Scheduler` | job table full; fatal to the run                     |

use core::fmt;

use crate::app::ports::{Input, Output};

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Settings are missing or invalid.
    Config(ConfigError),
    /// Sunrise/sunset or geocoding lookup failed.
    Lookup(LookupError),
    /// A digital output write or input read failed.
    Actuator(ActuatorFault),
    /// A sensor could not be sampled.
    Sensor(SensorError),
    /// The job table rejected a new job.
    Scheduler(SchedulerError),
}

impl Error {
    /// Whether this error must end the current run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Actuator(_) | Self::Scheduler(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Lookup(e) => write!(f, "lookup: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Scheduler(e) => write!(f, "scheduler: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating [`ControllerConfig`](crate::config::ControllerConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file does not exist.
    NotFound(String),
    /// The file could not be read.
    Io(String),
    /// The file is not valid JSON, a key is missing, or a key is unknown.
    Corrupted(String),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "config not found at {path}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// External lookup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The sun never rises or never sets at this site on this date.
    NoSunEvent,
    /// The geocoder found no match for the place name.
    PlaceNotFound(String),
    /// The geocoding service could not be reached or answered garbage.
    Service(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSunEvent => write!(f, "no sunrise/sunset on this date"),
            Self::PlaceNotFound(place) => write!(f, "place not found: {place}"),
            Self::Service(msg) => write!(f, "service error: {msg}"),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<LookupError> for Error {
    fn from(e: LookupError) -> Self {
        Self::Lookup(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorFault {
    /// Setting a digital output failed.
    WriteFailed { output: Output, reason: String },
    /// Reading a digital input failed.
    ReadFailed { input: Input, reason: String },
    /// The port was used after [`release`](crate::app::ports::ActuatorPort::release).
    Released,
}

impl fmt::Display for ActuatorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { output, reason } => {
                write!(f, "{output:?} write failed: {reason}")
            }
            Self::ReadFailed { input, reason } => write!(f, "{input:?} read failed: {reason}"),
            Self::Released => write!(f, "port already released"),
        }
    }
}

impl std::error::Error for ActuatorFault {}

impl From<ActuatorFault> for Error {
    fn from(e: ActuatorFault) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The probe did not answer.
    ReadFailed(&'static str),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed(probe) => write!(f, "{probe} read failed"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Scheduler errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// All job slots are occupied.
    Full,
    /// A repeating trigger was given a zero or negative period.
    InvalidPeriod,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "job table full"),
            Self::InvalidPeriod => write!(f, "repeat period must be positive"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<SchedulerError> for Error {
    fn from(e: SchedulerError) -> Self {
        Self::Scheduler(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
