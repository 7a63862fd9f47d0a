//! Outbound activity events.
//!
//! The controller and the cycle managers emit these through the
//! [`EventSink`](super::ports::EventSink) port.  `Display` renders the
//! human-readable activity-log line (without timestamp).

use core::fmt;

use chrono::NaiveTime;

use crate::scheduler::Tag;

use super::ports::SensorSnapshot;

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, PartialEq)]
pub enum GrowEvent {
    /// The process came up and reconciled actuator state.
    ProgramStarted,

    LightsOn,
    LightsOff,

    /// A new light window was computed and installed.
    SunTimesUpdated { on: NaiveTime, off: NaiveTime },

    /// Sunrise/sunset or geocoding failed; the previous window stays.
    SunLookupFailed(String),

    PumpOn,
    PumpOff,

    MeasurementsMade(SensorSnapshot),

    /// A scheduled action returned an error.
    JobFailed { tag: Tag, reason: String },

    SystemCheckStarted,
    SystemCheckCompleted,

    /// The control loop is shutting down.
    Stopping(String),
}

impl fmt::Display for GrowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgramStarted => write!(f, "Program started"),
            Self::LightsOn => write!(f, "Lights turned on"),
            Self::LightsOff => write!(f, "Lights turned off"),
            Self::SunTimesUpdated { on, off } => write!(
                f,
                "Sun times updated (on {}, off {})",
                on.format("%H:%M"),
                off.format("%H:%M")
            ),
            Self::SunLookupFailed(reason) => write!(f, "Sun time lookup failed: {reason}"),
            Self::PumpOn => write!(f, "Pump turned on"),
            Self::PumpOff => write!(f, "Pump turned off"),
            Self::MeasurementsMade(snap) => {
                write!(f, "Measurements made:")?;
                if snap.is_empty() {
                    return write!(f, " no probes fitted");
                }
                if let Some(t) = snap.air_temperature_c {
                    write!(f, " air={t:.1}C")?;
                }
                if let Some(t) = snap.water_temperature_c {
                    write!(f, " water={t:.1}C")?;
                }
                if let Some(ph) = snap.ph {
                    write!(f, " pH={ph:.2}")?;
                }
                if let Some(ec) = snap.ec_ms_per_cm {
                    write!(f, " EC={ec:.2}mS/cm")?;
                }
                Ok(())
            }
            Self::JobFailed { tag, reason } => write!(f, "Job {tag} failed: {reason}"),
            Self::SystemCheckStarted => write!(f, "System check started"),
            Self::SystemCheckCompleted => write!(f, "System check completed"),
            Self::Stopping(reason) => write!(f, "Program stopping: {reason}"),
        }
    }
}
