//! Controller configuration.
//!
//! Loaded once at startup from a JSON file and frozen for the life of the
//! process.  Every key is required; unknown keys are rejected.  Values are
//! range-checked by [`ControllerConfig::validate`] before the loop starts.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveTime};
use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::Coordinates;
use crate::error::ConfigError;
use crate::pins;

/// Where the rig is, for sunrise/sunset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Site {
    /// Explicit coordinates.
    Coordinates(Coordinates),
    /// Place name, resolved through the geocoder.
    Place { place: String },
}

/// Digital pin numbers (BCM numbering on a Raspberry Pi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinConfig {
    pub light: u32,
    pub pump: u32,
    pub stop_button: u32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            light: pins::LIGHT_GPIO,
            pump: pins::PUMP_GPIO,
            stop_button: pins::STOP_BUTTON_GPIO,
        }
    }
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    // --- Light ---
    /// Hours after sunrise at which the light switches off
    pub hours_after_sunrise: f64,
    /// Hours before sunset at which the light switches on
    pub hours_before_sunset: f64,
    /// Wall-clock time of the nightly light-window refresh ("HH:MM")
    #[serde(with = "hh_mm")]
    pub light_refresh_at: NaiveTime,
    /// Delay before retrying a failed sun-time lookup
    pub lookup_retry_minutes: u32,

    // --- Pump ---
    /// Hours between pump bursts
    pub pump_cycle_hours: f64,
    /// Minutes the pump stays on per burst
    pub pump_on_minutes: u32,

    // --- Sensors ---
    pub measurement_interval_minutes: u32,

    // --- Loop ---
    /// Polling quantum of the control loop
    pub poll_interval_ms: u64,
    /// Exercise the outputs once at startup
    pub system_check: bool,

    // --- I/O ---
    pub pins: PinConfig,
    /// Append-only activity log
    pub log_path: PathBuf,
    pub site: Site,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Light
            hours_after_sunrise: 2.0,
            hours_before_sunset: 2.0,
            light_refresh_at: NaiveTime::from_hms_opt(23, 45, 0).unwrap_or_default(),
            lookup_retry_minutes: 15,

            // Pump
            pump_cycle_hours: 3.0,
            pump_on_minutes: 30,

            // Sensors
            measurement_interval_minutes: 60,

            // Loop
            poll_interval_ms: 1000, // 1 Hz
            system_check: true,

            // I/O
            pins: PinConfig::default(),
            log_path: PathBuf::from("./Data/logfile.txt"),
            site: Site::Place {
                place: "Saint Louis".into(),
            },
        }
    }
}

impl ControllerConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(e.to_string()),
        })?;
        let config = Self::from_json(&raw)?;
        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let offset_ok = |h: f64| h.is_finite() && (0.0..12.0).contains(&h);
        if !offset_ok(self.hours_after_sunrise) {
            return Err(ConfigError::ValidationFailed(
                "hours_after_sunrise must be in [0, 12)",
            ));
        }
        if !offset_ok(self.hours_before_sunset) {
            return Err(ConfigError::ValidationFailed(
                "hours_before_sunset must be in [0, 12)",
            ));
        }
        if !(self.pump_cycle_hours.is_finite()
            && self.pump_cycle_hours > 0.0
            && self.pump_cycle_hours <= 168.0)
        {
            return Err(ConfigError::ValidationFailed("pump_cycle_hours must be in (0, 168]"));
        }
        if self.pump_on_minutes == 0 {
            return Err(ConfigError::ValidationFailed("pump_on_minutes must be > 0"));
        }
        if self.pump_on() >= self.pump_cycle() {
            return Err(ConfigError::ValidationFailed(
                "pump_on_minutes must be shorter than pump_cycle_hours",
            ));
        }
        if self.measurement_interval_minutes == 0 {
            return Err(ConfigError::ValidationFailed(
                "measurement_interval_minutes must be > 0",
            ));
        }
        if self.lookup_retry_minutes == 0 {
            return Err(ConfigError::ValidationFailed("lookup_retry_minutes must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be > 0"));
        }
        let p = self.pins;
        if p.light == p.pump || p.light == p.stop_button || p.pump == p.stop_button {
            return Err(ConfigError::ValidationFailed("pins must be distinct"));
        }
        match &self.site {
            Site::Coordinates(c) => {
                if !(-90.0..=90.0).contains(&c.latitude) {
                    return Err(ConfigError::ValidationFailed("latitude must be in [-90, 90]"));
                }
                if !(-180.0..=180.0).contains(&c.longitude) {
                    return Err(ConfigError::ValidationFailed(
                        "longitude must be in [-180, 180]",
                    ));
                }
            }
            Site::Place { place } => {
                if place.trim().is_empty() {
                    return Err(ConfigError::ValidationFailed("place must not be empty"));
                }
            }
        }
        Ok(())
    }

    // ── Derived durations ─────────────────────────────────────

    pub fn after_sunrise(&self) -> Duration {
        hours(self.hours_after_sunrise)
    }

    pub fn before_sunset(&self) -> Duration {
        hours(self.hours_before_sunset)
    }

    pub fn pump_cycle(&self) -> Duration {
        hours(self.pump_cycle_hours)
    }

    pub fn pump_on(&self) -> Duration {
        Duration::minutes(i64::from(self.pump_on_minutes))
    }

    pub fn measurement_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.measurement_interval_minutes))
    }

    pub fn lookup_retry(&self) -> Duration {
        Duration::minutes(i64::from(self.lookup_retry_minutes))
    }
}

/// Fractional hours, rounded to whole seconds.
fn hours(h: f64) -> Duration {
    Duration::seconds((h * 3600.0).round() as i64)
}

/// `NaiveTime` as "HH:MM".
mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
