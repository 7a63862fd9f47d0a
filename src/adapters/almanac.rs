//! Sunrise/sunset almanac and place-name geocoder.
//!
//! [`SolarCalculator`] computes sun times locally (no network), using the
//! classic almanac approximation with the standard refraction-corrected
//! zenith of 90.833°.  Accuracy is within a couple of minutes at temperate
//! latitudes, which is far below the light window's minute resolution.
//!
//! [`NominatimGeocoder`] resolves a place name through OpenStreetMap's
//! Nominatim search API (behind the `geocode` feature).
//!
//! [`Almanac`] bundles the two so the controller sees a single sky adapter.

use chrono::{Datelike, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone};
use log::debug;

use crate::app::ports::{Coordinates, Geocoder, SunTimeProvider, SunTimes};
use crate::error::LookupError;

/// Official sunrise/sunset zenith, degrees.
const ZENITH_OFFICIAL: f64 = 90.833;

// ═══════════════════════════════════════════════════════════════
//  Solar calculator
// ═══════════════════════════════════════════════════════════════

/// Which UTC offset converts solar times to wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtcOffsetSource {
    /// The host's local timezone, DST included.
    Local,
    /// A fixed offset (tests, or hosts whose TZ is wrong).
    Fixed(FixedOffset),
}

#[derive(Debug, Clone, Copy)]
pub struct SolarCalculator {
    offset: UtcOffsetSource,
    zenith: f64,
}

impl Default for SolarCalculator {
    fn default() -> Self {
        Self::local()
    }
}

impl SolarCalculator {
    pub fn local() -> Self {
        Self {
            offset: UtcOffsetSource::Local,
            zenith: ZENITH_OFFICIAL,
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: UtcOffsetSource::Fixed(offset),
            zenith: ZENITH_OFFICIAL,
        }
    }

    /// UTC offset in seconds in force around midday on `date`.
    fn offset_secs(&self, date: NaiveDate) -> i64 {
        match self.offset {
            UtcOffsetSource::Fixed(fo) => i64::from(fo.local_minus_utc()),
            UtcOffsetSource::Local => date
                .and_hms_opt(12, 0, 0)
                .map(|noon| i64::from(Local.offset_from_utc_datetime(&noon).local_minus_utc()))
                .unwrap_or(0),
        }
    }

    /// Sun event in UTC hours, `None` when the sun stays above or below
    /// the horizon all day.
    fn event_utc_hours(&self, date: NaiveDate, at: Coordinates, rising: bool) -> Option<f64> {
        let day = f64::from(date.ordinal());
        let lng_hour = at.longitude / 15.0;
        let t = if rising {
            day + (6.0 - lng_hour) / 24.0
        } else {
            day + (18.0 - lng_hour) / 24.0
        };

        // Mean anomaly and true longitude of the sun.
        let m = 0.9856 * t - 3.289;
        let l = normalize_deg(m + 1.916 * sin_deg(m) + 0.020 * sin_deg(2.0 * m) + 282.634);

        // Right ascension, in the same quadrant as L, in hours.
        let mut ra = normalize_deg(atan_deg(0.91764 * tan_deg(l)));
        ra += (l / 90.0).floor() * 90.0 - (ra / 90.0).floor() * 90.0;
        ra /= 15.0;

        let sin_dec = 0.39782 * sin_deg(l);
        let cos_dec = sin_dec.asin().cos();

        let cos_h = (cos_deg(self.zenith) - sin_dec * sin_deg(at.latitude))
            / (cos_dec * cos_deg(at.latitude));
        if !(-1.0..=1.0).contains(&cos_h) {
            return None;
        }

        let h = (if rising {
            360.0 - acos_deg(cos_h)
        } else {
            acos_deg(cos_h)
        }) / 15.0;

        let local_mean = h + ra - 0.06571 * t - 6.622;
        Some((local_mean - lng_hour).rem_euclid(24.0))
    }

    fn wall_clock(&self, date: NaiveDate, utc_hours: f64) -> NaiveTime {
        let secs = ((utc_hours * 3600.0).round() as i64 + self.offset_secs(date)).rem_euclid(86_400);
        NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, 0).unwrap_or_default()
    }
}

impl SunTimeProvider for SolarCalculator {
    fn sun_times(&mut self, date: NaiveDate, at: Coordinates) -> Result<SunTimes, LookupError> {
        let rise = self.event_utc_hours(date, at, true);
        let set = self.event_utc_hours(date, at, false);
        let (Some(rise), Some(set)) = (rise, set) else {
            return Err(LookupError::NoSunEvent);
        };
        let sun = SunTimes {
            sunrise: self.wall_clock(date, rise),
            sunset: self.wall_clock(date, set),
        };
        debug!(
            "Almanac: {} at {:.3},{:.3}: sunrise {} sunset {}",
            date, at.latitude, at.longitude, sun.sunrise, sun.sunset
        );
        Ok(sun)
    }
}

fn normalize_deg(d: f64) -> f64 {
    d.rem_euclid(360.0)
}

fn sin_deg(d: f64) -> f64 {
    d.to_radians().sin()
}

fn cos_deg(d: f64) -> f64 {
    d.to_radians().cos()
}

fn tan_deg(d: f64) -> f64 {
    d.to_radians().tan()
}

fn atan_deg(x: f64) -> f64 {
    x.atan().to_degrees()
}

fn acos_deg(x: f64) -> f64 {
    x.acos().to_degrees()
}

// ═══════════════════════════════════════════════════════════════
//  Geocoding
// ═══════════════════════════════════════════════════════════════

/// Stand-in used when no geocoding service is available.  Every lookup
/// fails, so configurations must give explicit coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn locate(&mut self, place: &str) -> Result<Coordinates, LookupError> {
        Err(LookupError::Service(format!(
            "no geocoder available to resolve '{place}'"
        )))
    }
}

#[cfg(feature = "geocode")]
pub use nominatim::NominatimGeocoder;

#[cfg(feature = "geocode")]
mod nominatim {
    use std::time::Duration;

    use log::info;
    use serde::Deserialize;

    use super::{Coordinates, Geocoder, LookupError};

    const SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
    /// Nominatim's usage policy requires an identifying User-Agent.
    const USER_AGENT: &str = concat!("growbox/", env!("CARGO_PKG_VERSION"));

    #[derive(Debug, Deserialize)]
    struct Hit {
        lat: String,
        lon: String,
        #[serde(default)]
        display_name: String,
    }

    pub struct NominatimGeocoder {
        client: reqwest::blocking::Client,
        url: String,
    }

    impl NominatimGeocoder {
        pub fn new() -> Result<Self, LookupError> {
            Self::with_url(SEARCH_URL)
        }

        pub fn with_url(url: &str) -> Result<Self, LookupError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(USER_AGENT)
                .build()
                .map_err(|e| LookupError::Service(format!("failed to create HTTP client: {e}")))?;
            Ok(Self {
                client,
                url: url.to_owned(),
            })
        }
    }

    impl Geocoder for NominatimGeocoder {
        fn locate(&mut self, place: &str) -> Result<Coordinates, LookupError> {
            let response = self
                .client
                .get(&self.url)
                .query(&[("q", place), ("format", "json"), ("limit", "1")])
                .send()
                .map_err(|e| LookupError::Service(format!("request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(LookupError::Service(format!(
                    "HTTP {} from {}",
                    response.status(),
                    self.url
                )));
            }

            let hits: Vec<Hit> = response
                .json()
                .map_err(|e| LookupError::Service(format!("bad response: {e}")))?;
            let hit = hits
                .into_iter()
                .next()
                .ok_or_else(|| LookupError::PlaceNotFound(place.to_owned()))?;
            let parse = |s: &str| {
                s.parse::<f64>()
                    .map_err(|e| LookupError::Service(format!("bad coordinate '{s}': {e}")))
            };
            let c = Coordinates {
                latitude: parse(&hit.lat)?,
                longitude: parse(&hit.lon)?,
            };
            info!("Geocoder: '{}' -> {}", place, hit.display_name);
            Ok(c)
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Combined sky adapter
// ═══════════════════════════════════════════════════════════════

/// Sun times plus geocoding behind one value.
pub struct Almanac<G = NoGeocoder> {
    pub solar: SolarCalculator,
    pub geocoder: G,
}

impl<G: Geocoder> Almanac<G> {
    pub fn new(solar: SolarCalculator, geocoder: G) -> Self {
        Self { solar, geocoder }
    }
}

impl<G> SunTimeProvider for Almanac<G> {
    fn sun_times(&mut self, date: NaiveDate, at: Coordinates) -> Result<SunTimes, LookupError> {
        self.solar.sun_times(date, at)
    }
}

impl<G: Geocoder> Geocoder for Almanac<G> {
    fn locate(&mut self, place: &str) -> Result<Coordinates, LookupError> {
        self.geocoder.locate(place)
    }
}
