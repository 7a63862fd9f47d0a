//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                  |
//! |------------|---------------------|------------------------------|
//! | `almanac`  | SunTimeProvider     | Local solar calculation      |
//! |            | Geocoder            | Nominatim search (optional)  |
//! | `hardware` | ActuatorPort        | embedded-hal digital pins    |
//! |            | SensorPort          | (no probes fitted)           |
//! | `log_sink` | EventSink           | Append-only activity file    |
//! | `time`     | Clock, DelayNs      | Host wall clock and sleep    |

pub mod almanac;
pub mod hardware;
pub mod log_sink;
pub mod time;
