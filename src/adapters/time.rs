//! Host time adapters.
//!
//! - [`SystemClock`] reads the local wall clock (naive, DST-following).
//! - [`StdDelay`] blocks the calling thread for `embedded-hal` delays.

use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
