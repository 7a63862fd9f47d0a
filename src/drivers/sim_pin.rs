//! In-memory pin for hosts without GPIO.
//!
//! Level changes are logged at debug level.  A simulated input reads
//! whatever level it was created with, so a simulated stop button is never
//! pressed.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::debug;

#[derive(Debug, Clone)]
pub struct SimPin {
    label: &'static str,
    high: bool,
}

impl SimPin {
    pub fn new(label: &'static str) -> Self {
        Self { label, high: false }
    }

    pub fn is_set_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            debug!("sim {}: low", self.label);
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            debug!("sim {}: high", self.label);
        }
        self.high = true;
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}
