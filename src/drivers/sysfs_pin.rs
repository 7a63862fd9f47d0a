//! Linux sysfs GPIO pin (`/sys/class/gpio`).
//!
//! ## Lifecycle
//!
//! `open` exports the pin if it is not already visible, then sets its
//! direction.  Outputs are opened low.  On drop, a pin this process
//! exported is unexported again; a pin that was already exported is left
//! alone.
//!
//! The sysfs root is configurable so the driver can be exercised against
//! a plain directory tree in tests.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use log::{debug, warn};

/// Default sysfs GPIO root on Linux.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    /// Output, driven low on open.
    Output,
}

/// A failed sysfs file operation.
pub struct SysfsError {
    pin: u32,
    op: &'static str,
    reason: String,
}

impl SysfsError {
    fn new(pin: u32, op: &'static str, e: impl fmt::Display) -> Self {
        Self {
            pin,
            op,
            reason: e.to_string(),
        }
    }
}

impl fmt::Debug for SysfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{} {}: {}", self.pin, self.op, self.reason)
    }
}

impl fmt::Display for SysfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for SysfsError {}

impl embedded_hal::digital::Error for SysfsError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    root: PathBuf,
    value: PathBuf,
    /// Whether `open` exported the pin (and `drop` should unexport it).
    exported: bool,
}

impl SysfsPin {
    pub fn open(number: u32, mode: PinMode) -> Result<Self, SysfsError> {
        Self::open_at(Path::new(SYSFS_GPIO_ROOT), number, mode)
    }

    pub fn open_at(root: &Path, number: u32, mode: PinMode) -> Result<Self, SysfsError> {
        let dir = root.join(format!("gpio{number}"));
        let exported = if dir.exists() {
            false
        } else {
            fs::write(root.join("export"), number.to_string())
                .map_err(|e| SysfsError::new(number, "export", e))?;
            true
        };
        // From here on `drop` unexports if we exported.
        let pin = Self {
            number,
            root: root.to_path_buf(),
            value: dir.join("value"),
            exported,
        };

        let direction = match mode {
            PinMode::Input => "in",
            PinMode::Output => "low",
        };
        fs::write(dir.join("direction"), direction)
            .map_err(|e| SysfsError::new(number, "direction", e))?;
        debug!("gpio{}: opened as {:?}", number, mode);
        Ok(pin)
    }

    fn write_value(&mut self, high: bool) -> Result<(), SysfsError> {
        fs::write(&self.value, if high { "1" } else { "0" })
            .map_err(|e| SysfsError::new(self.number, "write", e))
    }

    fn read_value(&mut self) -> Result<bool, SysfsError> {
        let raw = fs::read_to_string(&self.value)
            .map_err(|e| SysfsError::new(self.number, "read", e))?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(SysfsError::new(
                self.number,
                "read",
                format!("unexpected value '{other}'"),
            )),
        }
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if !self.exported {
            return;
        }
        if let Err(e) = fs::write(self.root.join("unexport"), self.number.to_string()) {
            warn!("gpio{}: unexport failed: {}", self.number, e);
        }
    }
}

impl ErrorType for SysfsPin {
    type Error = SysfsError;
}

impl OutputPin for SysfsPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_value(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_value(true)
    }
}

impl InputPin for SysfsPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.read_value()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.read_value().map(|high| !high)
    }
}
