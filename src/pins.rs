//! Default pin assignments for the grow-box wiring harness.
//!
//! BCM numbering on a Raspberry Pi header.  These only seed
//! [`PinConfig::default`](crate::config::PinConfig); the config file is the
//! source of truth at runtime.

/// Digital output: grow-light relay (active HIGH).
pub const LIGHT_GPIO: u32 = 23;

/// Digital output: water-pump relay (active HIGH).
pub const PUMP_GPIO: u32 = 24;

/// Digital input: stop push-button, pulled down, HIGH when pressed.
pub const STOP_BUTTON_GPIO: u32 = 25;
