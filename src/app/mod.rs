//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the grow box: the light
//! window, the pump burst cycle, startup reconciliation, and the control
//! loop that drives the scheduler.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod light;
pub mod ports;
pub mod pump;
pub mod service;
pub mod startup;
