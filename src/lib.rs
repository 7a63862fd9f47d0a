//! GrowBox controller library.
//!
//! Exposes the scheduler, the domain core and the adapters for the binary
//! and for integration testing.  Everything that touches real hardware,
//! the network or the filesystem lives under [`adapters`] and [`drivers`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod scheduler;

mod pins;

pub use error::{Error, Result};
