//! Digital pin drivers implementing the `embedded-hal` 1.0 pin traits.

pub mod sim_pin;
pub mod sysfs_pin;
