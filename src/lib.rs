//! User-space driver for the Vishay VEML6030 ambient light sensor.
//!
//! The driver speaks SMBus word transactions through the embedded-hal I²C
//! traits; with the `linux` feature (default) it opens `/dev/i2c-*` adapters
//! directly.
//!
//! ```no_run
//! use veml6030_rs::veml6030::{linux::LinuxBus, Veml6030};
//!
//! let sensor = Veml6030::<LinuxBus>::new();
//! sensor.init("/dev/i2c-3", 0x48)?;
//! println!("{} lux", sensor.access_als()?);
//! sensor.deinit()?;
//! # Ok::<(), veml6030_rs::veml6030::Error>(())
//! ```

pub mod helpers;
pub mod veml6030;

pub use veml6030::{Config, Error, PowerSaving, Veml6030};
