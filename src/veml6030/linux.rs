//! Linux `/dev/i2c-*` transport.

use std::path::Path;

use linux_embedded_hal::I2cdev;
use log::info;

use crate::veml6030::{Config, Error, I2cBus, Veml6030};

pub type LinuxBus = I2cBus<I2cdev>;

/// Opens the character device at `path` and binds `address` as the target.
///
/// # Errors
/// - `Device` if the node cannot be opened (missing adapter, permissions)
/// - `Driver` if `address` is not a 7-bit address or the kernel rejects it
pub fn open(path: impl AsRef<Path>, address: u8) -> Result<LinuxBus, Error> {
    let path = path.as_ref();
    let mut i2c = I2cdev::new(path).map_err(|e| Error::Device {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let address = seven_bit_address(address)?;
    // I2C_SLAVE ioctl on the freshly opened fd, only to surface a rejected
    // address (EBUSY when a kernel driver owns it) as `Driver`. I2cdev reopens
    // the node and rebinds on its first transaction.
    i2c.set_slave_address(u16::from(address))
        .map_err(|e| Error::Driver {
            address,
            reason: e.to_string(),
        })?;

    info!("Opened {} for address {address:#04x}", path.display());
    Ok(I2cBus::new(i2c, address))
}

fn seven_bit_address(address: u8) -> Result<u8, Error> {
    if address > 0x7F {
        return Err(Error::Driver {
            address,
            reason: "not a 7-bit address".to_owned(),
        });
    }
    Ok(address)
}

impl Veml6030<LinuxBus> {
    /// Opens the bus and applies the default configuration
    /// (gain 2, 100 ms, persistence 1, powered on).
    pub fn init(&self, path: impl AsRef<Path>, address: u8) -> Result<(), Error> {
        self.init_with_config(path, address, Config::default())
    }

    pub fn init_with_config(
        &self,
        path: impl AsRef<Path>,
        address: u8,
        config: Config,
    ) -> Result<(), Error> {
        let bus = open(path, address)?;
        self.init_with_bus(bus, config)
    }
}
