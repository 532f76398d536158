/// VEML6030 register map (Vishay VEML6030 datasheet, document 84366).
///
/// Every register is 16 bits wide and accessed as an SMBus word, low byte first.
///
/// | Register      | Address | Access | Contents                                  |
/// |---------------|---------|--------|-------------------------------------------|
/// | ALS_CONF      | 0x00    | W/R    | gain, integration time, persistence, SD   |
/// | POWER_SAVING  | 0x03    | W/R    | PSM mode and PSM enable                   |
/// | ALS           | 0x04    | R      | ambient light count                       |
/// | WHITE         | 0x05    | R      | white channel count                       |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Config = 0x00,
    PowerSaving = 0x03,
    Als = 0x04,
    White = 0x05,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

pub const GAIN_MASK: u16 = 0x1800;
// Bits 9:6; only 0x0000, 0x0040, 0x0080, 0x00C0, 0x0200 and 0x0300 are defined
pub const IT_MASK: u16 = 0x03C0;
pub const PERS_MASK: u16 = 0x0030;
pub const SD_MASK: u16 = 0x0001;

pub const PSM_MASK: u16 = 0x0006;
pub const PSM_EN_MASK: u16 = 0x0001;

/// Width of the configuration word written to ALS_CONF.
pub const CONFIG_WRITE_MASK: u16 = 0xFFFF;
/// Only the low nibble of POWER_SAVING is meaningful.
pub const PS_WRITE_MASK: u16 = 0x000F;

/// Default 7-bit address with the ADDR pin pulled high.
pub const DEFAULT_ADDRESS: u8 = 0x48;
