mod device_impl;
#[cfg(feature = "linux")]
pub mod linux;
pub mod lux;
pub mod registers;

use core::str::FromStr;

use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

use registers::{GAIN_MASK, IT_MASK, PERS_MASK, PSM_EN_MASK, PSM_MASK, SD_MASK};

pub use device_impl::{Bus, I2cBus, LuxSource, Veml6030};

/// All possible errors in this crate
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The bus device node could not be opened.
    #[error("could not open I2C device {path}: {reason}")]
    Device { path: String, reason: String },
    /// The bus refused the target address.
    #[error("could not bind I2C address {address:#04x}: {reason}")]
    Driver { address: u8, reason: String },
    /// A register transaction failed after the session was established.
    #[error("I2C transaction on register {register:#04x} failed: {kind}")]
    I2c { register: u8, kind: ErrorKind },
    /// Gain or integration time bits that have no entry in the resolution table.
    #[error("no lux resolution for gain bits {gain:#06x} and integration time bits {integration_time:#06x}")]
    InvalidArgument { gain: u16, integration_time: u16 },
    /// The driver has no open session.
    #[error("VEML6030 session not initialized; call init() first")]
    NotInitialized,
}

/// Unrecognized textual value for one of the configuration enums.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized {setting} `{value}`")]
pub struct ParseSettingError {
    pub setting: &'static str,
    pub value: String,
}

impl ParseSettingError {
    fn new(setting: &'static str, value: &str) -> Self {
        Self {
            setting,
            value: value.to_owned(),
        }
    }
}

/// ALS gain (ALS_SM, bits 12:11 of ALS_CONF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Gain {
    /// 1 (power-on default of the chip)
    One = 0x0000,
    /// 2
    Two = 0x0800,
    /// 1/8
    OneEighth = 0x1000,
    /// 1/4
    OneQuarter = 0x1800,
}

impl Gain {
    pub const ALL: [Gain; 4] = [Gain::Two, Gain::One, Gain::OneEighth, Gain::OneQuarter];

    pub const fn bits(self) -> u16 {
        self as u16
    }

    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits & GAIN_MASK {
            0x0000 => Some(Gain::One),
            0x0800 => Some(Gain::Two),
            0x1000 => Some(Gain::OneEighth),
            0x1800 => Some(Gain::OneQuarter),
            _ => None,
        }
    }
}

impl FromStr for Gain {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches(['x', 'X']) {
            "1" => Ok(Gain::One),
            "2" => Ok(Gain::Two),
            "1/8" | "0.125" => Ok(Gain::OneEighth),
            "1/4" | "0.25" => Ok(Gain::OneQuarter),
            _ => Err(ParseSettingError::new("gain", s)),
        }
    }
}

/// Integration time (ALS_IT, bits 9:6 of ALS_CONF)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum IntegrationTime {
    /// 25 ms
    _25ms = 0x0300,
    /// 50 ms
    _50ms = 0x0200,
    /// 100 ms
    _100ms = 0x0000,
    /// 200 ms
    _200ms = 0x0040,
    /// 400 ms
    _400ms = 0x0080,
    /// 800 ms
    _800ms = 0x00C0,
}

impl IntegrationTime {
    pub const ALL: [IntegrationTime; 6] = [
        IntegrationTime::_800ms,
        IntegrationTime::_400ms,
        IntegrationTime::_200ms,
        IntegrationTime::_100ms,
        IntegrationTime::_50ms,
        IntegrationTime::_25ms,
    ];

    pub const fn bits(self) -> u16 {
        self as u16
    }

    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits & IT_MASK {
            0x0300 => Some(IntegrationTime::_25ms),
            0x0200 => Some(IntegrationTime::_50ms),
            0x0000 => Some(IntegrationTime::_100ms),
            0x0040 => Some(IntegrationTime::_200ms),
            0x0080 => Some(IntegrationTime::_400ms),
            0x00C0 => Some(IntegrationTime::_800ms),
            _ => None,
        }
    }

    /// Return the integration time in milliseconds
    pub fn as_ms(&self) -> u16 {
        match self {
            IntegrationTime::_25ms => 25,
            IntegrationTime::_50ms => 50,
            IntegrationTime::_100ms => 100,
            IntegrationTime::_200ms => 200,
            IntegrationTime::_400ms => 400,
            IntegrationTime::_800ms => 800,
        }
    }
}

impl FromStr for IntegrationTime {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches("ms") {
            "25" => Ok(IntegrationTime::_25ms),
            "50" => Ok(IntegrationTime::_50ms),
            "100" => Ok(IntegrationTime::_100ms),
            "200" => Ok(IntegrationTime::_200ms),
            "400" => Ok(IntegrationTime::_400ms),
            "800" => Ok(IntegrationTime::_800ms),
            _ => Err(ParseSettingError::new("integration time", s)),
        }
    }
}

/// Persistence protect number (ALS_PERS, bits 5:4 of ALS_CONF)
///
/// Number of consecutive threshold violations needed to raise the interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Persistence {
    /// One (default)
    One = 0x0000,
    /// Two
    Two = 0x0010,
    /// Four
    Four = 0x0020,
    /// Eight
    Eight = 0x0030,
}

impl Persistence {
    pub const ALL: [Persistence; 4] = [
        Persistence::One,
        Persistence::Two,
        Persistence::Four,
        Persistence::Eight,
    ];

    pub const fn bits(self) -> u16 {
        self as u16
    }

    pub fn from_bits(bits: u16) -> Self {
        match bits & PERS_MASK {
            0x0010 => Persistence::Two,
            0x0020 => Persistence::Four,
            0x0030 => Persistence::Eight,
            _ => Persistence::One,
        }
    }
}

impl FromStr for Persistence {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Persistence::One),
            "2" => Ok(Persistence::Two),
            "4" => Ok(Persistence::Four),
            "8" => Ok(Persistence::Eight),
            _ => Err(ParseSettingError::new("persistence", s)),
        }
    }
}

/// ALS shutdown setting (ALS_SD, bit 0 of ALS_CONF)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Shutdown {
    /// Power on
    On = 0x0000,
    /// Shut down
    Sleep = 0x0001,
}

impl Shutdown {
    pub const ALL: [Shutdown; 2] = [Shutdown::On, Shutdown::Sleep];

    pub const fn bits(self) -> u16 {
        self as u16
    }

    pub fn from_bits(bits: u16) -> Self {
        if bits & SD_MASK == 0 {
            Shutdown::On
        } else {
            Shutdown::Sleep
        }
    }
}

/// Power-saving mode
///
/// This combined with the integration time determines the refresh time
/// and the power consumption of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PsmMode {
    /// One
    One = 0x0000,
    /// Two
    Two = 0x0002,
    /// Three
    Three = 0x0004,
    /// Four
    Four = 0x0006,
}

impl PsmMode {
    pub const ALL: [PsmMode; 4] = [PsmMode::One, PsmMode::Two, PsmMode::Three, PsmMode::Four];

    pub const fn bits(self) -> u16 {
        self as u16
    }

    pub fn from_bits(bits: u16) -> Self {
        match bits & PSM_MASK {
            0x0002 => PsmMode::Two,
            0x0004 => PsmMode::Three,
            0x0006 => PsmMode::Four,
            _ => PsmMode::One,
        }
    }
}

impl FromStr for PsmMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(PsmMode::One),
            "2" => Ok(PsmMode::Two),
            "3" => Ok(PsmMode::Three),
            "4" => Ok(PsmMode::Four),
            _ => Err(ParseSettingError::new("power-saving mode", s)),
        }
    }
}

/// Power-saving enable (PSM_EN, bit 0 of POWER_SAVING)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PsmEnable {
    Disable = 0x0000,
    Enable = 0x0001,
}

impl PsmEnable {
    pub const fn bits(self) -> u16 {
        self as u16
    }

    pub fn from_bits(bits: u16) -> Self {
        if bits & PSM_EN_MASK == 0 {
            PsmEnable::Disable
        } else {
            PsmEnable::Enable
        }
    }
}

impl From<bool> for PsmEnable {
    fn from(enabled: bool) -> Self {
        if enabled {
            PsmEnable::Enable
        } else {
            PsmEnable::Disable
        }
    }
}

/// Contents of the ALS_CONF register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub gain: Gain,
    pub integration_time: IntegrationTime,
    pub persistence: Persistence,
    pub shutdown: Shutdown,
}

impl Config {
    pub const fn new(
        gain: Gain,
        integration_time: IntegrationTime,
        persistence: Persistence,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            gain,
            integration_time,
            persistence,
            shutdown,
        }
    }

    pub fn with_gain(self, gain: Gain) -> Self {
        Self { gain, ..self }
    }

    pub fn with_integration_time(self, integration_time: IntegrationTime) -> Self {
        Self {
            integration_time,
            ..self
        }
    }

    pub fn with_persistence(self, persistence: Persistence) -> Self {
        Self {
            persistence,
            ..self
        }
    }

    pub fn with_shutdown(self, shutdown: Shutdown) -> Self {
        Self { shutdown, ..self }
    }

    /// Register word as written to ALS_CONF.
    pub fn bits(&self) -> u16 {
        (self.gain.bits()
            | self.integration_time.bits()
            | self.persistence.bits()
            | self.shutdown.bits())
            & registers::CONFIG_WRITE_MASK
    }
}

/// Gain 2, 100 ms, persistence 1, powered on.
impl Default for Config {
    fn default() -> Self {
        Self::new(
            Gain::Two,
            IntegrationTime::_100ms,
            Persistence::One,
            Shutdown::On,
        )
    }
}

/// ALS_CONF as read back from the chip: each field is the raw bit pattern
/// under its mask, comparable against the `bits()` of the matching enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRegister {
    pub gain: u16,
    pub integration_time: u16,
    pub persistence: u16,
    pub shutdown: u16,
}

impl ConfigRegister {
    pub fn from_word(word: u16) -> Self {
        Self {
            gain: word & GAIN_MASK,
            integration_time: word & IT_MASK,
            persistence: word & PERS_MASK,
            shutdown: word & SD_MASK,
        }
    }

    /// The fields ORed back together.
    pub fn word(&self) -> u16 {
        self.gain | self.integration_time | self.persistence | self.shutdown
    }

    /// Decodes the raw fields into a typed configuration.
    ///
    /// # Errors
    /// `InvalidArgument` when the integration time bits hold an undefined pattern.
    pub fn decode(&self) -> Result<Config, Error> {
        let invalid = Error::InvalidArgument {
            gain: self.gain,
            integration_time: self.integration_time,
        };
        let gain = Gain::from_bits(self.gain).ok_or_else(|| invalid.clone())?;
        let integration_time =
            IntegrationTime::from_bits(self.integration_time).ok_or(invalid)?;
        Ok(Config {
            gain,
            integration_time,
            persistence: Persistence::from_bits(self.persistence),
            shutdown: Shutdown::from_bits(self.shutdown),
        })
    }
}

impl From<Config> for ConfigRegister {
    fn from(config: Config) -> Self {
        Self::from_word(config.bits())
    }
}

/// Contents of the POWER_SAVING register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSaving {
    pub mode: PsmMode,
    pub enable: PsmEnable,
}

impl PowerSaving {
    pub const fn new(mode: PsmMode, enable: PsmEnable) -> Self {
        Self { mode, enable }
    }

    pub fn bits(&self) -> u16 {
        (self.mode.bits() | self.enable.bits()) & registers::PS_WRITE_MASK
    }
}

impl Default for PowerSaving {
    fn default() -> Self {
        Self::new(PsmMode::One, PsmEnable::Disable)
    }
}

/// POWER_SAVING as read back from the chip, fields masked but not shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSavingRegister {
    pub mode: u16,
    pub enable: u16,
}

impl PowerSavingRegister {
    pub fn from_word(word: u16) -> Self {
        Self {
            mode: word & PSM_MASK,
            enable: word & PSM_EN_MASK,
        }
    }

    pub fn decode(&self) -> PowerSaving {
        PowerSaving {
            mode: PsmMode::from_bits(self.mode),
            enable: PsmEnable::from_bits(self.enable),
        }
    }
}

impl From<PowerSaving> for PowerSavingRegister {
    fn from(ps: PowerSaving) -> Self {
        Self::from_word(ps.bits())
    }
}
