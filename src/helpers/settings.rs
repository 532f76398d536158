use std::path::PathBuf;

use clap::Parser;

use crate::helpers::running_average::MAX_WINDOW;
use crate::veml6030::registers::DEFAULT_ADDRESS;
use crate::veml6030::{
    Config, Gain, IntegrationTime, Persistence, PowerSaving, PsmEnable, PsmMode, Shutdown,
};

/// Poll a VEML6030 ambient light sensor and print lux readings.
#[derive(Debug, Clone, Parser)]
#[command(name = "veml6030", version, about, long_about = None)]
pub struct Settings {
    /// I2C adapter device node
    #[arg(short, long, default_value = "/dev/i2c-3")]
    pub bus: PathBuf,

    /// 7-bit sensor address, hex (0x48) or decimal
    #[arg(short, long, default_value_t = DEFAULT_ADDRESS, value_parser = parse_address)]
    pub address: u8,

    /// Number of samples to take, 0 polls forever
    #[arg(short = 'n', long, default_value_t = 60)]
    pub samples: u32,

    /// Delay between samples
    #[arg(short, long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// ALS gain: 2, 1, 1/4 or 1/8
    #[arg(short, long, default_value = "2")]
    pub gain: Gain,

    /// Integration time: 25, 50, 100, 200, 400 or 800 ms
    #[arg(short = 't', long, default_value = "100ms")]
    pub integration_time: IntegrationTime,

    /// Interrupt persistence: 1, 2, 4 or 8
    #[arg(short, long, default_value = "1")]
    pub persistence: Persistence,

    /// Power-saving mode 1 to 4
    #[arg(long, default_value = "1")]
    pub psm_mode: PsmMode,

    /// Enable power-saving mode
    #[arg(long)]
    pub psm_enable: bool,

    /// Read the configuration register before every measurement
    #[arg(long)]
    pub read_back: bool,

    /// Number of samples in the running average
    #[arg(short, long, default_value_t = 30, value_parser = parse_window)]
    pub window: usize,

    /// Print the running average every N samples
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..))]
    pub report_every: u16,
}

impl Settings {
    pub fn config(&self) -> Config {
        Config::new(
            self.gain,
            self.integration_time,
            self.persistence,
            Shutdown::On,
        )
    }

    pub fn power_saving(&self) -> PowerSaving {
        PowerSaving::new(self.psm_mode, PsmEnable::from(self.psm_enable))
    }
}

fn parse_address(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    match parsed {
        Ok(address) if address <= 0x7F => Ok(address),
        Ok(address) => Err(format!("{address:#04x} is not a 7-bit address")),
        Err(e) => Err(format!("invalid address `{s}`: {e}")),
    }
}

fn parse_window(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(window) if (1..=MAX_WINDOW).contains(&window) => Ok(window),
        Ok(window) => Err(format!("window {window} is outside 1..={MAX_WINDOW}")),
        Err(e) => Err(format!("invalid window `{s}`: {e}")),
    }
}
