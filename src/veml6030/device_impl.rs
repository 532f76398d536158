use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::i2c::{Error as _, ErrorType, I2c, SevenBitAddress};
use log::{debug, info, warn};

use crate::veml6030::registers::Register;
use crate::veml6030::{
    lux, Config, ConfigRegister, Error, PowerSaving, PowerSavingRegister, Shutdown,
};

/// Word-wide register access to one bound target.
///
/// This is the SMBus "read word data" / "write word data" pair the chip speaks.
pub trait Bus {
    type Error: embedded_hal::i2c::Error;

    fn read_word(&mut self, register: u8) -> Result<u16, Self::Error>;
    fn write_word(&mut self, register: u8, word: u16) -> Result<(), Self::Error>;
}

/// [`Bus`] over any embedded-hal I²C implementation, bound to one address.
#[derive(Debug)]
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: SevenBitAddress,
}

impl<I2C> I2cBus<I2C> {
    pub fn new(i2c: I2C, address: SevenBitAddress) -> Self {
        I2cBus { i2c, address }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Bus for I2cBus<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    type Error = <I2C as ErrorType>::Error;

    fn read_word(&mut self, register: u8) -> Result<u16, Self::Error> {
        let mut data = [0; 2];
        self.i2c
            .write_read(self.address, &[register], &mut data)
            .and(Ok(u16::from(data[0]) | u16::from(data[1]) << 8))
    }

    fn write_word(&mut self, register: u8, value: u16) -> Result<(), Self::Error> {
        self.i2c
            .write(self.address, &[register, value as u8, (value >> 8) as u8])
    }
}

/// Where the gain and integration time used for lux conversion come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LuxSource {
    /// The configuration last written through this driver. One bus transaction
    /// per measurement; wrong if something else reconfigures the chip.
    #[default]
    Cached,
    /// Read ALS_CONF before every measurement and convert with what the chip
    /// actually holds.
    Register,
}

struct Session<B> {
    bus: B,
    config: Config,
}

impl<B: Bus> Session<B> {
    fn read(&mut self, register: Register) -> Result<u16, Error> {
        let word = self
            .bus
            .read_word(register.addr())
            .map_err(|e| Error::I2c {
                register: register.addr(),
                kind: e.kind(),
            })?;
        debug!("Read {word:#06x} from {register:?}");
        Ok(word)
    }

    fn write(&mut self, register: Register, word: u16) -> Result<(), Error> {
        debug!("Writing {word:#06x} to {register:?}");
        self.bus
            .write_word(register.addr(), word)
            .map_err(|e| Error::I2c {
                register: register.addr(),
                kind: e.kind(),
            })
    }

    fn set_config(&mut self, config: Config) -> Result<(), Error> {
        self.write(Register::Config, config.bits())?;
        self.config = config;
        Ok(())
    }

    fn measure(&mut self, register: Register, source: LuxSource) -> Result<f64, Error> {
        match source {
            LuxSource::Cached => {
                let raw = self.read(register)?;
                Ok(lux::to_lux(
                    raw,
                    self.config.gain,
                    self.config.integration_time,
                ))
            }
            LuxSource::Register => {
                let conf = ConfigRegister::from_word(self.read(Register::Config)?);
                let resolution = lux::resolution_from_bits(conf.gain, conf.integration_time)?;
                let raw = self.read(register)?;
                self.config = conf.decode()?;
                Ok(f64::from(raw) * resolution)
            }
        }
    }
}

/// VEML6030 device driver.
///
/// Holds at most one session (an open bus plus the configuration last written
/// to the chip). Every operation locks the session, so a driver shared between
/// threads serializes its bus traffic.
///
/// Lux values are computed from the cached gain and integration time. If the
/// chip is reconfigured behind the driver's back, call [`Veml6030::sync_config`]
/// or use [`LuxSource::Register`].
pub struct Veml6030<B> {
    session: Mutex<Option<Session<B>>>,
    lux_source: LuxSource,
}

impl<B> Default for Veml6030<B> {
    fn default() -> Self {
        Veml6030 {
            session: Mutex::new(None),
            lux_source: LuxSource::default(),
        }
    }
}

impl<B: Bus> Veml6030<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lux_source(self, lux_source: LuxSource) -> Self {
        Veml6030 { lux_source, ..self }
    }

    pub fn lux_source(&self) -> LuxSource {
        self.lux_source
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Starts a session on an already bound bus and writes `config` to the chip.
    ///
    /// An active session is replaced (and its bus dropped) only once the new
    /// one is up. On failure the driver is left as it was.
    ///
    /// # Errors
    /// `I2c` if the configuration write fails.
    pub fn init_with_bus(&self, bus: B, config: Config) -> Result<(), Error> {
        let mut session = Session { bus, config };
        session.set_config(config)?;

        let previous = self.lock().replace(session);
        if previous.is_some() {
            warn!("Replaced an active VEML6030 session");
        }
        info!("VEML6030 session started with {config:?}");
        Ok(())
    }

    /// Ends the session and hands the bus back; dropping it closes the device.
    ///
    /// # Errors
    /// `NotInitialized` if there is no session.
    pub fn deinit(&self) -> Result<B, Error> {
        let session = self.lock().take().ok_or(Error::NotInitialized)?;
        info!("VEML6030 session closed");
        Ok(session.bus)
    }

    /// Ambient light in lux.
    pub fn access_als(&self) -> Result<f64, Error> {
        let source = self.lux_source;
        self.with_session(|s| s.measure(Register::Als, source))
    }

    /// White channel in lux.
    pub fn access_white(&self) -> Result<f64, Error> {
        let source = self.lux_source;
        self.with_session(|s| s.measure(Register::White, source))
    }

    pub fn read_raw_als(&self) -> Result<u16, Error> {
        self.with_session(|s| s.read(Register::Als))
    }

    pub fn read_raw_white(&self) -> Result<u16, Error> {
        self.with_session(|s| s.read(Register::White))
    }

    /// Reads ALS_CONF and returns its four fields, masked but not shifted.
    pub fn access_config(&self) -> Result<ConfigRegister, Error> {
        self.with_session(|s| s.read(Register::Config).map(ConfigRegister::from_word))
    }

    /// Writes ALS_CONF; the gain and integration time become the conversion basis.
    pub fn set_config(&self, config: Config) -> Result<(), Error> {
        self.with_session(|s| s.set_config(config))
    }

    pub fn access_power_saving(&self) -> Result<PowerSavingRegister, Error> {
        self.with_session(|s| {
            s.read(Register::PowerSaving)
                .map(PowerSavingRegister::from_word)
        })
    }

    pub fn set_power_saving(&self, power_saving: PowerSaving) -> Result<(), Error> {
        self.with_session(|s| s.write(Register::PowerSaving, power_saving.bits()))
    }

    /// Re-reads ALS_CONF and makes it the conversion basis.
    ///
    /// # Errors
    /// `InvalidArgument` if the chip holds an integration time the table does
    /// not know; the cache is left untouched in that case.
    pub fn sync_config(&self) -> Result<Config, Error> {
        self.with_session(|s| {
            let config = ConfigRegister::from_word(s.read(Register::Config)?).decode()?;
            s.config = config;
            Ok(config)
        })
    }

    /// The configuration lux conversion is currently based on.
    pub fn cached_config(&self) -> Result<Config, Error> {
        self.with_session(|s| Ok(s.config))
    }

    pub fn power_on(&self) -> Result<(), Error> {
        self.with_session(|s| s.set_config(s.config.with_shutdown(Shutdown::On)))
    }

    pub fn shut_down(&self) -> Result<(), Error> {
        self.with_session(|s| s.set_config(s.config.with_shutdown(Shutdown::Sleep)))
    }

    fn with_session<T>(
        &self,
        op: impl FnOnce(&mut Session<B>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut guard = self.lock();
        let session = guard.as_mut().ok_or(Error::NotInitialized)?;
        op(session)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session<B>>> {
        // Operations are all-or-nothing, so a panic elsewhere leaves a usable session.
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    use super::*;
    use crate::veml6030::{
        Gain, IntegrationTime, Persistence, PsmEnable, PsmMode, Shutdown,
    };

    const ADDR: u8 = 0x48;

    #[derive(Debug, Default)]
    struct ChipState {
        registers: [u16; 8],
        fail_reads: bool,
        fail_writes: bool,
        transactions: usize,
    }

    /// In-memory register file standing in for the chip.
    #[derive(Debug, Clone, Default)]
    struct FakeChip {
        state: Arc<Mutex<ChipState>>,
    }

    impl FakeChip {
        fn set(&self, register: Register, word: u16) {
            self.state.lock().unwrap().registers[register.addr() as usize] = word;
        }

        fn get(&self, register: Register) -> u16 {
            self.state.lock().unwrap().registers[register.addr() as usize]
        }

        fn transactions(&self) -> usize {
            self.state.lock().unwrap().transactions
        }

        fn fail_reads(&self, fail: bool) {
            self.state.lock().unwrap().fail_reads = fail;
        }

        fn fail_writes(&self, fail: bool) {
            self.state.lock().unwrap().fail_writes = fail;
        }
    }

    impl Bus for FakeChip {
        type Error = ErrorKind;

        fn read_word(&mut self, register: u8) -> Result<u16, ErrorKind> {
            let mut state = self.state.lock().unwrap();
            state.transactions += 1;
            if state.fail_reads {
                return Err(ErrorKind::Bus);
            }
            Ok(state.registers[register as usize])
        }

        fn write_word(&mut self, register: u8, word: u16) -> Result<(), ErrorKind> {
            let mut state = self.state.lock().unwrap();
            state.transactions += 1;
            if state.fail_writes {
                return Err(ErrorKind::NoAcknowledge(
                    embedded_hal::i2c::NoAcknowledgeSource::Address,
                ));
            }
            state.registers[register as usize] = word;
            Ok(())
        }
    }

    fn ready_driver() -> (Veml6030<FakeChip>, FakeChip) {
        let chip = FakeChip::default();
        let driver = Veml6030::new();
        driver
            .init_with_bus(chip.clone(), Config::default())
            .unwrap();
        (driver, chip)
    }

    #[test]
    fn init_writes_default_config_little_endian() {
        let expectations = [
            I2cTransaction::write(ADDR, vec![0x00, 0x00, 0x08]),
            I2cTransaction::write_read(ADDR, vec![0x00], vec![0x00, 0x08]),
        ];
        let driver = Veml6030::new();
        driver
            .init_with_bus(I2cBus::new(I2cMock::new(&expectations), ADDR), Config::default())
            .unwrap();

        let conf = driver.access_config().unwrap();
        assert_eq!(
            conf,
            ConfigRegister {
                gain: 0x0800,
                integration_time: 0x0000,
                persistence: 0x0000,
                shutdown: 0x0000,
            }
        );

        driver.deinit().unwrap().release().done();
    }

    #[test]
    fn end_to_end_default_session() {
        let expectations = [
            I2cTransaction::write(ADDR, vec![0x00, 0x00, 0x08]),
            I2cTransaction::write_read(ADDR, vec![0x00], vec![0x00, 0x08]),
            I2cTransaction::write_read(ADDR, vec![0x04], vec![100, 0x00]),
            I2cTransaction::write_read(ADDR, vec![0x05], vec![0x34, 0x12]),
        ];
        let driver = Veml6030::new();
        driver
            .init_with_bus(I2cBus::new(I2cMock::new(&expectations), ADDR), Config::default())
            .unwrap();

        assert_eq!(driver.access_config().unwrap().decode(), Ok(Config::default()));
        let als = driver.access_als().unwrap();
        assert!((als - 2.88).abs() < 1e-9);
        let white = driver.access_white().unwrap();
        assert!((white - f64::from(0x1234u16) * 0.0288).abs() < 1e-9);

        let bus = driver.deinit().unwrap();
        assert_eq!(bus.address(), ADDR);
        bus.release().done();
        assert!(!driver.is_initialized());
    }

    #[test]
    fn transport_failure_surfaces_as_i2c_error() {
        let expectations = [
            I2cTransaction::write(ADDR, vec![0x00, 0x00, 0x08]),
            I2cTransaction::write_read(ADDR, vec![0x05], vec![0x00, 0x00])
                .with_error(ErrorKind::Other),
        ];
        let driver = Veml6030::new();
        driver
            .init_with_bus(I2cBus::new(I2cMock::new(&expectations), ADDR), Config::default())
            .unwrap();

        assert_eq!(
            driver.access_white(),
            Err(Error::I2c {
                register: 0x05,
                kind: ErrorKind::Other
            })
        );
        assert!(driver.is_initialized());

        driver.deinit().unwrap().release().done();
    }

    #[test]
    fn power_saving_write_is_masked_to_low_nibble() {
        let expectations = [
            I2cTransaction::write(ADDR, vec![0x00, 0x00, 0x08]),
            I2cTransaction::write(ADDR, vec![0x03, 0x05, 0x00]),
        ];
        let driver = Veml6030::new();
        driver
            .init_with_bus(I2cBus::new(I2cMock::new(&expectations), ADDR), Config::default())
            .unwrap();

        driver
            .set_power_saving(PowerSaving::new(PsmMode::Three, PsmEnable::Enable))
            .unwrap();

        driver.deinit().unwrap().release().done();
    }

    #[test]
    fn operations_without_session_are_rejected() {
        let driver: Veml6030<FakeChip> = Veml6030::new();

        assert_eq!(driver.access_als(), Err(Error::NotInitialized));
        assert_eq!(driver.access_white(), Err(Error::NotInitialized));
        assert_eq!(driver.access_config(), Err(Error::NotInitialized));
        assert_eq!(driver.access_power_saving(), Err(Error::NotInitialized));
        assert_eq!(driver.set_config(Config::default()), Err(Error::NotInitialized));
        assert_eq!(
            driver.set_power_saving(PowerSaving::default()),
            Err(Error::NotInitialized)
        );
        assert_eq!(driver.sync_config(), Err(Error::NotInitialized));
        assert_eq!(driver.power_on(), Err(Error::NotInitialized));
        assert!(matches!(driver.deinit(), Err(Error::NotInitialized)));
        assert!(!driver.is_initialized());
    }

    #[test]
    fn operations_after_deinit_are_rejected() {
        let (driver, chip) = ready_driver();
        let before = chip.transactions();

        assert!(driver.deinit().is_ok());
        assert_eq!(driver.access_als(), Err(Error::NotInitialized));
        assert_eq!(driver.set_config(Config::default()), Err(Error::NotInitialized));
        assert!(matches!(driver.deinit(), Err(Error::NotInitialized)));
        assert_eq!(chip.transactions(), before);
    }

    #[test]
    fn failed_init_leaves_driver_uninitialized() {
        let chip = FakeChip::default();
        chip.fail_writes(true);
        let driver = Veml6030::new();

        let err = driver
            .init_with_bus(chip.clone(), Config::default())
            .unwrap_err();
        assert!(matches!(err, Error::I2c { register: 0x00, .. }));
        assert!(!driver.is_initialized());
        assert_eq!(driver.access_als(), Err(Error::NotInitialized));
    }

    #[test]
    fn failed_reinit_keeps_previous_session() {
        let (driver, chip) = ready_driver();
        let other = FakeChip::default();
        other.fail_writes(true);

        assert!(driver.init_with_bus(other, Config::default()).is_err());
        chip.set(Register::Als, 10);
        assert!((driver.access_als().unwrap() - 0.288).abs() < 1e-9);
    }

    #[test]
    fn config_round_trips_for_every_combination() {
        let (driver, chip) = ready_driver();
        for gain in Gain::ALL {
            for it in IntegrationTime::ALL {
                for pers in Persistence::ALL {
                    for sd in Shutdown::ALL {
                        let config = Config::new(gain, it, pers, sd);
                        driver.set_config(config).unwrap();

                        let read = driver.access_config().unwrap();
                        assert_eq!(read, ConfigRegister::from(config));
                        assert_eq!(read.word(), chip.get(Register::Config));
                        assert_eq!(read.decode(), Ok(config));
                        assert_eq!(driver.cached_config(), Ok(config));
                    }
                }
            }
        }
    }

    #[test]
    fn power_saving_round_trips() {
        let (driver, chip) = ready_driver();
        for mode in PsmMode::ALL {
            for enable in [PsmEnable::Disable, PsmEnable::Enable] {
                let ps = PowerSaving::new(mode, enable);
                driver.set_power_saving(ps).unwrap();

                let read = driver.access_power_saving().unwrap();
                assert_eq!(read, PowerSavingRegister::from(ps));
                assert_eq!(read.decode(), ps);
                assert_eq!(chip.get(Register::PowerSaving), ps.bits());
            }
        }
        // Power saving does not touch the conversion basis.
        assert_eq!(driver.cached_config(), Ok(Config::default()));
    }

    #[test]
    fn lux_follows_the_configured_gain_and_integration_time() {
        let (driver, chip) = ready_driver();
        chip.set(Register::Als, 1000);
        chip.set(Register::White, 500);

        driver
            .set_config(
                Config::default()
                    .with_gain(Gain::OneQuarter)
                    .with_integration_time(IntegrationTime::_25ms),
            )
            .unwrap();
        assert!((driver.access_als().unwrap() - 1843.2).abs() < 1e-9);
        assert!((driver.access_white().unwrap() - 921.6).abs() < 1e-9);
        assert_eq!(driver.read_raw_als(), Ok(1000));
        assert_eq!(driver.read_raw_white(), Ok(500));
    }

    #[test]
    fn failed_set_config_keeps_the_cache() {
        let (driver, chip) = ready_driver();
        chip.fail_writes(true);

        let result = driver.set_config(Config::default().with_gain(Gain::OneEighth));
        assert!(matches!(result, Err(Error::I2c { .. })));
        assert_eq!(driver.cached_config(), Ok(Config::default()));
    }

    #[test]
    fn read_failure_is_reported() {
        let (driver, chip) = ready_driver();
        chip.fail_reads(true);

        assert_eq!(
            driver.access_als(),
            Err(Error::I2c {
                register: 0x04,
                kind: ErrorKind::Bus
            })
        );
        assert!(matches!(driver.access_config(), Err(Error::I2c { .. })));
    }

    #[test]
    fn cached_conversion_ignores_foreign_reconfiguration() {
        let (driver, chip) = ready_driver();
        chip.set(Register::Als, 100);
        // Gain 1, 800 ms written by someone else
        chip.set(Register::Config, 0x00C0);

        assert!((driver.access_als().unwrap() - 2.88).abs() < 1e-9);

        let synced = driver.sync_config().unwrap();
        assert_eq!(synced.gain, Gain::One);
        assert_eq!(synced.integration_time, IntegrationTime::_800ms);
        assert!((driver.access_als().unwrap() - 0.72).abs() < 1e-9);
    }

    #[test]
    fn register_source_converts_with_the_chip_settings() {
        let chip = FakeChip::default();
        let driver = Veml6030::new().with_lux_source(LuxSource::Register);
        driver
            .init_with_bus(chip.clone(), Config::default())
            .unwrap();
        chip.set(Register::Als, 100);
        chip.set(Register::Config, 0x1000 | 0x0200);

        assert!((driver.access_als().unwrap() - 46.08).abs() < 1e-9);
        assert_eq!(driver.cached_config().unwrap().gain, Gain::OneEighth);
    }

    #[test]
    fn unknown_integration_time_bits_are_invalid() {
        let chip = FakeChip::default();
        let driver = Veml6030::new().with_lux_source(LuxSource::Register);
        driver
            .init_with_bus(chip.clone(), Config::default())
            .unwrap();
        chip.set(Register::Config, 0x0800 | 0x0100);

        let invalid = Error::InvalidArgument {
            gain: 0x0800,
            integration_time: 0x0100,
        };
        assert_eq!(driver.access_als(), Err(invalid.clone()));
        assert_eq!(driver.access_white(), Err(invalid.clone()));
        assert_eq!(driver.sync_config(), Err(invalid));
        assert_eq!(driver.cached_config(), Ok(Config::default()));
    }

    #[test]
    fn shut_down_and_power_on_keep_other_fields() {
        let (driver, chip) = ready_driver();
        let config = Config::default().with_persistence(Persistence::Four);
        driver.set_config(config).unwrap();

        driver.shut_down().unwrap();
        assert_eq!(chip.get(Register::Config), config.bits() | 0x0001);
        driver.power_on().unwrap();
        assert_eq!(chip.get(Register::Config), config.bits());
    }

    #[test]
    fn reinit_replaces_the_session() {
        let (driver, first) = ready_driver();
        let second = FakeChip::default();
        second.set(Register::Als, 100);

        driver
            .init_with_bus(second.clone(), Config::default().with_gain(Gain::One))
            .unwrap();
        assert!((driver.access_als().unwrap() - 5.76).abs() < 1e-9);
        assert_eq!(first.transactions(), 1);
        assert_eq!(second.get(Register::Config), 0x0000);
    }

    #[test]
    fn shared_driver_serializes_callers() {
        let (driver, chip) = ready_driver();
        chip.set(Register::Als, 100);
        let driver = Arc::new(driver);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let driver = driver.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        assert!((driver.access_als().unwrap() - 2.88).abs() < 1e-9);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(chip.transactions(), 1 + 100);
    }
}
