use crate::configuration::Ups;
use log::debug;
use std::error::Error;

/// Source of 16-bit register words
///
/// Implemented by [`I2cBus`] on the real hardware. Any failure is a transport error and is fatal
/// for the run.
pub trait RegisterBus {
    /// Reads the word stored at `register`, as returned by an SMBus word read
    fn read_word(&mut self, register: u8) -> Result<u16, Box<dyn Error>>;
}

/// The two words read from the fuel gauge, in the byte order delivered by the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRegisterPair {
    /// Content of the voltage register
    pub voltage: u16,

    /// Content of the capacity register
    pub capacity: u16,
}

/// Battery values in physical units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryReading {
    /// Cell voltage in V
    pub voltage: f64,

    /// State of charge in %. Not clamped, it can exceed 100.
    pub capacity: f64,
}

/// Swaps the two bytes of a word read over SMBus
///
/// SMBus delivers the low byte first while the gauge stores its registers high byte first.
///
/// ```
/// assert_eq!(x728_ups_monitor::ups::swap_bytes(0x2000), 0x0020);
/// ```
pub fn swap_bytes(raw: u16) -> u16 {
    raw.swap_bytes()
}

impl RawRegisterPair {
    /// Reads both registers configured in `ups`
    pub fn read(bus: &mut impl RegisterBus, ups: &Ups) -> Result<RawRegisterPair, Box<dyn Error>> {
        let raw = RawRegisterPair {
            voltage: bus.read_word(ups.voltage_register)?,
            capacity: bus.read_word(ups.capacity_register)?,
        };
        debug!(
            "Read voltage register {:#04x}: {:#06x}, capacity register {:#04x}: {:#06x}",
            ups.voltage_register, raw.voltage, ups.capacity_register, raw.capacity
        );
        Ok(raw)
    }
}

impl BatteryReading {
    /// Decodes the raw registers
    ///
    /// The voltage register has a resolution of 1.25 mV / 16, the capacity register of 1/256 %.
    pub fn decode(raw: RawRegisterPair) -> BatteryReading {
        BatteryReading {
            voltage: f64::from(swap_bytes(raw.voltage)) * 1.25 / 1000.0 / 16.0,
            capacity: f64::from(swap_bytes(raw.capacity)) / 256.0,
        }
    }
}

impl From<RawRegisterPair> for BatteryReading {
    fn from(raw: RawRegisterPair) -> Self {
        BatteryReading::decode(raw)
    }
}

#[cfg(feature = "i2c")]
pub use self::i2c::I2cBus;

#[cfg(feature = "i2c")]
mod i2c {
    use super::RegisterBus;
    use crate::configuration::Ups;
    use log::debug;
    use rppal::i2c::I2c;
    use std::error::Error;

    /// Fuel gauge reached through `/dev/i2c-N`
    pub struct I2cBus {
        i2c: I2c,
    }

    impl I2cBus {
        /// Opens the bus configured in `ups` and selects the gauge address
        pub fn open(ups: &Ups) -> Result<I2cBus, Box<dyn Error>> {
            debug!("Opening I2C bus {} at address {:#04x}", ups.bus, ups.address);
            let mut i2c = I2c::with_bus(ups.bus)?;
            i2c.set_slave_address(ups.address)?;
            Ok(I2cBus { i2c })
        }
    }

    impl RegisterBus for I2cBus {
        fn read_word(&mut self, register: u8) -> Result<u16, Box<dyn Error>> {
            Ok(self.i2c.smbus_read_word(register)?)
        }
    }
}
