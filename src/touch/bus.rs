//! Register-level access to devices on the shared two-wire bus

use core::fmt;

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// Failure of a single register transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// No device answered at the address
    NoAcknowledge,
    /// Any other transfer failure
    Transfer,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAcknowledge => f.write_str("no acknowledge"),
            Self::Transfer => f.write_str("transfer failed"),
        }
    }
}

/// Single-byte register reads and writes
pub trait RegisterBus {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError>;

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        (**self).read_register(address, register)
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        (**self).write_register(address, register, value)
    }
}

/// [`RegisterBus`] over an `embedded-hal` I2C bus
pub struct I2cRegisters<I>(pub I);

impl<I: I2c> RegisterBus for I2cRegisters<I> {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let mut value = [0u8; 1];
        self.0
            .write_read(address, &[register], &mut value)
            .map_err(|error| classify(error.kind()))?;
        Ok(value[0])
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.0
            .write(address, &[register, value])
            .map_err(|error| classify(error.kind()))
    }
}

fn classify(kind: ErrorKind) -> BusError {
    match kind {
        ErrorKind::NoAcknowledge(_) => BusError::NoAcknowledge,
        _ => BusError::Transfer,
    }
}
