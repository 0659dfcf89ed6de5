//! CAP1188 register operations
//!
//! Each sensor is wired with only input CS1 in use, so every status and
//! delta read looks at that input alone.

use crate::config::{
    CAP1188_CS1_BIT_MASK, CAP1188_MAIN_CONTROL_INT, CAP1188_PRODUCT_ID, CAP1188_REG_CALIBRATION_ACTIVE,
    CAP1188_REG_MAIN_CONTROL, CAP1188_REG_MULTIPLE_TOUCH_CONFIG, CAP1188_REG_PRODUCT_ID,
    CAP1188_REG_SENSITIVITY_CONTROL, CAP1188_REG_SENSOR_INPUT_DELTA_1,
    CAP1188_REG_SENSOR_INPUT_ENABLE, CAP1188_REG_SENSOR_INPUT_STATUS, CAP1188_REG_STANDBY_CONFIG,
    CAP1188_SENSITIVITY_MASK, CAP1188_SENSITIVITY_SHIFT, CAP1188_STANDBY_FAST_CYCLE,
};

use super::Sensitivity;
use super::bus::{BusError, RegisterBus};

/// One sensor at a fixed bus address
pub(crate) struct Cap1188<'a, B: ?Sized> {
    bus: &'a mut B,
    address: u8,
}

impl<'a, B: RegisterBus + ?Sized> Cap1188<'a, B> {
    pub(crate) fn new(bus: &'a mut B, address: u8) -> Self {
        Self { bus, address }
    }

    /// Check the product id and configure the sensor
    ///
    /// Returns `Ok(false)` if something else answers at the address.
    pub(crate) fn probe(&mut self) -> Result<bool, BusError> {
        if self.read(CAP1188_REG_PRODUCT_ID)? != CAP1188_PRODUCT_ID {
            return Ok(false);
        }
        // Multiple simultaneous touches allowed
        self.write(CAP1188_REG_MULTIPLE_TOUCH_CONFIG, 0x00)?;
        self.write(CAP1188_REG_STANDBY_CONFIG, CAP1188_STANDBY_FAST_CYCLE)?;
        self.write(CAP1188_REG_SENSOR_INPUT_ENABLE, CAP1188_CS1_BIT_MASK)?;
        Ok(true)
    }

    /// Read the CS1 touch status
    ///
    /// A touched read also clears the interrupt bit so the status latches
    /// again on the next cycle.
    pub(crate) fn read_touched(&mut self) -> Result<bool, BusError> {
        let status = self.read(CAP1188_REG_SENSOR_INPUT_STATUS)?;
        let touched = status & CAP1188_CS1_BIT_MASK != 0;
        if touched {
            if let Ok(control) = self.read(CAP1188_REG_MAIN_CONTROL) {
                // Status itself was read fine, a failed clear is retried next cycle
                let _ = self.write(CAP1188_REG_MAIN_CONTROL, control & !CAP1188_MAIN_CONTROL_INT);
            }
        }
        Ok(touched)
    }

    pub(crate) fn recalibrate(&mut self) -> Result<(), BusError> {
        self.write(CAP1188_REG_CALIBRATION_ACTIVE, CAP1188_CS1_BIT_MASK)
    }

    /// Read-modify-write of the DELTA_SENSE field
    pub(crate) fn set_sensitivity(&mut self, level: Sensitivity) -> Result<(), BusError> {
        let current = self.read(CAP1188_REG_SENSITIVITY_CONTROL)?;
        let field = (level.get() << CAP1188_SENSITIVITY_SHIFT) & CAP1188_SENSITIVITY_MASK;
        self.write(
            CAP1188_REG_SENSITIVITY_CONTROL,
            (current & !CAP1188_SENSITIVITY_MASK) | field,
        )
    }

    /// Signed delta count of CS1
    pub(crate) fn read_delta(&mut self) -> Result<i8, BusError> {
        let raw = self.read(CAP1188_REG_SENSOR_INPUT_DELTA_1)?;
        Ok(i8::from_ne_bytes([raw]))
    }

    fn read(&mut self, register: u8) -> Result<u8, BusError> {
        self.bus.read_register(self.address, register)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.bus.write_register(self.address, register, value)
    }
}
