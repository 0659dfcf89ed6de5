use smart_leds::{SmartLedsWrite, brightness};

use crate::OutputDriver;
use crate::color::Rgb;
use crate::config::LED_BRIGHTNESS_DEFAULT;
use crate::log::log_warn;

/// [`OutputDriver`] over any `smart-leds` strip driver
///
/// Global brightness is applied on the way out so frame buffers always hold
/// full-scale colors.
pub struct SmartLedsOutput<W> {
    writer: W,
    brightness: u8,
}

impl<W> SmartLedsOutput<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            brightness: LED_BRIGHTNESS_DEFAULT,
        }
    }

    #[must_use]
    pub const fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = brightness;
        self
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> OutputDriver for SmartLedsOutput<W>
where
    W: SmartLedsWrite,
    W::Color: From<Rgb>,
{
    fn write(&mut self, colors: &[Rgb]) {
        let scaled = brightness(colors.iter().copied(), self.brightness);
        if self.writer.write(scaled).is_err() {
            log_warn!("[SmartLedsOutput.write] strip transfer failed");
        }
    }
}
