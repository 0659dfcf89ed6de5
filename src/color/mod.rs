use smart_leds::RGB8;

pub type Rgb = RGB8;

/// Pure green at the given level, used by the completion pulse
pub const fn green(level: u8) -> Rgb {
    Rgb { r: 0, g: level, b: 0 }
}
