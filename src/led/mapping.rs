//! Logical position to physical pixel mapping

use crate::position::{POSITION_COUNT, Position};

/// One of the two physical strips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Strip {
    First,
    Second,
}

impl Strip {
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// Physical location of a position's center pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelAddress {
    pub strip: Strip,
    pub index: usize,
}

const fn on_first(index: usize) -> PixelAddress {
    PixelAddress {
        strip: Strip::First,
        index,
    }
}

const fn on_second(index: usize) -> PixelAddress {
    PixelAddress {
        strip: Strip::Second,
        index,
    }
}

/// Pixel addresses for A through Y
const ADDRESSES: [PixelAddress; POSITION_COUNT] = [
    // Row 1
    on_first(153),
    on_first(165),
    on_first(177),
    on_second(177),
    on_second(165),
    on_second(153),
    // Row 2
    on_first(130),
    on_first(118),
    on_first(105),
    on_first(92),
    on_second(105),
    on_second(118),
    on_second(130),
    // Row 3
    on_first(55),
    on_first(67),
    on_first(79),
    on_second(79),
    on_second(67),
    on_second(55),
    // Row 4
    on_first(34),
    on_first(22),
    on_first(10),
    on_second(10),
    on_second(22),
    on_second(34),
];

/// Center pixel of a position
pub const fn address_of(position: Position) -> PixelAddress {
    ADDRESSES[position.index()]
}
