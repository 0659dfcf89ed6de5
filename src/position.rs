//! Logical positions A through Y
//!
//! A position names both an LED location and the touch channel aligned with
//! it. All per-position tables are indexed through [`Position::index`], so an
//! out-of-range index can never be constructed.

use core::fmt;

use crate::config::LED_POSITION_COUNT;

/// Number of logical positions
pub const POSITION_COUNT: usize = LED_POSITION_COUNT;

const FIRST_LETTER: u8 = b'A';

/// One of the 25 logical positions (A-Y)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position(u8);

impl Position {
    pub const A: Self = Self(0);
    pub const Y: Self = Self(POSITION_COUNT as u8 - 1);

    /// Position from its zero based index
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < POSITION_COUNT {
            #[allow(clippy::cast_possible_truncation)]
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Position from a letter, case-insensitive
    pub const fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        Self::from_index(upper as usize - FIRST_LETTER as usize)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn letter(self) -> char {
        (FIRST_LETTER + self.0) as char
    }

    /// Iterate every position in order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..POSITION_COUNT).filter_map(Self::from_index)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
