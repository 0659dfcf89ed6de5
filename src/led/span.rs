use crate::color::Rgb;

/// Contiguous run of pixels on one strip, `end` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSpan {
    pub start: usize,
    pub end: usize,
}

impl PixelSpan {
    /// Pixels within `radius` of `center`, clipped to a strip of `len`
    pub const fn around(center: usize, radius: u8, len: usize) -> Self {
        let radius = radius as usize;
        let start = center.saturating_sub(radius);
        let mut end = center.saturating_add(radius).saturating_add(1);
        if end > len {
            end = len;
        }
        if start >= end {
            return Self { start: 0, end: 0 };
        }
        Self { start, end }
    }

    /// Get the number of pixels in the span
    pub const fn count(self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(self) -> bool {
        self.count() == 0
    }
}

/// Get the pixels within the span, empty if it does not fit
pub(crate) fn bounded(pixels: &mut [Rgb], span: PixelSpan) -> &mut [Rgb] {
    pixels.get_mut(span.start..span.end).unwrap_or_default()
}

/// The two pixels exactly `radius` away from `center` that exist on the strip
pub(crate) fn ring(center: usize, radius: u8, len: usize) -> impl Iterator<Item = usize> {
    let radius = radius as usize;
    let left = center.checked_sub(radius);
    let right = center.checked_add(radius).filter(|&index| index < len);
    left.into_iter()
        .chain(right.filter(|_| radius > 0))
        .filter(move |&index| index < len)
}
