//! Whole-strip animations that run independently of position state

use embassy_time::Instant;

use crate::color::Rgb;
use crate::config::LedTimings;
use crate::elapsed;

/// Outcome of advancing a global animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Step interval not reached yet
    Idle,
    /// Fill both strips with this color
    Fill(Rgb),
    /// Light one absolute index on both strips
    Pixel(usize, Rgb),
    /// Animation is over
    Finished,
}

/// Green brightness ramp, up then down, repeated `pulse_count` times
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pulse {
    step: u32,
    last_step: Instant,
}

impl Pulse {
    pub(crate) const fn new(now: Instant) -> Self {
        Self {
            step: 0,
            last_step: now,
        }
    }

    pub(crate) fn advance(&mut self, now: Instant, timings: &LedTimings) -> Frame {
        if elapsed(self.last_step, now) < timings.pulse_step {
            return Frame::Idle;
        }
        self.step += 1;
        self.last_step = now;

        let ramp = u32::from(timings.pulse_steps).max(1);
        let total = u32::from(timings.pulse_count) * ramp * 2;
        if self.step >= total {
            return Frame::Finished;
        }
        Frame::Fill(crate::color::green(level_at(
            self.step % (ramp * 2),
            ramp,
            timings.pulse_peak,
        )))
    }
}

/// Linear ramp: 0 to `peak` over `ramp` steps, then back down
fn level_at(position: u32, ramp: u32, peak: u8) -> u8 {
    let peak32 = u32::from(peak);
    let level = if position < ramp {
        position * peak32 / ramp
    } else {
        peak32 - (position - ramp) * peak32 / ramp
    };
    u8::try_from(level).unwrap_or(peak)
}

/// Lights indices `0..=range` one at a time in a single color
#[derive(Debug, Clone, Copy)]
pub(crate) struct Sweep {
    color: Rgb,
    range: u8,
    next: u16,
    last_step: Instant,
}

impl Sweep {
    pub(crate) const fn new(color: Rgb, range: u8, now: Instant) -> Self {
        Self {
            color,
            range,
            next: 0,
            last_step: now,
        }
    }

    pub(crate) fn advance(&mut self, now: Instant, timings: &LedTimings) -> Frame {
        if elapsed(self.last_step, now) < timings.sweep_step {
            return Frame::Idle;
        }
        self.last_step = now;
        if self.next > u16::from(self.range) {
            return Frame::Finished;
        }
        let index = usize::from(self.next);
        self.next += 1;
        Frame::Pixel(index, self.color)
    }
}
