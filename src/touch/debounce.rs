use embassy_time::Instant;

use crate::config::TouchTimings;
use crate::elapsed;

/// Result of one status read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sample {
    Touched,
    Released,
    BusError,
}

/// A debounced change that was not reported before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    Pressed,
    Released,
}

/// Read-only view of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSnapshot {
    /// Found at boot probe
    pub active: bool,
    /// Latest successful reading
    pub current: bool,
    pub debounced: bool,
    pub reported: bool,
    /// Too many consecutive bus errors
    pub faulted: bool,
}

/// Debounce pipeline of one channel
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChannelState {
    active: bool,
    current: bool,
    debounced: bool,
    reported: bool,
    last_change: Instant,
    failures: u8,
}

impl ChannelState {
    pub(crate) const fn new() -> Self {
        Self {
            active: false,
            current: false,
            debounced: false,
            reported: false,
            last_change: Instant::from_ticks(0),
            failures: 0,
        }
    }

    /// Fresh state after a probe
    pub(crate) fn reset(&mut self, active: bool) {
        *self = Self::new();
        self.active = active;
    }

    pub(crate) const fn is_active(&self) -> bool {
        self.active
    }

    /// Feed a raw reading
    ///
    /// A bus error leaves `current` untouched.
    pub(crate) fn sample(&mut self, sample: Sample, now: Instant) {
        let touched = match sample {
            Sample::Touched => true,
            Sample::Released => false,
            Sample::BusError => {
                self.failures = self.failures.saturating_add(1);
                return;
            }
        };
        self.failures = 0;
        if touched != self.current {
            self.current = touched;
            // Dwell is timed from the last divergence from the debounced value
            if touched != self.debounced {
                self.last_change = now;
            }
        }
    }

    /// Adopt `current` once it has been stable for the dwell
    pub(crate) fn debounce(&mut self, now: Instant, timings: &TouchTimings) -> Option<Transition> {
        if self.current == self.debounced {
            return None;
        }
        let dwell = if self.current {
            timings.press_dwell
        } else {
            timings.release_dwell
        };
        if elapsed(self.last_change, now) < dwell {
            return None;
        }
        self.debounced = self.current;
        if self.debounced == self.reported {
            return None;
        }
        self.reported = self.debounced;
        Some(if self.debounced {
            Transition::Pressed
        } else {
            Transition::Released
        })
    }

    pub(crate) fn snapshot(&self, fault_threshold: u8) -> ChannelSnapshot {
        ChannelSnapshot {
            active: self.active,
            current: self.current,
            debounced: self.debounced,
            reported: self.reported,
            faulted: self.failures >= fault_threshold,
        }
    }
}
