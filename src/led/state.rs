use embassy_time::Instant;

/// Lifecycle of a single position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PositionState {
    #[default]
    Off,
    /// Static color on the center pixel
    Shown,
    /// Success expansion in progress
    Animating,
    /// Success expansion finished at full radius
    Expanded,
    /// Shrinking back to the center pixel
    Contracting,
    /// Toggling on and off; `lit` is the current phase
    Blinking { lit: bool },
}

impl PositionState {
    pub const fn is_blinking(self) -> bool {
        matches!(self, Self::Blinking { .. })
    }

    /// Whether pixels around the center may be lit by an animation
    pub const fn has_animated_region(self) -> bool {
        matches!(self, Self::Animating | Self::Expanded | Self::Contracting)
    }
}

/// Mutable per-position data
#[derive(Debug, Clone, Copy)]
pub(crate) struct PositionData {
    pub(crate) state: PositionState,
    /// Radius of the automatic success/contract animation
    pub(crate) step: u8,
    /// Radius set by manual expand/contract steps
    pub(crate) expansion: u8,
    /// Start of the current animation or blink phase
    pub(crate) last_change: Instant,
}

impl PositionData {
    pub(crate) const fn new() -> Self {
        Self {
            state: PositionState::Off,
            step: 0,
            expansion: 0,
            last_change: Instant::from_ticks(0),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// Widest radius that may currently have lit pixels
    pub(crate) fn lit_radius(&self, max_radius: u8) -> u8 {
        let region = if self.state.has_animated_region() {
            max_radius
        } else {
            0
        };
        region.max(self.step).max(self.expansion)
    }
}
