//! LED animation engine
//!
//! Owns one frame buffer per strip and the state of every position. Command
//! methods only mutate buffers and state; [`LedEngine::tick`] advances all
//! running animations and writes each strip at most once.

mod animation;
mod mapping;
mod output;
mod span;
mod state;

use core::fmt;

use embassy_time::Instant;

use crate::OutputDriver;
use crate::color::Rgb;
use crate::config::{
    COLOR_BLINK, COLOR_FAIL, COLOR_OFF, COLOR_SHOW, COLOR_SUCCESS, LED_STRIP_LENGTH, LedTimings,
};
use crate::elapsed;
use crate::log::log_debug;
use crate::position::{POSITION_COUNT, Position};

use self::animation::{Frame, Pulse, Sweep};
use self::span::{bounded, ring};
use self::state::PositionData;

pub use self::mapping::{PixelAddress, Strip, address_of};
pub use self::output::SmartLedsOutput;
pub use self::span::PixelSpan;
pub use self::state::PositionState;

const STRIP_COUNT: usize = 2;

/// A command the current position state does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    AnimationConflict,
}

impl fmt::Display for LedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnimationConflict => f.write_str("animation conflict"),
        }
    }
}

/// Per-position and whole-strip animations over two LED strips
pub struct LedEngine<D, const LEN: usize = LED_STRIP_LENGTH> {
    strips: [D; STRIP_COUNT],
    frames: [[Rgb; LEN]; STRIP_COUNT],
    positions: [PositionData; POSITION_COUNT],
    pulse: Option<Pulse>,
    sweep: Option<Sweep>,
    timings: LedTimings,
    dirty: bool,
}

impl<D: OutputDriver, const LEN: usize> LedEngine<D, LEN> {
    pub fn new(first: D, second: D, timings: LedTimings) -> Self {
        Self {
            strips: [first, second],
            frames: [[COLOR_OFF; LEN]; STRIP_COUNT],
            positions: [PositionData::new(); POSITION_COUNT],
            pulse: None,
            sweep: None,
            timings,
            dirty: true,
        }
    }

    /// Advance every running animation and flush changed strips
    pub fn tick(&mut self, now: Instant) {
        for position in Position::all() {
            match self.data(position).state {
                PositionState::Animating => self.update_expansion(position, now),
                PositionState::Contracting => self.update_contraction(position, now),
                PositionState::Blinking { lit } => self.update_blink(position, lit, now),
                _ => {}
            }
        }
        self.update_pulse(now);
        self.update_sweep(now);

        if self.dirty {
            self.flush();
        }
    }

    /// Write both frame buffers to the strips
    pub fn flush(&mut self) {
        for (strip, frame) in self.strips.iter_mut().zip(self.frames.iter()) {
            strip.write(frame);
        }
        self.dirty = false;
    }

    /// Light the center pixel in the show color
    pub fn show(&mut self, position: Position) {
        self.clear_region(position);
        let data = self.data_mut(position);
        data.state = PositionState::Shown;
        data.step = 0;
        self.set_center(position, COLOR_SHOW);
    }

    /// Return the position and everything it expanded over to background
    pub fn hide(&mut self, position: Position) {
        self.clear_region(position);
        self.data_mut(position).reset();
        self.set_center(position, COLOR_OFF);
    }

    /// Clear both strips, reset every position and stop global animations
    pub fn hide_all(&mut self) {
        for frame in &mut self.frames {
            frame.fill(COLOR_OFF);
        }
        for data in &mut self.positions {
            data.reset();
        }
        self.pulse = None;
        self.sweep = None;
        self.dirty = true;
    }

    /// Start the success expansion from the center pixel
    pub fn success(&mut self, position: Position, now: Instant) {
        self.clear_region(position);
        let data = self.data_mut(position);
        data.state = PositionState::Animating;
        data.step = 0;
        data.last_change = now;
        self.set_center(position, COLOR_SUCCESS);
    }

    /// Show the center pixel in the error color
    pub fn fail(&mut self, position: Position) {
        if self.data(position).state.has_animated_region() {
            self.clear_region(position);
        }
        let data = self.data_mut(position);
        data.state = PositionState::Shown;
        data.step = 0;
        self.set_center(position, COLOR_FAIL);
    }

    /// Shrink an expansion back to its center
    ///
    /// A position that is not expanding or expanded is just shown in the
    /// success color.
    pub fn contract(&mut self, position: Position, now: Instant) {
        let data = self.data_mut(position);
        match data.state {
            PositionState::Animating | PositionState::Expanded => {
                data.state = PositionState::Contracting;
                data.last_change = now;
            }
            _ => {
                data.state = PositionState::Shown;
                self.set_center(position, COLOR_SUCCESS);
            }
        }
        self.dirty = true;
    }

    pub fn blink(&mut self, position: Position, now: Instant) {
        if self.data(position).state.has_animated_region() {
            self.clear_region(position);
        }
        let data = self.data_mut(position);
        data.state = PositionState::Blinking { lit: true };
        data.step = 0;
        data.last_change = now;
        self.set_center(position, COLOR_BLINK);
    }

    /// Stop blinking and turn the position off; no-op if not blinking
    pub fn stop_blink(&mut self, position: Position) {
        if !self.data(position).state.is_blinking() {
            return;
        }
        let data = self.data_mut(position);
        data.state = PositionState::Off;
        data.step = 0;
        self.set_center(position, COLOR_OFF);
    }

    /// Grow a shown position's manual radius by one pixel
    pub fn expand_step(&mut self, position: Position) -> Result<(), LedError> {
        let max_radius = self.timings.max_radius;
        let data = self.shown_mut(position)?;
        if data.expansion >= max_radius {
            return Ok(());
        }
        data.expansion += 1;
        let radius = data.expansion;
        self.set_ring(position, radius, COLOR_SHOW);
        Ok(())
    }

    /// Shrink a shown position's manual radius by one pixel
    pub fn contract_step(&mut self, position: Position) -> Result<(), LedError> {
        let data = self.shown_mut(position)?;
        if data.expansion == 0 {
            return Ok(());
        }
        let radius = data.expansion;
        data.expansion -= 1;
        self.set_ring(position, radius, COLOR_OFF);
        Ok(())
    }

    /// Start the green pulse over both strips
    pub fn start_pulse(&mut self, now: Instant) {
        self.clear_frames();
        self.pulse = Some(Pulse::new(now));
    }

    /// Start lighting indices `0..=range` in `color`
    pub fn start_sweep(&mut self, color: Rgb, range: u8, now: Instant) {
        self.clear_frames();
        self.sweep = Some(Sweep::new(color, range, now));
    }

    /// True unless the success expansion is still running
    pub fn is_animation_complete(&self, position: Position) -> bool {
        self.data(position).state != PositionState::Animating
    }

    /// True unless the contraction is still running
    pub fn is_contract_complete(&self, position: Position) -> bool {
        self.data(position).state != PositionState::Contracting
    }

    pub fn is_pulse_complete(&self) -> bool {
        self.pulse.is_none()
    }

    pub fn is_sweep_complete(&self) -> bool {
        self.sweep.is_none()
    }

    pub fn state(&self, position: Position) -> PositionState {
        self.data(position).state
    }

    /// Manual expansion radius
    pub fn expansion(&self, position: Position) -> u8 {
        self.data(position).expansion
    }

    /// Current animation radius
    pub fn animation_step(&self, position: Position) -> u8 {
        self.data(position).step
    }

    /// Frame buffer of one strip as it will be written on the next flush
    pub fn frame(&self, strip: Strip) -> &[Rgb; LEN] {
        &self.frames[strip.index()]
    }

    /// Color of a position's center pixel
    pub fn center_color(&self, position: Position) -> Rgb {
        let address = address_of(position);
        self.frames[address.strip.index()]
            .get(address.index)
            .copied()
            .unwrap_or(COLOR_OFF)
    }

    pub fn strips(&self) -> &[D; STRIP_COUNT] {
        &self.strips
    }

    fn update_expansion(&mut self, position: Position, now: Instant) {
        let step_interval = self.timings.step;
        let max_radius = self.timings.max_radius;
        let data = self.data_mut(position);
        if elapsed(data.last_change, now) < step_interval {
            return;
        }
        data.last_change = now;
        data.step = data.step.saturating_add(1);
        if data.step >= max_radius {
            data.step = max_radius;
            data.state = PositionState::Expanded;
            log_debug!("[LedEngine.tick] {} expanded", position);
        }
        let radius = data.step;
        self.set_center(position, COLOR_SUCCESS);
        for r in 1..=radius {
            self.set_ring(position, r, COLOR_SUCCESS);
        }
    }

    fn update_contraction(&mut self, position: Position, now: Instant) {
        let step_interval = self.timings.step;
        let data = self.data_mut(position);
        if elapsed(data.last_change, now) < step_interval {
            return;
        }
        data.last_change = now;
        let radius = data.step;
        data.step = radius.saturating_sub(1);
        if data.step == 0 {
            data.state = PositionState::Shown;
        }
        if radius > 0 {
            self.set_ring(position, radius, COLOR_OFF);
        }
        self.set_center(position, COLOR_SUCCESS);
    }

    fn update_blink(&mut self, position: Position, lit: bool, now: Instant) {
        let blink_interval = self.timings.blink;
        let data = self.data_mut(position);
        if elapsed(data.last_change, now) < blink_interval {
            return;
        }
        data.last_change = now;
        data.state = PositionState::Blinking { lit: !lit };
        self.set_center(position, if lit { COLOR_OFF } else { COLOR_BLINK });
    }

    fn update_pulse(&mut self, now: Instant) {
        let Some(pulse) = self.pulse.as_mut() else {
            return;
        };
        match pulse.advance(now, &self.timings) {
            Frame::Idle | Frame::Pixel(..) => {}
            Frame::Fill(color) => {
                for frame in &mut self.frames {
                    frame.fill(color);
                }
                self.dirty = true;
            }
            Frame::Finished => {
                self.pulse = None;
                self.clear_frames();
                for data in &mut self.positions {
                    data.state = PositionState::Off;
                    data.step = 0;
                }
                log_debug!("[LedEngine.tick] pulse finished");
            }
        }
    }

    fn update_sweep(&mut self, now: Instant) {
        let Some(sweep) = self.sweep.as_mut() else {
            return;
        };
        match sweep.advance(now, &self.timings) {
            Frame::Idle | Frame::Fill(_) => {}
            Frame::Pixel(index, color) => {
                for frame in &mut self.frames {
                    if let Some(pixel) = frame.get_mut(index) {
                        *pixel = color;
                    }
                }
                self.dirty = true;
            }
            Frame::Finished => {
                self.sweep = None;
                log_debug!("[LedEngine.tick] sweep finished");
            }
        }
    }

    /// Turn off every pixel the position may have lit
    fn clear_region(&mut self, position: Position) {
        let max_radius = self.timings.max_radius;
        let data = self.data_mut(position);
        let radius = data.lit_radius(max_radius);
        data.expansion = 0;
        let address = address_of(position);
        let span = PixelSpan::around(address.index, radius, LEN);
        bounded(&mut self.frames[address.strip.index()], span).fill(COLOR_OFF);
        self.dirty = true;
    }

    fn clear_frames(&mut self) {
        for frame in &mut self.frames {
            frame.fill(COLOR_OFF);
        }
        self.dirty = true;
    }

    fn set_center(&mut self, position: Position, color: Rgb) {
        self.set_ring(position, 0, color);
    }

    fn set_ring(&mut self, position: Position, radius: u8, color: Rgb) {
        let address = address_of(position);
        let frame = &mut self.frames[address.strip.index()];
        for index in ring(address.index, radius, LEN) {
            frame[index] = color;
        }
        self.dirty = true;
    }

    fn shown_mut(&mut self, position: Position) -> Result<&mut PositionData, LedError> {
        let data = self.data_mut(position);
        if data.state == PositionState::Shown {
            Ok(data)
        } else {
            Err(LedError::AnimationConflict)
        }
    }

    fn data(&self, position: Position) -> &PositionData {
        &self.positions[position.index()]
    }

    fn data_mut(&mut self, position: Position) -> &mut PositionData {
        &mut self.positions[position.index()]
    }
}
