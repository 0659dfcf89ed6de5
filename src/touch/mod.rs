//! Touch debounce and expectation engine
//!
//! [`TouchEngine`] owns the bus, one debounce pipeline per channel and the
//! press/release watches. The sampling schedule calls [`TouchEngine::tick`];
//! the protocol engine reaches it through [`TouchControl`], usually via a
//! [`TouchHandle`] that gives up when the engine is busy sampling.

mod bus;
mod cap1188;
mod debounce;
mod watch;

use core::fmt;

use embassy_time::{Duration, Instant};

use crate::config::{SENSOR_I2C_ADDRESSES, TOUCH_SENSOR_COUNT, TouchTimings};
use crate::elapsed;
use crate::event::{ChannelList, CommandId, Event};
use crate::event_queue::EventSink;
use crate::lock::TimedMutex;
use crate::log::{log_debug, log_warn};
use crate::position::Position;

use self::cap1188::Cap1188;
use self::debounce::ChannelState;

pub use self::bus::{BusError, I2cRegisters, RegisterBus};
pub use self::debounce::{ChannelSnapshot, Sample, Transition};
pub use self::watch::Watch;

/// Failure of a touch operation requested by the protocol engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchError {
    /// Channel was not found at boot probe
    Inactive,
    /// Register transfer failed
    Bus(BusError),
    /// Channel table is locked by the sampling schedule
    Busy,
}

impl fmt::Display for TouchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => f.write_str("channel inactive"),
            Self::Bus(error) => write!(f, "bus error: {}", error),
            Self::Busy => f.write_str("touch engine busy"),
        }
    }
}

impl From<BusError> for TouchError {
    fn from(error: BusError) -> Self {
        Self::Bus(error)
    }
}

/// Sensitivity level, 0 (most sensitive) to 7 (least)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sensitivity(u8);

impl Sensitivity {
    pub const MAX: u8 = 7;

    pub const fn new(level: u8) -> Option<Self> {
        if level <= Self::MAX {
            Some(Self(level))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Touch operations available to the protocol engine
pub trait TouchControl {
    /// Arm the one-shot press watch of a channel
    fn expect_press(&mut self, position: Position, id: Option<CommandId>)
    -> Result<(), TouchError>;

    /// Arm the one-shot release watch of a channel
    fn expect_release(
        &mut self,
        position: Position,
        id: Option<CommandId>,
    ) -> Result<(), TouchError>;

    fn clear_press_watch(&mut self, position: Position) -> Result<(), TouchError>;

    fn clear_release_watch(&mut self, position: Position) -> Result<(), TouchError>;

    fn recalibrate(&mut self, position: Position) -> Result<(), TouchError>;

    /// Recalibrate every active channel
    fn recalibrate_all(&mut self) -> Result<(), TouchError>;

    fn set_sensitivity(&mut self, position: Position, level: Sensitivity)
    -> Result<(), TouchError>;

    /// Raw delta count for diagnostics
    fn read_delta(&mut self, position: Position) -> Result<i8, TouchError>;

    /// Channels found at boot, in position order
    fn active_channels(&mut self) -> Result<ChannelList, TouchError>;
}

/// Debounce engine over all channels of one bus
pub struct TouchEngine<B> {
    bus: B,
    addresses: [u8; TOUCH_SENSOR_COUNT],
    channels: [ChannelState; TOUCH_SENSOR_COUNT],
    press_watches: [Watch; TOUCH_SENSOR_COUNT],
    release_watches: [Watch; TOUCH_SENSOR_COUNT],
    timings: TouchTimings,
    last_poll: Option<Instant>,
}

impl<B: RegisterBus> TouchEngine<B> {
    pub fn new(bus: B, timings: TouchTimings) -> Self {
        Self::with_addresses(bus, SENSOR_I2C_ADDRESSES, timings)
    }

    pub fn with_addresses(
        bus: B,
        addresses: [u8; TOUCH_SENSOR_COUNT],
        timings: TouchTimings,
    ) -> Self {
        Self {
            bus,
            addresses,
            channels: [ChannelState::new(); TOUCH_SENSOR_COUNT],
            press_watches: [Watch::Idle; TOUCH_SENSOR_COUNT],
            release_watches: [Watch::Idle; TOUCH_SENSOR_COUNT],
            timings,
            last_poll: None,
        }
    }

    /// Probe and configure every channel
    ///
    /// Resets all debounce state. Returns the number of channels found.
    pub fn probe_all(&mut self) -> usize {
        let mut found = 0;
        for position in Position::all() {
            let address = self.addresses[position.index()];
            let active = match Cap1188::new(&mut self.bus, address).probe() {
                Ok(active) => active,
                Err(error) => {
                    log_debug!("[TouchEngine.probe] {} at {:#04x}: {}", position, address, error);
                    false
                }
            };
            self.channels[position.index()].reset(active);
            if active {
                found += 1;
            }
        }
        log_debug!("[TouchEngine.probe] {} channels active", found);
        found
    }

    /// Sample every active channel if the poll interval has passed
    ///
    /// For callers without their own pacing. Returns `None` if the bus was
    /// not read, otherwise the number of watch events emitted.
    pub fn tick(&mut self, now: Instant, events: &impl EventSink) -> Option<usize> {
        if let Some(last) = self.last_poll {
            if elapsed(last, now) < self.timings.poll_interval {
                return None;
            }
        }
        Some(self.sample(now, events))
    }

    /// Read every active channel now and report matching transitions
    ///
    /// Returns the number of watch events pushed to `events`.
    pub fn sample(&mut self, now: Instant, events: &impl EventSink) -> usize {
        self.last_poll = Some(now);
        self.poll(now);
        self.process_debounce(now, events)
    }

    /// Read every active channel once
    fn poll(&mut self, now: Instant) {
        for position in Position::all() {
            let index = position.index();
            if !self.channels[index].is_active() {
                continue;
            }
            let sample = match Cap1188::new(&mut self.bus, self.addresses[index]).read_touched() {
                Ok(true) => Sample::Touched,
                Ok(false) => Sample::Released,
                Err(error) => {
                    log_warn!("[TouchEngine.poll] {} read failed: {}", position, error);
                    Sample::BusError
                }
            };
            self.channels[index].sample(sample, now);
        }
    }

    fn process_debounce(&mut self, now: Instant, events: &impl EventSink) -> usize {
        let mut emitted = 0;
        for position in Position::all() {
            let index = position.index();
            if !self.channels[index].is_active() {
                continue;
            }
            let Some(transition) = self.channels[index].debounce(now, &self.timings) else {
                continue;
            };
            let event = match transition {
                Transition::Pressed => self.press_watches[index]
                    .take()
                    .map(|id| Event::Touched { position, id }),
                Transition::Released => self.release_watches[index]
                    .take()
                    .map(|id| Event::TouchReleased { position, id }),
            };
            if let Some(event) = event {
                events.push(event);
                emitted += 1;
            }
        }
        emitted
    }

    /// Debounce state of one channel
    pub fn channel(&self, position: Position) -> ChannelSnapshot {
        self.channels[position.index()].snapshot(self.timings.fault_threshold)
    }

    pub fn is_active(&self, position: Position) -> bool {
        self.channels[position.index()].is_active()
    }

    pub fn press_watch(&self, position: Position) -> Watch {
        self.press_watches[position.index()]
    }

    pub fn release_watch(&self, position: Position) -> Watch {
        self.release_watches[position.index()]
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn sensor(&mut self, position: Position) -> Result<Cap1188<'_, B>, TouchError> {
        let index = position.index();
        if !self.channels[index].is_active() {
            return Err(TouchError::Inactive);
        }
        Ok(Cap1188::new(&mut self.bus, self.addresses[index]))
    }
}

impl<B: RegisterBus> TouchControl for TouchEngine<B> {
    fn expect_press(
        &mut self,
        position: Position,
        id: Option<CommandId>,
    ) -> Result<(), TouchError> {
        self.press_watches[position.index()].arm(id);
        Ok(())
    }

    fn expect_release(
        &mut self,
        position: Position,
        id: Option<CommandId>,
    ) -> Result<(), TouchError> {
        self.release_watches[position.index()].arm(id);
        Ok(())
    }

    fn clear_press_watch(&mut self, position: Position) -> Result<(), TouchError> {
        self.press_watches[position.index()].clear();
        Ok(())
    }

    fn clear_release_watch(&mut self, position: Position) -> Result<(), TouchError> {
        self.release_watches[position.index()].clear();
        Ok(())
    }

    fn recalibrate(&mut self, position: Position) -> Result<(), TouchError> {
        self.sensor(position)?.recalibrate()?;
        Ok(())
    }

    fn recalibrate_all(&mut self) -> Result<(), TouchError> {
        for position in Position::all() {
            if !self.is_active(position) {
                continue;
            }
            if let Err(error) = self.recalibrate(position) {
                log_warn!("[TouchEngine.recalibrate_all] {}: {}", position, error);
            }
        }
        Ok(())
    }

    fn set_sensitivity(
        &mut self,
        position: Position,
        level: Sensitivity,
    ) -> Result<(), TouchError> {
        self.sensor(position)?.set_sensitivity(level)?;
        Ok(())
    }

    fn read_delta(&mut self, position: Position) -> Result<i8, TouchError> {
        Ok(self.sensor(position)?.read_delta()?)
    }

    fn active_channels(&mut self) -> Result<ChannelList, TouchError> {
        Ok(Position::all()
            .filter(|&position| self.is_active(position))
            .collect())
    }
}

/// Touch engine shared between the sampling schedule and the protocol engine
pub type SharedTouch<B> = TimedMutex<TouchEngine<B>>;

/// [`TouchControl`] through a [`SharedTouch`] lock
///
/// Every call takes the lock for at most `timeout` and reports
/// [`TouchError::Busy`] otherwise.
pub struct TouchHandle<'a, B> {
    shared: &'a SharedTouch<B>,
    timeout: Duration,
}

impl<'a, B: RegisterBus> TouchHandle<'a, B> {
    pub const fn new(shared: &'a SharedTouch<B>, timeout: Duration) -> Self {
        Self { shared, timeout }
    }

    fn with<R>(
        &self,
        f: impl FnOnce(&mut TouchEngine<B>) -> Result<R, TouchError>,
    ) -> Result<R, TouchError> {
        let mut engine = self.shared.lock_within(self.timeout).map_err(|_| {
            log_warn!("[TouchHandle.lock] timeout");
            TouchError::Busy
        })?;
        f(&mut *engine)
    }
}

impl<B: RegisterBus> TouchControl for TouchHandle<'_, B> {
    fn expect_press(
        &mut self,
        position: Position,
        id: Option<CommandId>,
    ) -> Result<(), TouchError> {
        self.with(|engine| engine.expect_press(position, id))
    }

    fn expect_release(
        &mut self,
        position: Position,
        id: Option<CommandId>,
    ) -> Result<(), TouchError> {
        self.with(|engine| engine.expect_release(position, id))
    }

    fn clear_press_watch(&mut self, position: Position) -> Result<(), TouchError> {
        self.with(|engine| engine.clear_press_watch(position))
    }

    fn clear_release_watch(&mut self, position: Position) -> Result<(), TouchError> {
        self.with(|engine| engine.clear_release_watch(position))
    }

    fn recalibrate(&mut self, position: Position) -> Result<(), TouchError> {
        self.with(|engine| engine.recalibrate(position))
    }

    fn recalibrate_all(&mut self) -> Result<(), TouchError> {
        self.with(TouchControl::recalibrate_all)
    }

    fn set_sensitivity(
        &mut self,
        position: Position,
        level: Sensitivity,
    ) -> Result<(), TouchError> {
        self.with(|engine| engine.set_sensitivity(position, level))
    }

    fn read_delta(&mut self, position: Position) -> Result<i8, TouchError> {
        self.with(|engine| engine.read_delta(position))
    }

    fn active_channels(&mut self) -> Result<ChannelList, TouchError> {
        self.with(TouchControl::active_channels)
    }
}

/// Stand-in for builds without a touch controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoTouch {}

impl TouchControl for NoTouch {
    fn expect_press(&mut self, _: Position, _: Option<CommandId>) -> Result<(), TouchError> {
        match *self {}
    }

    fn expect_release(&mut self, _: Position, _: Option<CommandId>) -> Result<(), TouchError> {
        match *self {}
    }

    fn clear_press_watch(&mut self, _: Position) -> Result<(), TouchError> {
        match *self {}
    }

    fn clear_release_watch(&mut self, _: Position) -> Result<(), TouchError> {
        match *self {}
    }

    fn recalibrate(&mut self, _: Position) -> Result<(), TouchError> {
        match *self {}
    }

    fn recalibrate_all(&mut self) -> Result<(), TouchError> {
        match *self {}
    }

    fn set_sensitivity(&mut self, _: Position, _: Sensitivity) -> Result<(), TouchError> {
        match *self {}
    }

    fn read_delta(&mut self, _: Position) -> Result<i8, TouchError> {
        match *self {}
    }

    fn active_channels(&mut self) -> Result<ChannelList, TouchError> {
        match *self {}
    }
}
