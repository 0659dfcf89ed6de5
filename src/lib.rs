#![no_std]

mod log;

pub mod color;
pub mod config;
pub mod event;
pub mod event_queue;
pub mod led;
pub mod lock;
pub mod position;
pub mod protocol;
pub mod scheduler;
pub mod touch;

pub use config::ExecutorConfig;
pub use event::{CommandId, ErrorReason, Event};
pub use event_queue::{EventQueue, EventSink};
pub use led::{LedEngine, LedError, PositionState, SmartLedsOutput};
pub use lock::{LockTimeout, TimedMutex};
pub use position::Position;
pub use protocol::{Action, Command, CommandEngine, Request};
pub use scheduler::{ControlLoop, SamplingSchedule, announce_startup};
pub use touch::{
    I2cRegisters, NoTouch, RegisterBus, SharedTouch, TouchControl, TouchEngine, TouchHandle,
};

pub use color::Rgb;
pub use embassy_time::{Duration, Instant};

/// Abstract LED driver trait
///
/// Implement this trait to support different hardware platforms.
/// The LED engine is generic over this trait and calls it once per strip
/// per flush.
pub trait OutputDriver {
    /// Write colors to the LED strip
    fn write(&mut self, colors: &[Rgb]);
}

/// Time from `earlier` to `now`, zero if the clock went backwards
pub(crate) fn elapsed(earlier: Instant, now: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::from_ticks(0))
}
