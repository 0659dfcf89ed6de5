//! Schedule drivers
//!
//! Portable pacing without async or platform timers: each driver does one
//! iteration per call and the caller sleeps in between. The sampling
//! schedule and the control loop share only the touch engine lock and the
//! event queue.

use embassy_time::{Duration, Instant};
use embedded_io::Write;
use heapless::String;

use crate::OutputDriver;
use crate::config::{
    EVENT_MESSAGE_BUFFER_SIZE, LED_STRIP_LENGTH, QUEUE_SIZE_COMMANDS, QUEUE_SIZE_EVENTS,
};
use crate::event::{Event, write_channel_list};
use crate::event_queue::{EventQueue, EventSink};
use crate::led::LedEngine;
use crate::lock::LockTimeout;
use crate::log::log_warn;
use crate::position::Position;
use crate::protocol::CommandEngine;
use crate::touch::{RegisterBus, SharedTouch, TouchControl};

const READY_LINE: &str = "READY";

/// Result of one sampling iteration
#[derive(Debug, Clone, Copy)]
pub struct SampleResult {
    /// The deadline for the next sample
    pub next_deadline: Instant,
    /// How long to wait until the next sample (zero if behind schedule)
    pub sleep_duration: Duration,
    /// False if the touch engine lock could not be taken
    pub sampled: bool,
}

/// Fixed-period touch sampling with drift correction
///
/// ```ignore
/// let mut sampling = SamplingSchedule::new(&touch, &events, period, lock_timeout);
/// loop {
///     let result = sampling.tick(Instant::now());
///     Timer::after(result.sleep_duration).await;
/// }
/// ```
pub struct SamplingSchedule<'a, B, S> {
    touch: &'a SharedTouch<B>,
    events: &'a S,
    next_sample: Instant,
    period: Duration,
    lock_timeout: Duration,
}

impl<'a, B: RegisterBus, S: EventSink> SamplingSchedule<'a, B, S> {
    pub const fn new(
        touch: &'a SharedTouch<B>,
        events: &'a S,
        period: Duration,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            touch,
            events,
            next_sample: Instant::from_ticks(0),
            period,
            lock_timeout,
        }
    }

    /// Sample once and return the timing of the next sample
    pub fn tick(&mut self, now: Instant) -> SampleResult {
        // Skip the backlog after a long stall instead of bursting
        let max_drift = self.period * 2;
        if now > self.next_sample + max_drift {
            self.next_sample = now;
        }

        let sampled = match self.touch.lock_within(self.lock_timeout) {
            Ok(mut engine) => {
                engine.sample(now, self.events);
                true
            }
            Err(LockTimeout) => {
                log_warn!("[SamplingSchedule.tick] touch lock timeout, sample skipped");
                false
            }
        };

        self.next_sample += self.period;
        let sleep_duration = self
            .next_sample
            .checked_duration_since(now)
            .unwrap_or(Duration::from_ticks(0));

        SampleResult {
            next_deadline: self.next_sample,
            sleep_duration,
            sampled,
        }
    }
}

/// One cooperative iteration of serial I/O, dispatch and animation
///
/// ```ignore
/// let mut control = ControlLoop::new(commands, leds, &events, EVENTS_PER_FLUSH);
/// loop {
///     let received = uart.read(&mut buffer)?;
///     control.run_once(&buffer[..received], Instant::now());
///     yield_now().await;
/// }
/// ```
pub struct ControlLoop<
    'a,
    T,
    D,
    W,
    const SLOTS: usize = QUEUE_SIZE_COMMANDS,
    const LEN: usize = LED_STRIP_LENGTH,
    const EVENTS: usize = QUEUE_SIZE_EVENTS,
> {
    commands: CommandEngine<T, SLOTS>,
    leds: LedEngine<D, LEN>,
    events: &'a EventQueue<W, EVENTS>,
    events_per_flush: usize,
}

impl<'a, T, D, W, const SLOTS: usize, const LEN: usize, const EVENTS: usize>
    ControlLoop<'a, T, D, W, SLOTS, LEN, EVENTS>
where
    T: TouchControl,
    D: OutputDriver,
    W: Write,
{
    pub const fn new(
        commands: CommandEngine<T, SLOTS>,
        leds: LedEngine<D, LEN>,
        events: &'a EventQueue<W, EVENTS>,
        events_per_flush: usize,
    ) -> Self {
        Self {
            commands,
            leds,
            events,
            events_per_flush,
        }
    }

    /// Ingest `received`, dispatch lines, advance commands and animations,
    /// then flush a bounded number of events
    ///
    /// Returns the number of events written.
    pub fn run_once(&mut self, received: &[u8], now: Instant) -> usize {
        self.commands.receive(received, now);
        self.commands.process_lines(&mut self.leds, self.events, now);
        self.commands.tick(&self.leds, self.events);
        self.leds.tick(now);
        self.events.flush(self.events_per_flush)
    }

    pub fn commands(&self) -> &CommandEngine<T, SLOTS> {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandEngine<T, SLOTS> {
        &mut self.commands
    }

    pub fn leds(&self) -> &LedEngine<D, LEN> {
        &self.leds
    }

    pub fn leds_mut(&mut self) -> &mut LedEngine<D, LEN> {
        &mut self.leds
    }
}

/// Boot banner: INFO, the channels found by the probe, then `READY`
pub fn announce_startup<W: Write, const EVENTS: usize>(
    events: &EventQueue<W, EVENTS>,
    channels: &[Position],
) -> Result<(), LockTimeout> {
    events.push(Event::Info { id: None });
    events.flush_all();

    let mut line: String<EVENT_MESSAGE_BUFFER_SIZE> = String::new();
    if line.push_str("SCANNED ").is_err() || write_channel_list(&mut line, channels).is_err() {
        log_warn!("[announce_startup] channel list does not fit");
    }
    events.write_line(&line)?;
    events.write_line(READY_LINE)
}
