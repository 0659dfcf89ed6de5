//! Serial command protocol engine
//!
//! Bytes go in through [`CommandEngine::receive`], complete lines are parsed
//! and dispatched by [`CommandEngine::process_lines`], and admitted
//! long-running commands are advanced by [`CommandEngine::tick`]. Every
//! reply goes to an [`EventSink`].

mod command;
mod line;
mod parser;
mod tracker;

use embassy_time::Instant;

use crate::OutputDriver;
use crate::config::{QUEUE_SIZE_COMMANDS, SerialConfig};
use crate::event::{CommandId, ErrorReason, Event};
use crate::event_queue::EventSink;
use crate::led::LedEngine;
use crate::log::{log_debug, log_warn};
use crate::touch::{TouchControl, TouchError};

pub use self::command::{Action, Command, Request};
pub use self::line::{Line, LineFramer};
pub use self::parser::{ParseFailure, parse_line};
pub use self::tracker::{AdmissionError, CommandTable, Completion, TrackedCommand};

/// Parses, dispatches and tracks commands
pub struct CommandEngine<T, const SLOTS: usize = QUEUE_SIZE_COMMANDS> {
    framer: LineFramer,
    table: CommandTable<SLOTS>,
    touch: Option<T>,
}

impl<T: TouchControl, const SLOTS: usize> CommandEngine<T, SLOTS> {
    /// `touch` is `None` when no touch controller was found
    pub const fn new(touch: Option<T>, config: &SerialConfig) -> Self {
        Self {
            framer: LineFramer::new(config.line_timeout),
            table: CommandTable::new(),
            touch,
        }
    }

    /// Buffer bytes from the transport
    pub fn receive(&mut self, bytes: &[u8], now: Instant) -> usize {
        self.framer.receive(bytes, now)
    }

    /// Dispatch every complete line
    ///
    /// Returns the number of lines handled.
    pub fn process_lines<D: OutputDriver, const LEN: usize>(
        &mut self,
        leds: &mut LedEngine<D, LEN>,
        events: &impl EventSink,
        now: Instant,
    ) -> usize {
        let mut handled = 0;
        while let Some(line) = self.framer.next_line(now) {
            self.handle_line(&line, leds, events, now);
            handled += 1;
        }
        handled
    }

    /// Parse and dispatch a single line
    pub fn handle_line<D: OutputDriver, const LEN: usize>(
        &mut self,
        line: &[u8],
        leds: &mut LedEngine<D, LEN>,
        events: &impl EventSink,
        now: Instant,
    ) {
        let Ok(text) = core::str::from_utf8(line) else {
            events.push(Event::Error {
                reason: ErrorReason::BadFormat,
                id: None,
            });
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        match parse_line(text) {
            Ok(request) => self.execute(request, leds, events, now),
            Err(failure) => {
                log_debug!("[CommandEngine.parse] rejected: {}", failure);
                events.push(Event::Error {
                    reason: failure.reason,
                    id: failure.id,
                });
            }
        }
    }

    /// Run an instant command or admit a long-running one
    pub fn execute<D: OutputDriver, const LEN: usize>(
        &mut self,
        request: Request,
        leds: &mut LedEngine<D, LEN>,
        events: &impl EventSink,
        now: Instant,
    ) {
        if request.command.is_long_running() {
            self.start(request, leds, events, now);
            return;
        }
        let reply = match self.run_instant(request, leds, events, now) {
            Ok(reply) => reply,
            Err(failure) => failure,
        };
        events.push(reply);
    }

    /// Emit DONE for every tracked command whose effect finished
    pub fn tick<D: OutputDriver, const LEN: usize>(
        &mut self,
        leds: &LedEngine<D, LEN>,
        events: &impl EventSink,
    ) -> usize {
        let completed = self.table.take_completed(|request| {
            match Completion::of(&request.command) {
                Some(Completion::Expansion(position)) => leds.is_animation_complete(position),
                Some(Completion::Contraction(position)) => leds.is_contract_complete(position),
                Some(Completion::Pulse) => leds.is_pulse_complete(),
                Some(Completion::Sweep) => leds.is_sweep_complete(),
                None => true,
            }
        });
        for tracked in &completed {
            let command = tracked.request.command;
            events.push(Event::Done {
                action: command.action(),
                position: command.position(),
                id: tracked.request.id,
            });
        }
        completed.len()
    }

    /// Commands currently holding a slot
    pub fn tracked(&self) -> &CommandTable<SLOTS> {
        &self.table
    }

    pub fn touch_mut(&mut self) -> Option<&mut T> {
        self.touch.as_mut()
    }

    /// Bytes of the line being received
    pub fn pending_input(&self) -> &[u8] {
        self.framer.pending()
    }

    fn start<D: OutputDriver, const LEN: usize>(
        &mut self,
        request: Request,
        leds: &mut LedEngine<D, LEN>,
        events: &impl EventSink,
        now: Instant,
    ) {
        let command = request.command;
        if self.table.admit(request, now).is_err() {
            log_warn!("[CommandEngine.admit] table full, {} rejected", command.action().as_str());
            events.push(Event::Busy { id: request.id });
            return;
        }
        events.push(ack(&command, request.id));
        match command {
            Command::Success(position) => leds.success(position, now),
            Command::Contract(position) => leds.contract(position, now),
            Command::SequenceCompleted => leds.start_pulse(now),
            Command::MenuChange { color, range } => leds.start_sweep(color, range, now),
            _ => {}
        }
    }

    /// Returns the reply event, or the failure event
    fn run_instant<D: OutputDriver, const LEN: usize>(
        &mut self,
        request: Request,
        leds: &mut LedEngine<D, LEN>,
        events: &impl EventSink,
        now: Instant,
    ) -> Result<Event, Event> {
        let Request { command, id } = request;
        let action = command.action();
        match command {
            Command::Show(position) => leds.show(position),
            Command::Hide(position) => leds.hide(position),
            Command::HideAll => leds.hide_all(),
            Command::Fail(position) => leds.fail(position),
            Command::Blink(position) => leds.blink(position, now),
            Command::StopBlink(position) => leds.stop_blink(position),
            Command::ExpandStep(position) => leds
                .expand_step(position)
                .map_err(|_| failed(ErrorReason::CommandFailed, id))?,
            Command::ContractStep(position) => leds
                .contract_step(position)
                .map_err(|_| failed(ErrorReason::CommandFailed, id))?,
            Command::Expect(position) => {
                self.touch(action, id)?.expect_press(position, id).map_err(
                    |error| touch_failure(error, action, id),
                )?;
            }
            Command::ExpectRelease(position) => {
                self.touch(action, id)?.expect_release(position, id).map_err(
                    |error| touch_failure(error, action, id),
                )?;
            }
            Command::Recalibrate(position) => {
                self.touch(action, id)?
                    .recalibrate(position)
                    .map_err(|error| touch_failure(error, action, id))?;
                events.push(ack(&command, id));
                return Ok(Event::Recalibrated {
                    position: Some(position),
                    id,
                });
            }
            Command::RecalibrateAll => {
                self.touch(action, id)?
                    .recalibrate_all()
                    .map_err(|error| touch_failure(error, action, id))?;
                events.push(ack(&command, id));
                return Ok(Event::Recalibrated { position: None, id });
            }
            Command::SetSensitivity { position, level } => {
                self.touch(action, id)?
                    .set_sensitivity(position, level)
                    .map_err(|error| touch_failure(error, action, id))?;
            }
            Command::Scan => {
                let channels = self
                    .touch(action, id)?
                    .active_channels()
                    .map_err(|error| touch_failure(error, action, id))?;
                return Ok(Event::Scanned { channels, id });
            }
            Command::Value(position) => {
                let delta = self
                    .touch(action, id)?
                    .read_delta(position)
                    .map_err(|error| touch_failure(error, action, id))?;
                return Ok(Event::Value {
                    position,
                    delta,
                    id,
                });
            }
            Command::Info => return Ok(Event::Info { id }),
            Command::Ping => {}
            Command::Success(_)
            | Command::Contract(_)
            | Command::SequenceCompleted
            | Command::MenuChange { .. } => {
                return Err(failed(ErrorReason::CommandFailed, id));
            }
        }
        Ok(ack(&command, id))
    }

    fn touch(&mut self, action: Action, id: Option<CommandId>) -> Result<&mut T, Event> {
        self.touch.as_mut().ok_or_else(|| {
            log_debug!("[CommandEngine.{}] no touch controller", action.as_str());
            failed(ErrorReason::NoTouchController, id)
        })
    }
}

fn ack(command: &Command, id: Option<CommandId>) -> Event {
    Event::Ack {
        action: command.action(),
        position: command.position(),
        id,
    }
}

const fn failed(reason: ErrorReason, id: Option<CommandId>) -> Event {
    Event::Error { reason, id }
}

/// Wire reply for a failed touch operation
fn touch_failure(error: TouchError, action: Action, id: Option<CommandId>) -> Event {
    match error {
        TouchError::Busy => Event::Busy { id },
        TouchError::Inactive if action == Action::Value => {
            failed(ErrorReason::SensorInactive, id)
        }
        TouchError::Inactive | TouchError::Bus(_) => {
            log_warn!("[CommandEngine.{}] {}", action.as_str(), error);
            failed(ErrorReason::CommandFailed, id)
        }
    }
}
