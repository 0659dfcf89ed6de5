use core::fmt;

use embassy_time::Instant;
use heapless::Vec;

use crate::config::QUEUE_SIZE_COMMANDS;
use crate::position::Position;

use super::command::{Command, Request};

/// No free slot for a long-running command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdmissionError {
    Full,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("command table full"),
        }
    }
}

/// The LED predicate a long-running command waits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Expansion(Position),
    Contraction(Position),
    Pulse,
    Sweep,
}

impl Completion {
    /// `None` for commands that complete synchronously
    pub const fn of(command: &Command) -> Option<Self> {
        match *command {
            Command::Success(position) => Some(Self::Expansion(position)),
            Command::Contract(position) => Some(Self::Contraction(position)),
            Command::SequenceCompleted => Some(Self::Pulse),
            Command::MenuChange { .. } => Some(Self::Sweep),
            _ => None,
        }
    }
}

/// An admitted long-running command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedCommand {
    pub request: Request,
    pub started: Instant,
    /// Completion polls seen so far
    pub polls: u32,
}

/// Fixed-capacity table of running commands
///
/// SLOTS is the number of commands that may run at once
#[derive(Debug)]
pub struct CommandTable<const SLOTS: usize = QUEUE_SIZE_COMMANDS> {
    slots: [Option<TrackedCommand>; SLOTS],
}

impl<const SLOTS: usize> CommandTable<SLOTS> {
    pub const fn new() -> Self {
        Self {
            slots: [None; SLOTS],
        }
    }

    /// Take the first free slot
    pub fn admit(&mut self, request: Request, now: Instant) -> Result<(), AdmissionError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(AdmissionError::Full)?;
        *slot = Some(TrackedCommand {
            request,
            started: now,
            polls: 0,
        });
        Ok(())
    }

    /// Free every slot whose command reports complete
    ///
    /// Returns the freed commands in slot order.
    pub fn take_completed(
        &mut self,
        mut is_complete: impl FnMut(&Request) -> bool,
    ) -> Vec<TrackedCommand, SLOTS> {
        let mut completed = Vec::new();
        for slot in &mut self.slots {
            let Some(tracked) = slot.as_mut() else {
                continue;
            };
            tracked.polls = tracked.polls.saturating_add(1);
            if !is_complete(&tracked.request) {
                continue;
            }
            if let Some(tracked) = slot.take() {
                // Capacity equals the slot count
                let _ = completed.push(tracked);
            }
        }
        completed
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedCommand> {
        self.slots.iter().flatten()
    }
}

impl<const SLOTS: usize> Default for CommandTable<SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}
