//! Outgoing events
//!
//! Each variant carries only the payload its wire message needs. The wire
//! format is `<TYPE> [<payload>] [#<id>]\n`; the id suffix is written only
//! when the event has an id.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::config::{EVENT_MESSAGE_BUFFER_SIZE, FIRMWARE_VERSION, PROTOCOL_VERSION};
use crate::position::{POSITION_COUNT, Position};
use crate::protocol::Action;

/// Caller-supplied correlation id echoed in replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandId(pub u32);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered list of channels, as reported by SCANNED
pub type ChannelList = Vec<Position, POSITION_COUNT>;

/// A rendered wire message
pub type EventLine = String<EVENT_MESSAGE_BUFFER_SIZE>;

const ERROR_UNKNOWN_ACTION: &str = "unknown_action";
const ERROR_BAD_FORMAT: &str = "bad_format";
const ERROR_UNKNOWN_POSITION: &str = "unknown_position";
const ERROR_INVALID_LEVEL: &str = "invalid_level";
const ERROR_NO_TOUCH_CONTROLLER: &str = "no_touch_controller";
const ERROR_COMMAND_FAILED: &str = "command_failed";
const ERROR_SENSOR_INACTIVE: &str = "sensor_inactive";

/// Machine-readable reason carried by an ERR event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorReason {
    /// Unrecognized action keyword
    UnknownAction,
    /// Malformed or missing token
    BadFormat,
    /// Position letter outside A-Y
    UnknownPosition,
    /// Sensitivity outside 0-7
    InvalidLevel,
    /// Touch subsystem not available
    NoTouchController,
    /// A subsystem rejected the operation
    CommandFailed,
    /// Diagnostic read on a channel not found at boot
    SensorInactive,
}

impl ErrorReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownAction => ERROR_UNKNOWN_ACTION,
            Self::BadFormat => ERROR_BAD_FORMAT,
            Self::UnknownPosition => ERROR_UNKNOWN_POSITION,
            Self::InvalidLevel => ERROR_INVALID_LEVEL,
            Self::NoTouchController => ERROR_NO_TOUCH_CONTROLLER,
            Self::CommandFailed => ERROR_COMMAND_FAILED,
            Self::SensorInactive => ERROR_SENSOR_INACTIVE,
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events produced by the protocol and touch engines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Command accepted (instant commands: executed)
    Ack {
        action: Action,
        position: Option<Position>,
        id: Option<CommandId>,
    },
    /// Long-running command finished
    Done {
        action: Action,
        position: Option<Position>,
        id: Option<CommandId>,
    },
    /// Command rejected or failed
    Error {
        reason: ErrorReason,
        id: Option<CommandId>,
    },
    /// No room to admit the command; retry later
    Busy { id: Option<CommandId> },
    /// Watched press observed
    Touched {
        position: Position,
        id: Option<CommandId>,
    },
    /// Watched release observed
    TouchReleased {
        position: Position,
        id: Option<CommandId>,
    },
    /// Channels found at boot
    Scanned {
        channels: ChannelList,
        id: Option<CommandId>,
    },
    /// Recalibration triggered; `None` means every channel
    Recalibrated {
        position: Option<Position>,
        id: Option<CommandId>,
    },
    /// Firmware and protocol versions
    Info { id: Option<CommandId> },
    /// Raw delta reading of one channel
    Value {
        position: Position,
        delta: i8,
        id: Option<CommandId>,
    },
}

impl Event {
    pub const fn id(&self) -> Option<CommandId> {
        match self {
            Self::Ack { id, .. }
            | Self::Done { id, .. }
            | Self::Error { id, .. }
            | Self::Busy { id }
            | Self::Touched { id, .. }
            | Self::TouchReleased { id, .. }
            | Self::Scanned { id, .. }
            | Self::Recalibrated { id, .. }
            | Self::Info { id }
            | Self::Value { id, .. } => *id,
        }
    }

    /// Wire type keyword
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ack { .. } => "ACK",
            Self::Done { .. } => "DONE",
            Self::Error { .. } => "ERR",
            Self::Busy { .. } => "BUSY",
            Self::Touched { .. } => "TOUCHED",
            Self::TouchReleased { .. } => "TOUCH_RELEASED",
            Self::Scanned { .. } => "SCANNED",
            Self::Recalibrated { .. } => "RECALIBRATED",
            Self::Info { .. } => "INFO",
            Self::Value { .. } => "VALUE",
        }
    }

    /// Render the complete wire line, newline included
    pub fn render(&self) -> Result<EventLine, fmt::Error> {
        let mut line = EventLine::new();
        write!(line, "{}", self)?;
        line.push('\n').map_err(|()| fmt::Error)?;
        Ok(line)
    }
}

/// Write `[A,C,F]`
pub fn write_channel_list<W: Write>(out: &mut W, channels: &[Position]) -> fmt::Result {
    out.write_char('[')?;
    for (i, position) in channels.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        out.write_char(position.letter())?;
    }
    out.write_char(']')
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())?;
        match self {
            Self::Ack {
                action, position, ..
            }
            | Self::Done {
                action, position, ..
            } => {
                write!(f, " {}", action.as_str())?;
                if let Some(position) = position {
                    write!(f, " {}", position)?;
                }
            }
            Self::Error { reason, .. } => write!(f, " {}", reason)?,
            Self::Busy { .. } | Self::Info { .. } => {}
            Self::Touched { position, .. } | Self::TouchReleased { position, .. } => {
                write!(f, " {}", position)?;
            }
            Self::Scanned { channels, .. } => {
                f.write_char(' ')?;
                write_channel_list(f, channels)?;
            }
            Self::Recalibrated { position, .. } => match position {
                Some(position) => write!(f, " {}", position)?,
                None => f.write_str(" ALL")?,
            },
            Self::Value {
                position, delta, ..
            } => write!(f, " {} {}", position, delta)?,
        }
        if let Self::Info { .. } = self {
            write!(
                f,
                " firmware={} protocol={}",
                FIRMWARE_VERSION, PROTOCOL_VERSION
            )?;
        }
        if let Some(id) = self.id() {
            write!(f, " #{}", id)?;
        }
        Ok(())
    }
}
