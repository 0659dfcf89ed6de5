//! Command line grammar
//!
//! `ACTION [POSITION] [PARAM] [#ID]`, or `MENUE_CHANGE R,G,B RANGE [#ID]`.
//! The id is split off first so that every failure past that point can
//! still be correlated.

use core::fmt;
use core::str::SplitAsciiWhitespace;

use crate::color::Rgb;
use crate::event::{CommandId, ErrorReason};
use crate::position::Position;
use crate::touch::Sensitivity;

use super::command::{Action, Command, Request};

const ID_MARKER: char = '#';

/// A rejected line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParseFailure {
    pub reason: ErrorReason,
    /// Id of the line, if it carried a well-formed one
    pub id: Option<CommandId>,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason.as_str())
    }
}

/// Parse one complete line, terminator excluded
pub fn parse_line(line: &str) -> Result<Request, ParseFailure> {
    let (body, id) = split_id(line)?;
    let fail = |reason| ParseFailure { reason, id };

    let mut tokens = body.split_ascii_whitespace();
    let keyword = tokens.next().ok_or(fail(ErrorReason::BadFormat))?;
    let action = Action::parse_from_str(keyword).ok_or(fail(ErrorReason::UnknownAction))?;

    let command = parse_arguments(action, &mut tokens).map_err(fail)?;
    if tokens.next().is_some() {
        return Err(fail(ErrorReason::BadFormat));
    }
    Ok(Request { command, id })
}

/// Split off a trailing `#<decimal>` id
fn split_id(line: &str) -> Result<(&str, Option<CommandId>), ParseFailure> {
    let Some((body, raw)) = line.rsplit_once(ID_MARKER) else {
        return Ok((line, None));
    };
    let id = parse_decimal(raw.trim())
        .map(CommandId)
        .ok_or(ParseFailure {
            reason: ErrorReason::BadFormat,
            id: None,
        })?;
    Ok((body, Some(id)))
}

fn parse_arguments(
    action: Action,
    tokens: &mut SplitAsciiWhitespace<'_>,
) -> Result<Command, ErrorReason> {
    if action == Action::MenuChange {
        let color = tokens.next().and_then(parse_rgb).ok_or(ErrorReason::BadFormat)?;
        let range = tokens
            .next()
            .and_then(parse_decimal)
            .and_then(|range| u8::try_from(range).ok())
            .ok_or(ErrorReason::BadFormat)?;
        return Ok(Command::MenuChange { color, range });
    }

    let position = if action.requires_position() {
        Some(parse_position(tokens.next())?)
    } else {
        None
    };

    Ok(match (action, position) {
        (Action::HideAll, _) => Command::HideAll,
        (Action::SequenceCompleted, _) => Command::SequenceCompleted,
        (Action::RecalibrateAll, _) => Command::RecalibrateAll,
        (Action::Scan, _) => Command::Scan,
        (Action::Info, _) => Command::Info,
        (Action::Ping, _) => Command::Ping,
        (Action::Show, Some(position)) => Command::Show(position),
        (Action::Hide, Some(position)) => Command::Hide(position),
        (Action::Success, Some(position)) => Command::Success(position),
        (Action::Fail, Some(position)) => Command::Fail(position),
        (Action::Contract, Some(position)) => Command::Contract(position),
        (Action::Blink, Some(position)) => Command::Blink(position),
        (Action::StopBlink, Some(position)) => Command::StopBlink(position),
        (Action::ExpandStep, Some(position)) => Command::ExpandStep(position),
        (Action::ContractStep, Some(position)) => Command::ContractStep(position),
        (Action::Expect, Some(position)) => Command::Expect(position),
        (Action::ExpectRelease, Some(position)) => Command::ExpectRelease(position),
        (Action::Recalibrate, Some(position)) => Command::Recalibrate(position),
        (Action::Value, Some(position)) => Command::Value(position),
        (Action::SetSensitivity, Some(position)) => Command::SetSensitivity {
            position,
            level: parse_level(tokens.next())?,
        },
        _ => return Err(ErrorReason::BadFormat),
    })
}

/// A single letter A-Y; anything longer is malformed
fn parse_position(token: Option<&str>) -> Result<Position, ErrorReason> {
    let token = token.ok_or(ErrorReason::BadFormat)?;
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Position::from_letter(letter).ok_or(ErrorReason::UnknownPosition),
        _ => Err(ErrorReason::BadFormat),
    }
}

fn parse_level(token: Option<&str>) -> Result<Sensitivity, ErrorReason> {
    let token = token.ok_or(ErrorReason::BadFormat)?;
    if !is_decimal(token) {
        return Err(ErrorReason::BadFormat);
    }
    parse_decimal(token)
        .and_then(|level| u8::try_from(level).ok())
        .and_then(Sensitivity::new)
        .ok_or(ErrorReason::InvalidLevel)
}

/// `R,G,B` with each component 0-255
fn parse_rgb(token: &str) -> Option<Rgb> {
    let mut parts = token.split(',');
    let mut component = || {
        parts
            .next()
            .and_then(parse_decimal)
            .and_then(|value| u8::try_from(value).ok())
    };
    let (r, g, b) = (component()?, component()?, component()?);
    if parts.next().is_some() {
        return None;
    }
    Some(Rgb { r, g, b })
}

fn is_decimal(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit())
}

/// Unsigned decimal without sign or separators
fn parse_decimal(token: &str) -> Option<u32> {
    if !is_decimal(token) {
        return None;
    }
    token.parse().ok()
}
