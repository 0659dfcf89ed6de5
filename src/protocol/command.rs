//! Actions and validated commands

use crate::color::Rgb;
use crate::event::CommandId;
use crate::position::Position;
use crate::touch::Sensitivity;

const ACTION_NAME_SHOW: &str = "SHOW";
const ACTION_NAME_HIDE: &str = "HIDE";
const ACTION_NAME_HIDE_ALL: &str = "HIDE_ALL";
const ACTION_NAME_SUCCESS: &str = "SUCCESS";
const ACTION_NAME_FAIL: &str = "FAIL";
const ACTION_NAME_CONTRACT: &str = "CONTRACT";
const ACTION_NAME_BLINK: &str = "BLINK";
const ACTION_NAME_STOP_BLINK: &str = "STOP_BLINK";
const ACTION_NAME_EXPAND_STEP: &str = "EXPAND_STEP";
const ACTION_NAME_CONTRACT_STEP: &str = "CONTRACT_STEP";
const ACTION_NAME_MENU_CHANGE: &str = "MENUE_CHANGE";
const ACTION_NAME_SEQUENCE_COMPLETED: &str = "SEQUENCE_COMPLETED";
const ACTION_NAME_EXPECT: &str = "EXPECT";
const ACTION_NAME_EXPECT_RELEASE: &str = "EXPECT_RELEASE";
const ACTION_NAME_RECALIBRATE: &str = "RECALIBRATE";
const ACTION_NAME_RECALIBRATE_ALL: &str = "RECALIBRATE_ALL";
const ACTION_NAME_VALUE: &str = "VALUE";
const ACTION_NAME_SET_SENSITIVITY: &str = "SET_SENSITIVITY";
const ACTION_NAME_SCAN: &str = "SCAN";
const ACTION_NAME_INFO: &str = "INFO";
const ACTION_NAME_PING: &str = "PING";

/// Action keywords understood on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    Show,
    Hide,
    HideAll,
    Success,
    Fail,
    Contract,
    Blink,
    StopBlink,
    ExpandStep,
    ContractStep,
    MenuChange,
    SequenceCompleted,
    Expect,
    ExpectRelease,
    Recalibrate,
    RecalibrateAll,
    Value,
    SetSensitivity,
    Scan,
    Info,
    Ping,
}

impl Action {
    pub const ALL: [Self; 21] = [
        Self::Show,
        Self::Hide,
        Self::HideAll,
        Self::Success,
        Self::Fail,
        Self::Contract,
        Self::Blink,
        Self::StopBlink,
        Self::ExpandStep,
        Self::ContractStep,
        Self::MenuChange,
        Self::SequenceCompleted,
        Self::Expect,
        Self::ExpectRelease,
        Self::Recalibrate,
        Self::RecalibrateAll,
        Self::Value,
        Self::SetSensitivity,
        Self::Scan,
        Self::Info,
        Self::Ping,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Show => ACTION_NAME_SHOW,
            Self::Hide => ACTION_NAME_HIDE,
            Self::HideAll => ACTION_NAME_HIDE_ALL,
            Self::Success => ACTION_NAME_SUCCESS,
            Self::Fail => ACTION_NAME_FAIL,
            Self::Contract => ACTION_NAME_CONTRACT,
            Self::Blink => ACTION_NAME_BLINK,
            Self::StopBlink => ACTION_NAME_STOP_BLINK,
            Self::ExpandStep => ACTION_NAME_EXPAND_STEP,
            Self::ContractStep => ACTION_NAME_CONTRACT_STEP,
            Self::MenuChange => ACTION_NAME_MENU_CHANGE,
            Self::SequenceCompleted => ACTION_NAME_SEQUENCE_COMPLETED,
            Self::Expect => ACTION_NAME_EXPECT,
            Self::ExpectRelease => ACTION_NAME_EXPECT_RELEASE,
            Self::Recalibrate => ACTION_NAME_RECALIBRATE,
            Self::RecalibrateAll => ACTION_NAME_RECALIBRATE_ALL,
            Self::Value => ACTION_NAME_VALUE,
            Self::SetSensitivity => ACTION_NAME_SET_SENSITIVITY,
            Self::Scan => ACTION_NAME_SCAN,
            Self::Info => ACTION_NAME_INFO,
            Self::Ping => ACTION_NAME_PING,
        }
    }

    /// Case-insensitive keyword lookup
    pub fn parse_from_str(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(keyword))
    }

    /// Whether a position token follows the keyword
    pub const fn requires_position(self) -> bool {
        matches!(
            self,
            Self::Show
                | Self::Hide
                | Self::Success
                | Self::Fail
                | Self::Contract
                | Self::Blink
                | Self::StopBlink
                | Self::ExpandStep
                | Self::ContractStep
                | Self::Expect
                | Self::ExpectRelease
                | Self::Recalibrate
                | Self::Value
                | Self::SetSensitivity
        )
    }

    /// Whether the command is tracked until its effect completes
    pub const fn is_long_running(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Contract | Self::SequenceCompleted | Self::MenuChange
        )
    }
}

/// A validated command with exactly the payload its action needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Show(Position),
    Hide(Position),
    HideAll,
    Success(Position),
    Fail(Position),
    Contract(Position),
    Blink(Position),
    StopBlink(Position),
    ExpandStep(Position),
    ContractStep(Position),
    /// Palette sweep over indices `0..=range`
    MenuChange { color: Rgb, range: u8 },
    SequenceCompleted,
    Expect(Position),
    ExpectRelease(Position),
    Recalibrate(Position),
    RecalibrateAll,
    Value(Position),
    SetSensitivity {
        position: Position,
        level: Sensitivity,
    },
    Scan,
    Info,
    Ping,
}

impl Command {
    pub const fn action(&self) -> Action {
        match self {
            Self::Show(_) => Action::Show,
            Self::Hide(_) => Action::Hide,
            Self::HideAll => Action::HideAll,
            Self::Success(_) => Action::Success,
            Self::Fail(_) => Action::Fail,
            Self::Contract(_) => Action::Contract,
            Self::Blink(_) => Action::Blink,
            Self::StopBlink(_) => Action::StopBlink,
            Self::ExpandStep(_) => Action::ExpandStep,
            Self::ContractStep(_) => Action::ContractStep,
            Self::MenuChange { .. } => Action::MenuChange,
            Self::SequenceCompleted => Action::SequenceCompleted,
            Self::Expect(_) => Action::Expect,
            Self::ExpectRelease(_) => Action::ExpectRelease,
            Self::Recalibrate(_) => Action::Recalibrate,
            Self::RecalibrateAll => Action::RecalibrateAll,
            Self::Value(_) => Action::Value,
            Self::SetSensitivity { .. } => Action::SetSensitivity,
            Self::Scan => Action::Scan,
            Self::Info => Action::Info,
            Self::Ping => Action::Ping,
        }
    }

    pub const fn position(&self) -> Option<Position> {
        match *self {
            Self::Show(position)
            | Self::Hide(position)
            | Self::Success(position)
            | Self::Fail(position)
            | Self::Contract(position)
            | Self::Blink(position)
            | Self::StopBlink(position)
            | Self::ExpandStep(position)
            | Self::ContractStep(position)
            | Self::Expect(position)
            | Self::ExpectRelease(position)
            | Self::Recalibrate(position)
            | Self::Value(position)
            | Self::SetSensitivity { position, .. } => Some(position),
            Self::HideAll
            | Self::MenuChange { .. }
            | Self::SequenceCompleted
            | Self::RecalibrateAll
            | Self::Scan
            | Self::Info
            | Self::Ping => None,
        }
    }

    pub const fn is_long_running(&self) -> bool {
        self.action().is_long_running()
    }
}

/// A command together with its correlation id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub id: Option<CommandId>,
}
