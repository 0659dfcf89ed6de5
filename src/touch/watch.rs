use crate::event::CommandId;

/// One-shot subscription to the next press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Watch {
    #[default]
    Idle,
    /// Waiting, replies carry this id
    Armed(Option<CommandId>),
}

impl Watch {
    pub fn arm(&mut self, id: Option<CommandId>) {
        *self = Self::Armed(id);
    }

    pub fn clear(&mut self) {
        *self = Self::Idle;
    }

    pub const fn is_armed(&self) -> bool {
        matches!(self, Self::Armed(_))
    }

    /// Consume the watch; `Some` holds the id of the armed request
    pub fn take(&mut self) -> Option<Option<CommandId>> {
        match core::mem::take(self) {
            Self::Armed(id) => Some(id),
            Self::Idle => None,
        }
    }
}
