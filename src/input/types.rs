//! Types for input handling

use crate::status::Slot;

/// The four MagTag buttons, left to right when viewed from the front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    MorningFed,
    MorningClear,
    EveningFed,
    EveningClear,
}

/// What a button asks the remote system to record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedAction {
    Fed,
    Clear,
}

/// Button state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

impl Button {
    /// Polling order
    pub const ALL: [Button; 4] = [
        Button::MorningFed,
        Button::MorningClear,
        Button::EveningFed,
        Button::EveningClear,
    ];

    pub fn slot(self) -> Slot {
        match self {
            Button::MorningFed | Button::MorningClear => Slot::Morning,
            Button::EveningFed | Button::EveningClear => Slot::Evening,
        }
    }

    pub fn action(self) -> FeedAction {
        match self {
            Button::MorningFed | Button::EveningFed => FeedAction::Fed,
            Button::MorningClear | Button::EveningClear => FeedAction::Clear,
        }
    }

    /// Silkscreen name of the pin
    pub fn pin_name(self) -> &'static str {
        match self {
            Button::MorningFed => "D15",
            Button::MorningClear => "D14",
            Button::EveningFed => "D12",
            Button::EveningClear => "D11",
        }
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.action() {
            FeedAction::Fed => write!(f, "{} fed ({})", self.slot(), self.pin_name()),
            FeedAction::Clear => write!(f, "{} clear ({})", self.slot(), self.pin_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_map_to_slots_and_actions() {
        assert_eq!(Button::MorningClear.slot(), Slot::Morning);
        assert_eq!(Button::MorningClear.action(), FeedAction::Clear);
        assert_eq!(Button::EveningFed.slot(), Slot::Evening);
        assert_eq!(Button::EveningFed.action(), FeedAction::Fed);
        assert_eq!(Button::ALL[0].to_string(), "morning fed (D15)");
    }
}
