//! Feeding status model
//!
//! Two slots, morning and evening, each either not fed or fed with an
//! optional local time of day.

use std::fmt;

use chrono::{NaiveTime, Timelike};

pub mod parse;

pub use parse::{parse_status_body, parse_timestamp};

/// One of the two tracked feeding periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Morning,
    Evening,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Morning, Slot::Evening];

    pub fn name(self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Evening => "evening",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Slot::Morning => "Morning",
            Slot::Evening => "Evening",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Local wall clock time of a feeding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FeedTime(NaiveTime);

impl FeedTime {
    pub fn new(time: NaiveTime) -> Self {
        Self(time)
    }

    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, second).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Hour and minute, the granularity shown on the panel
    pub fn hour_minute(&self) -> (u32, u32) {
        (self.0.hour(), self.0.minute())
    }

    /// Panel form, e.g. `9:26 AM`
    pub fn display(&self) -> String {
        self.0.format("%-I:%M %p").to_string()
    }

    /// Form published over MQTT and accepted back from the API, e.g. `9:26:25 am`
    pub fn payload(&self) -> String {
        self.0.format("%-I:%M:%S %P").to_string()
    }
}

impl fmt::Display for FeedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// State of one slot
///
/// `fed_at` is only ever present when `fed` is set. Fed without a time is a
/// valid state of its own and is shown as plain "Fed".
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedingSlot {
    fed: bool,
    fed_at: Option<FeedTime>,
}

impl FeedingSlot {
    pub const NOT_FED: FeedingSlot = FeedingSlot {
        fed: false,
        fed_at: None,
    };

    pub fn fed_at(time: FeedTime) -> Self {
        Self {
            fed: true,
            fed_at: Some(time),
        }
    }

    pub fn fed_unknown_time() -> Self {
        Self {
            fed: true,
            fed_at: None,
        }
    }

    pub fn is_fed(&self) -> bool {
        self.fed
    }

    pub fn time(&self) -> Option<FeedTime> {
        self.fed_at
    }

    /// Text shown under the bowl
    pub fn label(&self) -> String {
        match (self.fed, self.fed_at) {
            (false, _) => "Not fed".to_string(),
            (true, None) => "Fed".to_string(),
            (true, Some(time)) => format!("Fed at {}", time.display()),
        }
    }
}

impl PartialEq for FeedingSlot {
    fn eq(&self, other: &Self) -> bool {
        if self.fed != other.fed {
            return false;
        }
        !self.fed || self.fed_at.map(|t| t.hour_minute()) == other.fed_at.map(|t| t.hour_minute())
    }
}

impl Eq for FeedingSlot {}

/// Complete observation of both slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub morning: FeedingSlot,
    pub evening: FeedingSlot,
}

impl StatusSnapshot {
    pub fn new(morning: FeedingSlot, evening: FeedingSlot) -> Self {
        Self { morning, evening }
    }

    pub fn slot(&self, slot: Slot) -> FeedingSlot {
        match slot {
            Slot::Morning => self.morning,
            Slot::Evening => self.evening,
        }
    }

    pub fn with_slot(mut self, slot: Slot, value: FeedingSlot) -> Self {
        match slot {
            Slot::Morning => self.morning = value,
            Slot::Evening => self.evening = value,
        }
        self
    }

    /// Slots whose visible state differs from `other`
    pub fn changed_slots(&self, other: &StatusSnapshot) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| self.slot(*slot) != other.slot(*slot))
            .collect()
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "morning: {}, evening: {}",
            self.morning.label(),
            self.evening.label()
        )
    }
}
