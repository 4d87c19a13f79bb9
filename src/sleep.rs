//! Deep sleep outside the feeding windows

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::config::ActiveWindows;

pub const BEFORE_MORNING: &str = "before morning window";
pub const BETWEEN_WINDOWS: &str = "between feeding windows";
pub const AFTER_EVENING: &str = "after evening window";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepDecision {
    StayActive,
    SleepFor(Duration, &'static str),
}

/// Platform deep sleep and reset
pub trait PowerControl {
    /// Sleep with a timer wakeup. The device boots fresh afterwards.
    fn deep_sleep(&mut self, duration: Duration) -> !;

    fn restart(&mut self) -> !;
}

pub struct SleepScheduler {
    windows: ActiveWindows,
    min_sleep: Duration,
}

impl SleepScheduler {
    pub fn new(windows: ActiveWindows, min_sleep: Duration) -> Self {
        Self { windows, min_sleep }
    }

    /// Time until the next window opens, or `StayActive` inside a window
    pub fn evaluate(&self, now: NaiveDateTime) -> SleepDecision {
        let w = &self.windows;
        let hour = now.hour();
        let today = now.date();

        let (target, reason) = if hour < u32::from(w.morning_start) {
            (at_hour(today, w.morning_start), BEFORE_MORNING)
        } else if hour >= u32::from(w.morning_end) && hour < u32::from(w.evening_start) {
            (at_hour(today, w.evening_start), BETWEEN_WINDOWS)
        } else if hour >= u32::from(w.evening_end) {
            let tomorrow = today.succ_opt().and_then(|d| at_hour(d, w.morning_start));
            (tomorrow, AFTER_EVENING)
        } else {
            return SleepDecision::StayActive;
        };

        match target.map(|t| t - now).and_then(|d| d.to_std().ok()) {
            Some(duration) if !duration.is_zero() => SleepDecision::SleepFor(duration, reason),
            _ => SleepDecision::StayActive,
        }
    }

    /// Like [`Self::evaluate`] but ignores sleeps too short to be worth it
    pub fn should_sleep(&self, now: NaiveDateTime) -> Option<(Duration, &'static str)> {
        match self.evaluate(now) {
            SleepDecision::SleepFor(duration, reason) if duration > self.min_sleep => {
                Some((duration, reason))
            }
            _ => None,
        }
    }
}

fn at_hour(date: NaiveDate, hour: u8) -> Option<NaiveDateTime> {
    date.and_hms_opt(u32::from(hour), 0, 0)
}
