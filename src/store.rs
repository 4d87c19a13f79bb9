//! Last known feeding status

use crate::status::StatusSnapshot;

/// Current snapshot plus whether the first reconciliation is still pending.
///
/// Lives in RAM only. A deep sleep resets it, the API holds the real state.
#[derive(Debug, Clone)]
pub struct StatusStore {
    current: StatusSnapshot,
    first_update: bool,
}

impl StatusStore {
    pub fn new() -> Self {
        Self {
            current: StatusSnapshot::default(),
            first_update: true,
        }
    }

    pub fn get(&self) -> StatusSnapshot {
        self.current
    }

    pub fn replace(&mut self, snapshot: StatusSnapshot) {
        self.current = snapshot;
    }

    pub fn is_first_update(&self) -> bool {
        self.first_update
    }

    pub(crate) fn mark_updated(&mut self) {
        self.first_update = false;
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{FeedTime, FeedingSlot};

    #[test]
    fn starts_not_fed_and_pending() {
        let store = StatusStore::new();
        assert!(store.is_first_update());
        assert!(!store.get().morning.is_fed());
        assert!(!store.get().evening.is_fed());
    }

    #[test]
    fn replace_overwrites_both_slots() {
        let mut store = StatusStore::new();
        let fed = FeedingSlot::fed_at(FeedTime::from_hms(7, 45, 0).unwrap());
        store.replace(StatusSnapshot::new(fed, FeedingSlot::fed_unknown_time()));
        assert_eq!(store.get().morning.label(), "Fed at 7:45 AM");
        assert_eq!(store.get().evening.label(), "Fed");

        store.replace(StatusSnapshot::default());
        assert_eq!(store.get(), StatusSnapshot::default());
        assert!(store.is_first_update());
    }
}
