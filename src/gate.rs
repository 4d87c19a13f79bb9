//! Rate limit for physical panel refreshes

use std::time::Duration;

use log::{info, warn};

use crate::error::PanelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Performed,
    SkippedTooSoon,
}

/// Allows at most one refresh per `min_interval` of monotonic time.
///
/// The panel keeps its own busy state and may refuse a refresh the software
/// clock thought was fine. Such a refusal counts as skipped and does not move
/// `last_refresh`. Dropped requests are not queued here.
#[derive(Debug, Clone)]
pub struct RefreshGate {
    min_interval: Duration,
    last_refresh: Option<Duration>,
}

impl RefreshGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_refresh: None,
        }
    }

    /// Whether a refresh at `now` would pass the software check
    pub fn is_open(&self, now: Duration) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.min_interval,
        }
    }

    /// Run `refresh` if the interval allows it
    pub fn try_refresh<F>(&mut self, now: Duration, refresh: F) -> Result<RefreshOutcome, PanelError>
    where
        F: FnOnce() -> Result<(), PanelError>,
    {
        if !self.is_open(now) {
            let since = self
                .last_refresh
                .map(|last| now.saturating_sub(last))
                .unwrap_or_default();
            info!(
                "Skipping refresh, too soon (last: {:.1}s ago)",
                since.as_secs_f32()
            );
            return Ok(RefreshOutcome::SkippedTooSoon);
        }

        match refresh() {
            Ok(()) => {
                self.last_refresh = Some(now);
                info!("Display refreshed");
                Ok(RefreshOutcome::Performed)
            }
            Err(PanelError::TooSoon) => {
                warn!("Display refresh skipped: panel refused, still busy");
                Ok(RefreshOutcome::SkippedTooSoon)
            }
            Err(err) => Err(err),
        }
    }

    pub fn last_refresh(&self) -> Option<Duration> {
        self.last_refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn first_refresh_is_always_allowed() {
        let mut gate = RefreshGate::new(secs(10));
        let outcome = gate.try_refresh(secs(0), || Ok(())).unwrap();
        assert_eq!(outcome, RefreshOutcome::Performed);
        assert_eq!(gate.last_refresh(), Some(secs(0)));
    }

    #[test]
    fn refresh_inside_interval_never_reaches_hardware() {
        let mut gate = RefreshGate::new(secs(10));
        gate.try_refresh(secs(100), || Ok(())).unwrap();

        let called = Cell::new(false);
        for now in [100, 101, 105, 109] {
            let outcome = gate
                .try_refresh(secs(now), || {
                    called.set(true);
                    Ok(())
                })
                .unwrap();
            assert_eq!(outcome, RefreshOutcome::SkippedTooSoon);
        }
        assert!(!called.get());

        let outcome = gate.try_refresh(secs(110), || Ok(())).unwrap();
        assert_eq!(outcome, RefreshOutcome::Performed);
        assert_eq!(gate.last_refresh(), Some(secs(110)));
    }

    #[test]
    fn hardware_refusal_does_not_advance() {
        let mut gate = RefreshGate::new(secs(10));
        gate.try_refresh(secs(0), || Ok(())).unwrap();

        let outcome = gate.try_refresh(secs(20), || Err(PanelError::TooSoon)).unwrap();
        assert_eq!(outcome, RefreshOutcome::SkippedTooSoon);
        assert_eq!(gate.last_refresh(), Some(secs(0)));
        assert!(gate.is_open(secs(21)));
    }

    #[test]
    fn other_panel_errors_propagate() {
        let mut gate = RefreshGate::new(secs(10));
        let err = gate
            .try_refresh(secs(0), || Err(PanelError::BusyTimeout(5000)))
            .unwrap_err();
        assert!(matches!(err, PanelError::BusyTimeout(5000)));
        assert_eq!(gate.last_refresh(), None);
    }
}
