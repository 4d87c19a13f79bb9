//! Display reconciliation
//!
//! Every observation of the feeding status goes through [`Reconciler::reconcile`],
//! which updates the LEDs, stores the snapshot and decides whether the e-ink
//! panel has to be redrawn:
//!
//! - the first observation after boot always refreshes
//! - a forced observation or one that differs from the stored state requests
//!   a refresh through the [`RefreshGate`]
//! - anything else is skipped
//!
//! A refresh the gate drops leaves the reconciler pending. [`Reconciler::service`]
//! retries it once the gate opens, as long as the panel still shows something
//! other than the stored state.

use std::time::Duration;

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::display::{DisplayManager, Feedback, Panel};
use crate::error::PanelError;
use crate::gate::{RefreshGate, RefreshOutcome};
use crate::indicator::PixelWriter;
use crate::status::StatusSnapshot;
use crate::store::StatusStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Refreshed,
    Skipped,
    RateLimited,
}

pub struct Reconciler<P, W, D> {
    store: StatusStore,
    gate: RefreshGate,
    display: DisplayManager<P, W, D>,
    /// Snapshot the panel currently shows
    rendered: Option<StatusSnapshot>,
    pending: bool,
    scheduled: Option<Duration>,
}

impl<P, W, D> Reconciler<P, W, D>
where
    P: Panel,
    W: PixelWriter,
    D: DelayNs,
{
    pub fn new(display: DisplayManager<P, W, D>, gate: RefreshGate) -> Self {
        Self {
            store: StatusStore::new(),
            gate,
            display,
            rendered: None,
            pending: false,
            scheduled: None,
        }
    }

    pub fn reconcile(&mut self, observed: StatusSnapshot, force: bool, now: Duration) -> Result<ReconcileOutcome> {
        let changed_slots = self.store.get().changed_slots(&observed);
        let changed = !changed_slots.is_empty();

        if let Err(err) = self.display.show_indicators(&observed) {
            warn!("Could not update status LEDs: {:#}", err);
        }
        self.store.replace(observed);

        let first = self.store.is_first_update();
        if changed {
            info!("Status changed for {:?}", changed_slots);
        }
        if first {
            info!("First status update - forcing display refresh");
        } else if !(force || changed) {
            info!("No display changes, skipping refresh");
            return Ok(ReconcileOutcome::Skipped);
        }

        let outcome = self.refresh(now)?;
        if first {
            self.store.mark_updated();
        }
        Ok(outcome)
    }

    /// Retry a dropped refresh or run a scheduled one once the gate allows it
    pub fn service(&mut self, now: Duration) -> Result<Option<ReconcileOutcome>> {
        if self.store.is_first_update() {
            // nothing real observed yet, the panel keeps what it shows
            return Ok(None);
        }
        let scheduled_due = self.scheduled.is_some_and(|at| now >= at);
        let stale = self.pending && self.rendered != Some(self.store.get());

        if self.pending && !stale {
            // the panel already shows the stored state
            self.pending = false;
        }
        if !(scheduled_due || stale) || !self.gate.is_open(now) {
            return Ok(None);
        }

        if scheduled_due {
            info!("Running scheduled display refresh");
        } else {
            info!("Retrying dropped display refresh");
        }
        Ok(Some(self.refresh(now)?))
    }

    /// Request an unconditional refresh at monotonic time `at`
    pub fn schedule_refresh(&mut self, at: Duration) {
        self.scheduled = Some(at);
    }

    fn refresh(&mut self, now: Duration) -> Result<ReconcileOutcome, PanelError> {
        let snapshot = self.store.get();
        let display = &mut self.display;

        self.pending = true;
        match self.gate.try_refresh(now, || display.render(&snapshot))? {
            RefreshOutcome::Performed => {
                self.rendered = Some(snapshot);
                self.pending = false;
                if self.scheduled.is_some_and(|at| now >= at) {
                    self.scheduled = None;
                }
                Ok(ReconcileOutcome::Refreshed)
            }
            RefreshOutcome::SkippedTooSoon => Ok(ReconcileOutcome::RateLimited),
        }
    }

    /// LEDs off and panel asleep, ahead of deep sleep
    pub fn shutdown(&mut self) {
        if let Err(err) = self.display.lights_off() {
            warn!("Could not turn LEDs off: {:#}", err);
        }
        if let Err(err) = self.display.sleep_panel() {
            warn!("Could not put panel to sleep: {}", err);
        }
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn scheduled(&self) -> Option<Duration> {
        self.scheduled
    }

    pub fn feedback(&mut self) -> &mut dyn Feedback {
        &mut self.display
    }

    pub fn display(&self) -> &DisplayManager<P, W, D> {
        &self.display
    }
}
