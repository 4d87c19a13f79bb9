//! Main loop
//!
//! One tick syncs the clock when due, polls every event source in order,
//! reconciles what they observed, retries dropped refreshes and finally asks
//! the sleep scheduler whether to power down. [`FeederApp::run`] repeats
//! ticks forever and turns tick errors into short pauses.

use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use log::{debug, error, info};

use crate::config::Config;
use crate::display::{Feedback, Panel};
use crate::error::FeederError;
use crate::events::{EventContext, EventSource};
use crate::fetch::{StatusApi, StatusFetcher};
use crate::indicator::PixelWriter;
use crate::reconcile::Reconciler;
use crate::sleep::{PowerControl, SleepScheduler};
use crate::status::StatusSnapshot;
use crate::time::{millis, Clock, TimeKeeper, TimeSync};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Sleep(Duration, &'static str),
    Reset,
}

/// How the loop treats a failed tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Out of memory, clean up and retry in place
    ResourceExhausted,
    Other,
}

pub fn classify(err: &anyhow::Error) -> Fault {
    match err.downcast_ref::<FeederError>() {
        Some(FeederError::ResourceExhausted(_)) => Fault::ResourceExhausted,
        None => Fault::Other,
    }
}

/// Everything the event sources reach through [`EventContext`]
struct FeederCore<A, P, W, D, C> {
    clock: C,
    fetcher: StatusFetcher<A, D>,
    reconciler: Reconciler<P, W, D>,
    delay: D,
    tick_started: Duration,
}

impl<A, P, W, D, C> EventContext for FeederCore<A, P, W, D, C>
where
    A: StatusApi,
    P: Panel,
    W: PixelWriter,
    D: DelayNs,
    C: Clock,
{
    fn now(&self) -> Duration {
        self.tick_started
    }

    fn local_now(&self) -> NaiveDateTime {
        self.clock.local_now()
    }

    fn fetch_status(&mut self) -> Result<Option<StatusSnapshot>> {
        self.fetcher.fetch()
    }

    fn feedback(&mut self) -> &mut dyn Feedback {
        self.reconciler.feedback()
    }

    fn pause(&mut self, duration: Duration) {
        self.delay.delay_ms(millis(duration));
    }

    fn schedule_refresh(&mut self, at: Duration) {
        self.reconciler.schedule_refresh(at);
    }
}

pub struct FeederApp<A, P, W, D, C, S> {
    core: FeederCore<A, P, W, D, C>,
    sources: Vec<Box<dyn EventSource>>,
    time: TimeKeeper<S>,
    sleep: SleepScheduler,
    loop_delay: Duration,
    fault_delay: Duration,
}

impl<A, P, W, D, C, S> FeederApp<A, P, W, D, C, S>
where
    A: StatusApi,
    P: Panel,
    W: PixelWriter,
    D: DelayNs,
    C: Clock,
    S: TimeSync,
{
    pub fn new(
        config: &Config,
        clock: C,
        fetcher: StatusFetcher<A, D>,
        reconciler: Reconciler<P, W, D>,
        time: TimeKeeper<S>,
        delay: D,
    ) -> Self {
        Self {
            core: FeederCore {
                clock,
                fetcher,
                reconciler,
                delay,
                tick_started: Duration::ZERO,
            },
            sources: Vec::new(),
            time,
            sleep: SleepScheduler::new(config.windows, config.min_sleep),
            loop_delay: config.loop_delay,
            fault_delay: config.fault_delay,
        }
    }

    /// Sources are polled in the order they are added
    pub fn add_source(&mut self, source: impl EventSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn tick(&mut self) -> Result<TickOutcome> {
        let now = self.core.clock.monotonic();
        self.core.tick_started = now;

        self.time.maybe_sync(now);

        for source in self.sources.iter_mut() {
            if let Some(observation) = source.poll(&mut self.core)? {
                let at = self.core.clock.monotonic();
                let outcome = self.core.reconciler.reconcile(
                    observation.snapshot,
                    observation.force,
                    at,
                )?;
                debug!(
                    "{} observation (force: {}) -> {:?}",
                    source.name(),
                    observation.force,
                    outcome
                );
            }
        }

        let at = self.core.clock.monotonic();
        self.core.reconciler.service(at)?;

        if self.core.fetcher.health().needs_reset() {
            return Ok(TickOutcome::Reset);
        }

        if !self.time.is_synced() {
            debug!("Wall clock never synced, staying awake");
            return Ok(TickOutcome::Continue);
        }

        let local = self.core.clock.local_now();
        Ok(match self.sleep.should_sleep(local) {
            Some((duration, reason)) => TickOutcome::Sleep(duration, reason),
            None => TickOutcome::Continue,
        })
    }

    /// LEDs off, panel asleep, network clients disconnected
    pub fn prepare_sleep(&mut self) {
        info!("Preparing for deep sleep");
        self.core.reconciler.shutdown();
        for source in self.sources.iter_mut() {
            source.shutdown();
        }
    }

    /// Best effort release of memory held by the HTTP client
    pub fn cleanup(&mut self) {
        self.core.fetcher.api_mut().release();
    }

    /// Run ticks until the device sleeps or resets
    pub fn run(mut self, power: &mut impl PowerControl) -> ! {
        info!("Entering main loop");
        loop {
            match self.tick() {
                Ok(TickOutcome::Continue) => self.pause(self.loop_delay),
                Ok(TickOutcome::Sleep(duration, reason)) => {
                    info!(
                        "Entering deep sleep ({}) for {:.1} hours",
                        reason,
                        duration.as_secs_f32() / 3600.0
                    );
                    self.prepare_sleep();
                    power.deep_sleep(duration);
                }
                Ok(TickOutcome::Reset) => {
                    error!(
                        "Too many failures ({}), resetting",
                        self.core.fetcher.health().failures()
                    );
                    self.prepare_sleep();
                    power.restart();
                }
                Err(err) => {
                    match classify(&err) {
                        Fault::ResourceExhausted => {
                            error!("Memory error: {:#}", err);
                            self.cleanup();
                        }
                        Fault::Other => error!("Main loop error: {:#}", err),
                    }
                    self.pause(self.fault_delay);
                }
            }
        }
    }

    fn pause(&mut self, duration: Duration) {
        self.core.delay.delay_ms(millis(duration));
    }

    pub fn reconciler(&self) -> &Reconciler<P, W, D> {
        &self.core.reconciler
    }
}
