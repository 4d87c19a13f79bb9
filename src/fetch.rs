//! Status API access with bounded retries

use std::time::Duration;

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::error::{FeederError, FetchError};
use crate::health::ConnectionHealth;
use crate::status::StatusSnapshot;
use crate::time::millis;

/// One GET of the status endpoint
pub trait StatusApi {
    fn fetch(&mut self) -> Result<StatusSnapshot, FetchError>;

    /// Drop cached connections and buffers, the next fetch starts clean
    fn release(&mut self) {}
}

impl<T: StatusApi + ?Sized> StatusApi for Box<T> {
    fn fetch(&mut self) -> Result<StatusSnapshot, FetchError> {
        (**self).fetch()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Retries [`StatusApi::fetch`] with a fixed delay and tracks connection health.
pub struct StatusFetcher<A, D> {
    api: A,
    delay: D,
    max_retries: u32,
    retry_delay: Duration,
    health: ConnectionHealth,
}

impl<A: StatusApi, D: DelayNs> StatusFetcher<A, D> {
    pub fn new(api: A, delay: D, max_retries: u32, retry_delay: Duration, health: ConnectionHealth) -> Self {
        Self {
            api,
            delay,
            max_retries: max_retries.max(1),
            retry_delay,
            health,
        }
    }

    /// Fetch the current snapshot.
    ///
    /// `Ok(None)` means every attempt failed and there is no observation this
    /// tick. Running out of memory is returned as
    /// [`FeederError::ResourceExhausted`] for the main loop to handle.
    pub fn fetch(&mut self) -> Result<Option<StatusSnapshot>> {
        for attempt in 1..=self.max_retries {
            info!(
                "Fetching dog feed status (attempt {}/{})",
                attempt, self.max_retries
            );

            match self.api.fetch() {
                Ok(snapshot) => {
                    self.health.record_success();
                    info!("Status: {}", snapshot);
                    return Ok(Some(snapshot));
                }
                Err(FetchError::ResourceExhausted(size)) => {
                    return Err(FeederError::ResourceExhausted(format!(
                        "status body of {} bytes",
                        size
                    ))
                    .into());
                }
                Err(err) => {
                    warn!("Error fetching status: {}", err);
                    if attempt < self.max_retries {
                        self.delay.delay_ms(millis(self.retry_delay));
                    }
                }
            }
        }

        self.health.record_failure();
        Ok(None)
    }

    pub fn health(&self) -> &ConnectionHealth {
        &self.health
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDelay, ScriptedApi};
    use crate::status::FeedingSlot;

    fn fetcher(api: ScriptedApi, delay: FakeDelay) -> StatusFetcher<ScriptedApi, FakeDelay> {
        StatusFetcher::new(api, delay, 3, Duration::from_secs(2), ConnectionHealth::new(5))
    }

    #[test]
    fn retries_until_success() {
        let api = ScriptedApi::new();
        api.push(Err(FetchError::Status(502)));
        api.push(Err(FetchError::Transport("timed out".into())));
        api.push(Ok(StatusSnapshot::new(FeedingSlot::fed_unknown_time(), FeedingSlot::NOT_FED)));
        let delay = FakeDelay::default();
        let mut fetcher = fetcher(api.clone(), delay.clone());

        let snapshot = fetcher.fetch().unwrap().unwrap();
        assert!(snapshot.morning.is_fed());
        assert_eq!(api.calls(), 3);
        assert_eq!(delay.total(), Duration::from_secs(4));
        assert_eq!(fetcher.health().failures(), 0);
    }

    #[test]
    fn exhausted_retries_yield_no_observation() {
        let api = ScriptedApi::new();
        for _ in 0..3 {
            api.push(Err(FetchError::Status(500)));
        }
        let delay = FakeDelay::default();
        let mut fetcher = fetcher(api.clone(), delay.clone());

        assert!(fetcher.fetch().unwrap().is_none());
        assert_eq!(api.calls(), 3);
        // no pause after the last attempt
        assert_eq!(delay.total(), Duration::from_secs(4));
        assert_eq!(fetcher.health().failures(), 1);
    }

    #[test]
    fn memory_exhaustion_is_escalated() {
        let api = ScriptedApi::new();
        api.push(Err(FetchError::ResourceExhausted(65536)));
        let mut fetcher = fetcher(api.clone(), FakeDelay::default());

        let err = fetcher.fetch().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FeederError>(),
            Some(FeederError::ResourceExhausted(_))
        ));
        assert_eq!(api.calls(), 1);
    }
}
