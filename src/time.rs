//! Clocks and wall time keeping
//!
//! The firmware uses two kinds of time: a monotonic clock for rate limits and
//! intervals, and local wall clock time for the sleep windows. The wall clock
//! comes from SNTP on the device and is kept fresh by [`TimeKeeper`].

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::{info, warn};

/// Source of monotonic and local wall clock time
pub trait Clock {
    /// Time since boot, never goes backwards
    fn monotonic(&self) -> Duration;

    /// Local wall clock time, possibly stale if sync failed
    fn local_now(&self) -> NaiveDateTime;
}

/// Clock backed by the standard library and the system RTC
pub struct SystemClock {
    started: Instant,
    utc_offset_hours: i32,
}

impl SystemClock {
    pub fn new(utc_offset_hours: i32) -> Self {
        Self {
            started: Instant::now(),
            utc_offset_hours,
        }
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.started.elapsed()
    }

    fn local_now(&self) -> NaiveDateTime {
        let utc = Utc::now().naive_utc();
        utc_to_local(utc, self.utc_offset_hours).unwrap_or(utc)
    }
}

/// Shift a UTC timestamp by a whole hour offset
pub fn utc_to_local(utc: NaiveDateTime, utc_offset_hours: i32) -> Option<NaiveDateTime> {
    let offset = FixedOffset::east_opt(utc_offset_hours.checked_mul(3600)?)?;
    Some(Utc.from_utc_datetime(&utc).with_timezone(&offset).naive_local())
}

/// Milliseconds for `DelayNs::delay_ms`, saturating at `u32::MAX`
pub(crate) fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Wall clock synchronisation, SNTP on the device
pub trait TimeSync {
    /// Run or check one synchronisation. An error means the clock may be stale.
    fn sync(&mut self) -> Result<()>;
}

/// Runs [`TimeSync`] on a fixed interval
pub struct TimeKeeper<S> {
    sync: S,
    interval: Duration,
    last_sync: Option<Duration>,
}

impl<S: TimeSync> TimeKeeper<S> {
    pub fn new(sync: S, interval: Duration) -> Self {
        Self {
            sync,
            interval,
            last_sync: None,
        }
    }

    /// Sync regardless of the interval
    pub fn sync_now(&mut self, now: Duration) -> bool {
        match self.sync.sync() {
            Ok(()) => {
                info!("Device time synchronised");
                self.last_sync = Some(now);
                true
            }
            Err(err) => {
                warn!("Could not sync device time: {:#}", err);
                false
            }
        }
    }

    /// Sync if the interval has passed since the last successful sync.
    /// Returns true when a sync was attempted.
    pub fn maybe_sync(&mut self, now: Duration) -> bool {
        let due = match self.last_sync {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval,
        };
        if due {
            self.sync_now(now);
        }
        due
    }

    pub fn last_sync(&self) -> Option<Duration> {
        self.last_sync
    }

    /// False until the first successful sync, the wall clock is unset before that
    pub fn is_synced(&self) -> bool {
        self.last_sync.is_some()
    }
}
