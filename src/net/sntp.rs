use std::time::Duration;

use anyhow::{bail, Result};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::sntp::{EspSntp, SyncStatus};
use log::info;

use crate::time::TimeSync;

const POLL_MS: u32 = 100;

/// System clock kept in UTC by SNTP
pub struct SntpSync {
    sntp: EspSntp<'static>,
    timeout: Duration,
    synced: bool,
}

impl SntpSync {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            sntp: EspSntp::new_default()?,
            timeout,
            synced: false,
        })
    }
}

impl TimeSync for SntpSync {
    /// Wait for the first sync to complete. The background client re-syncs
    /// on its own after that, later calls only report it.
    fn sync(&mut self) -> Result<()> {
        if self.synced {
            if self.sntp.get_sync_status() == SyncStatus::Completed {
                info!("SNTP re-synced in background");
            }
            return Ok(());
        }

        let mut waited = Duration::ZERO;
        while self.sntp.get_sync_status() != SyncStatus::Completed {
            if waited >= self.timeout {
                bail!("SNTP sync not completed after {:?}", waited);
            }
            FreeRtos::delay_ms(POLL_MS);
            waited += Duration::from_millis(u64::from(POLL_MS));
        }
        self.synced = true;
        info!("Time synchronized: {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        Ok(())
    }
}
