use std::time::Duration;

use esp_idf_svc::hal::reset::{self, ResetReason, WakeupReason};
use log::info;

use crate::sleep::PowerControl;

/// Whether this boot is a wake from deep sleep rather than a power on
pub fn resumed_from_sleep() -> bool {
    let wakeup = WakeupReason::get();
    info!("Wakeup reason: {:?}, reset reason: {:?}", wakeup, ResetReason::get());
    !matches!(wakeup, WakeupReason::Unknown)
}

pub struct EspPower;

impl PowerControl for EspPower {
    fn deep_sleep(&mut self, duration: Duration) -> ! {
        info!("Sleeping for {} s", duration.as_secs());
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        unsafe { esp_idf_svc::sys::esp_deep_sleep(micros) }
    }

    fn restart(&mut self) -> ! {
        reset::restart()
    }
}
