//! Feeding tracker firmware for the Adafruit MagTag
//!
//! The device shows whether the dog has been fed in the morning and in the
//! evening. Status comes from a REST endpoint, MQTT messages act as change
//! triggers, the four buttons publish changes, and the whole thing deep-sleeps
//! outside the feeding windows.
//!
//! Everything outside `platform`, `wifi` and `net` is hardware independent and
//! is unit tested on the host. The ESP-IDF glue only builds for
//! `target_os = "espidf"`.

pub mod app;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod fetch;
pub mod gate;
pub mod health;
pub mod indicator;
pub mod input;
pub mod reconcile;
pub mod render;
pub mod sleep;
pub mod ssd1680;
pub mod status;
pub mod store;
pub mod time;

#[cfg(test)]
mod testing;

#[cfg(target_os = "espidf")]
pub mod net;
#[cfg(target_os = "espidf")]
pub mod platform;
#[cfg(target_os = "espidf")]
pub mod wifi;

pub use crate::app::{FeederApp, TickOutcome};
pub use crate::config::Config;
pub use crate::reconcile::{ReconcileOutcome, Reconciler};
pub use crate::status::{FeedTime, FeedingSlot, Slot, StatusSnapshot};
