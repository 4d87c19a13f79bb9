//! Error types shared across the firmware

use display_interface::DisplayError;
use thiserror::Error;

/// A single attempt to read the status API failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("status request failed: {0}")]
    Transport(String),
    #[error("status API returned HTTP {0}")]
    Status(u16),
    #[error("status body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("status body is missing `dog_feed_status`")]
    MissingStatus,
    #[error("not enough memory for a {0} byte response body")]
    ResourceExhausted(usize),
}

/// Failure reported by the e-ink panel
#[derive(Debug, Error)]
pub enum PanelError {
    /// The panel is still busy with the previous refresh
    #[error("refresh issued too soon, panel is still busy")]
    TooSoon,
    #[error("panel stayed busy for more than {0} ms")]
    BusyTimeout(u32),
    #[error("display bus error: {0:?}")]
    Bus(DisplayError),
}

impl From<DisplayError> for PanelError {
    fn from(err: DisplayError) -> Self {
        PanelError::Bus(err)
    }
}

/// Invalid configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "active windows must satisfy 0 <= {morning_start} < {morning_end} <= {evening_start} < {evening_end} <= 24"
    )]
    Windows {
        morning_start: u8,
        morning_end: u8,
        evening_start: u8,
        evening_end: u8,
    },
    #[error("minimum refresh interval of {0} s is below the 5 s the panel tolerates")]
    RefreshInterval(u64),
    #[error("UTC offset {0} h is outside -12..=14")]
    UtcOffset(i32),
    #[error("{name} could not be parsed from `{value}`")]
    Invalid { name: &'static str, value: String },
}

/// Faults the main loop treats differently from the rest
#[derive(Debug, Error)]
pub enum FeederError {
    /// Allocation failure class; the loop cleans up and retries in place
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}
