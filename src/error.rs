//! Error types for the alignment engine

use std::time::Duration;

/// Rejected geographic input.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("latitude {0} outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} outside [-180, 180]")]
    InvalidLongitude(f64),
}

/// Rejected calendar input to the solar model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SolarError {
    #[error("month {0} outside 1..=12")]
    InvalidMonth(u32),

    #[error("day {day} does not exist in month {month}")]
    InvalidDay { month: u32, day: u32 },

    #[error("day of year {0} outside 1..=366")]
    InvalidDayOfYear(i32),
}

/// Failure of a single remote estimate lookup.
///
/// Every variant is recovered inside the cache; callers of
/// [`crate::RemoteEstimateCache`] never see one.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connect or read exceeded the configured limit
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx status
    #[error("unexpected HTTP status {0}")]
    Http(u16),

    /// Connection level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Body was not valid JSON
    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Body parsed but an expected field is absent or mistyped
    #[error("missing field in response: {0}")]
    MissingField(&'static str),
}

impl FetchError {
    /// Network-side failures, as opposed to a bad payload
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::Http(_) | FetchError::Transport(_)
        )
    }
}

/// The device cannot drive orientation guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("required motion sensors unavailable (accelerometer: {accelerometer}, magnetometer: {magnetometer})")]
    Unavailable {
        accelerometer: bool,
        magnetometer: bool,
    },
}

/// Any error surfaced by this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Solar(#[from] SolarError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
