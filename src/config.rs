//! Tunables for the cache, estimator and guidance engine.
//!
//! Every struct deserializes with `#[serde(default)]`, so a host only needs
//! to supply the fields it overrides.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

pub const PVGIS_ENDPOINT: &str = "https://re.jrc.ec.europa.eu/api/v5_2/PVcalc";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cached estimates within this distance are reused
    pub reuse_radius_km: f64,
    /// Cached estimates younger than this are reused
    #[serde(with = "secs")]
    pub max_age: Duration,
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    #[serde(with = "secs")]
    pub read_timeout: Duration,
    pub endpoint: String,
    pub peak_power_kw: f64,
    pub system_loss_percent: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reuse_radius_km: 5.0,
            max_age: Duration::from_secs(24 * 60 * 60),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            endpoint: PVGIS_ENDPOINT.to_string(),
            peak_power_kw: 1.0,
            system_loss_percent: 14.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Minimum spacing between emitted readings
    #[serde(with = "millis")]
    pub emit_interval: Duration,
    /// Low-pass weight of the newest angles, in (0, 1]; 1 disables smoothing
    pub smoothing: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            emit_interval: Duration::from_millis(300),
            smoothing: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    pub on_target_deg: f64,
    pub fast_band_deg: f64,
    pub near_band_deg: f64,
    /// Max |roll| for the device to stand in for the panel plane
    pub vertical_roll_deg: f64,
    /// Tilt discrepancy beyond which a lift/lower hint is shown
    pub hint_deg: f64,
    /// Discrepancy mapped to a full bubble-level deflection
    pub bubble_full_scale_deg: f64,
    pub window_days: u32,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            on_target_deg: 5.0,
            fast_band_deg: 6.0,
            near_band_deg: 20.0,
            vertical_roll_deg: 5.0,
            hint_deg: 2.0,
            bubble_full_scale_deg: 45.0,
            window_days: 30,
        }
    }
}

/// All tunables together, as a host would load them.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub estimator: EstimatorConfig,
    pub guidance: GuidanceConfig,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
