//! Remote optimal-tilt estimates (PVGIS) behind a distance/age reuse cache.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::angles;
use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::error::FetchError;
use crate::geo::haversine_km;
use crate::store::{KeyValueStore, RemoteCacheEntry};
use crate::types::{GeoPoint, PvOutput};

const SLOPE_POINTER: &str = "/inputs/mounting_system/fixed/slope/value";
const MONTHLY_POINTER: &str = "/outputs/monthly/fixed";

/// Authoritative estimate provider. Returns the raw response body.
#[async_trait]
pub trait EstimateProvider: Send + Sync {
    async fn fetch(&self, location: GeoPoint) -> Result<String, FetchError>;
}

/// HTTP client for the PVGIS `PVcalc` service.
pub struct PvgisProvider {
    client: reqwest::Client,
    config: CacheConfig,
}

impl PvgisProvider {
    pub fn new(config: CacheConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn query(&self, location: GeoPoint) -> [(&'static str, String); 6] {
        [
            ("lat", location.latitude().to_string()),
            ("lon", location.longitude().to_string()),
            ("peakpower", self.config.peak_power_kw.to_string()),
            ("loss", self.config.system_loss_percent.to_string()),
            ("optimalinclination", "1".to_string()),
            ("outputformat", "json".to_string()),
        ]
    }
}

#[async_trait]
impl EstimateProvider for PvgisProvider {
    async fn fetch(&self, location: GeoPoint) -> Result<String, FetchError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(self.config.read_timeout)
            } else {
                FetchError::Transport(e.to_string())
            }
        };
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&self.query(location))
            .send()
            .await
            .map_err(map_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }
        response.text().await.map_err(map_err)
    }
}

/// The fields this crate needs from a PVGIS response.
#[derive(Debug, Clone, PartialEq)]
pub struct PvgisEstimate {
    /// Optimal fixed inclination, degrees
    pub optimal_slope: f64,
    /// Monthly energy for a 1 kWp reference system, kWh
    pub monthly_energy: [f64; 12],
}

impl PvgisEstimate {
    pub fn from_body(body: &str) -> Result<Self, FetchError> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, FetchError> {
        let optimal_slope = value
            .pointer(SLOPE_POINTER)
            .and_then(Value::as_f64)
            .ok_or(FetchError::MissingField("inputs.mounting_system.fixed.slope.value"))?;
        let months = value
            .pointer(MONTHLY_POINTER)
            .and_then(Value::as_array)
            .ok_or(FetchError::MissingField("outputs.monthly.fixed"))?;
        if months.len() < 12 {
            return Err(FetchError::MissingField("outputs.monthly.fixed"));
        }
        let mut monthly_energy = [0.0; 12];
        for (slot, month) in monthly_energy.iter_mut().zip(months) {
            *slot = month
                .get("E_m")
                .and_then(Value::as_f64)
                .ok_or(FetchError::MissingField("outputs.monthly.fixed[].E_m"))?;
        }
        Ok(Self {
            optimal_slope,
            monthly_energy,
        })
    }

    /// Scales the 1 kWp reference series to a system of `system_watts`.
    pub fn scaled_output(&self, system_watts: f64) -> PvOutput {
        let factor = system_watts / 1000.0;
        let monthly_breakdown: Vec<f64> = self.monthly_energy.iter().map(|e| e * factor).collect();
        let yearly: f64 = monthly_breakdown.iter().sum();
        PvOutput {
            daily: yearly / 365.0,
            monthly: yearly / 12.0,
            yearly,
            monthly_breakdown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReuseReason {
    Nearby,
    Recent,
}

/// How a cache answer was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freshness {
    /// Fetched for this query
    Fetched,
    /// Stored entry still valid for this query (nearby or recent)
    Reused,
    /// Stored entry outside its validity, returned because the fetch failed
    Fallback,
}

/// Optimal angle together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteTilt {
    pub angle: f64,
    pub fetched_at: DateTime<Utc>,
    pub freshness: Freshness,
}

/// Reconciles the persisted estimate with fresh fetches.
///
/// The cached entry is reused without a network call when it lies within
/// `reuse_radius_km` of the query OR is younger than `max_age`. Otherwise one
/// fetch is attempted; on any failure the existing entry is returned
/// regardless of staleness. Concurrent calls are not deduplicated.
pub struct RemoteEstimateCache {
    provider: Arc<dyn EstimateProvider>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl RemoteEstimateCache {
    pub fn new(
        provider: Arc<dyn EstimateProvider>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            provider,
            store,
            clock,
            config,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Last persisted entry, without any reuse decision or fetch.
    pub fn cached(&self) -> Option<RemoteCacheEntry> {
        RemoteCacheEntry::load(self.store.as_ref())
    }

    pub async fn get_optimal_tilt(&self, location: GeoPoint) -> Option<f64> {
        self.optimal_tilt_with_freshness(location).await.map(|t| t.angle)
    }

    /// Like [`Self::get_optimal_tilt`], but says whether the angle is fresh,
    /// reused, or a stale fallback.
    pub async fn optimal_tilt_with_freshness(&self, location: GeoPoint) -> Option<RemoteTilt> {
        let (entry, freshness) = self.lookup(location).await?;
        let angle = entry.angle.or_else(|| {
            PvgisEstimate::from_body(&entry.payload)
                .ok()
                .map(|e| e.optimal_slope)
        })?;
        Some(RemoteTilt {
            angle,
            fetched_at: entry.fetched_at,
            freshness,
        })
    }

    pub async fn get_full_estimate(&self, location: GeoPoint) -> Option<Value> {
        let (entry, _) = self.lookup(location).await?;
        match serde_json::from_str(&entry.payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "cached payload is not valid JSON");
                None
            }
        }
    }

    pub async fn get_estimate(&self, location: GeoPoint) -> Option<PvgisEstimate> {
        let (entry, _) = self.lookup(location).await?;
        PvgisEstimate::from_body(&entry.payload).ok()
    }

    /// System output from the remote series, or the local latitude model
    /// when no remote estimate can be had.
    pub async fn estimate_output(
        &self,
        location: GeoPoint,
        panel_watts: u32,
        panel_count: u32,
        efficiency: f64,
    ) -> PvOutput {
        match self.get_estimate(location).await {
            Some(estimate) => estimate.scaled_output(panel_watts as f64 * panel_count as f64),
            None => angles::estimate_pv_output(location.latitude(), panel_watts, panel_count, efficiency),
        }
    }

    fn reuse_reason(&self, entry: &RemoteCacheEntry, location: &GeoPoint) -> Option<ReuseReason> {
        let nearby = entry
            .location
            .map(|cached| haversine_km(location, &cached) <= self.config.reuse_radius_km)
            .unwrap_or(false);
        if nearby {
            return Some(ReuseReason::Nearby);
        }
        let age = self.clock.now().signed_duration_since(entry.fetched_at);
        let recent = age
            .to_std()
            .map(|age| age < self.config.max_age)
            // fetched_at in the future counts as recent
            .unwrap_or(true);
        recent.then_some(ReuseReason::Recent)
    }

    async fn lookup(&self, location: GeoPoint) -> Option<(RemoteCacheEntry, Freshness)> {
        let cached = self.cached();
        if let Some(entry) = cached.as_ref() {
            if let Some(reason) = self.reuse_reason(entry, &location) {
                debug!(?reason, fetched_at = %entry.fetched_at, "reusing cached estimate");
                return cached.map(|e| (e, Freshness::Reused));
            }
        }

        match self.fetch_and_store(location).await {
            Ok(entry) => Some((entry, Freshness::Fetched)),
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    has_fallback = cached.is_some(),
                    "remote estimate fetch failed"
                );
                cached.map(|e| (e, Freshness::Fallback))
            }
        }
    }

    async fn fetch_and_store(&self, location: GeoPoint) -> Result<RemoteCacheEntry, FetchError> {
        let body = self.provider.fetch(location).await?;
        let estimate = PvgisEstimate::from_body(&body)?;
        let entry = RemoteCacheEntry {
            angle: Some(estimate.optimal_slope),
            location: Some(location),
            fetched_at: self.clock.now(),
            payload: body,
        };

        // a slower request must not clobber a newer write
        let newer_exists = self
            .cached()
            .is_some_and(|current| current.fetched_at > entry.fetched_at);
        if newer_exists {
            debug!("newer cache entry already stored, keeping it");
        } else {
            entry.save(self.store.as_ref());
            info!(
                lat = location.latitude(),
                lon = location.longitude(),
                angle = estimate.optimal_slope,
                "stored fresh remote estimate"
            );
        }
        Ok(entry)
    }
}
