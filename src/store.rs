//! Durable key-value storage owned by the host, and the records this crate
//! keeps in it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::warn;

use crate::types::{AngleMode, GeoPoint};

/// String key-value store provided by the host (preferences, disk, ...).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

pub const KEY_USE_GPS: &str = "use_gps";
pub const KEY_MANUAL_LATITUDE: &str = "manual_latitude";
pub const KEY_MANUAL_LONGITUDE: &str = "manual_longitude";
pub const KEY_ANGLE_MODE: &str = "angle_mode";

pub const KEY_CACHE_FETCHED_AT: &str = "pvgis_last_fetch_time";
pub const KEY_CACHE_LOCATION: &str = "pvgis_last_location";
pub const KEY_CACHE_ANGLE: &str = "pvgis_optimal_angle";
pub const KEY_CACHE_PAYLOAD: &str = "pvgis_monthly_data";

fn parse_or<T: std::str::FromStr>(store: &dyn KeyValueStore, key: &str, default: T) -> T {
    match store.get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, raw = %raw, "unparsable setting, using default");
            default
        }),
        None => default,
    }
}

/// User settings the engine reads from the host store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceSettings {
    /// Use the device location source rather than the manual coordinates
    pub use_gps: bool,
    pub manual_latitude: f64,
    pub manual_longitude: f64,
    pub angle_mode: AngleMode,
}

impl Default for GuidanceSettings {
    fn default() -> Self {
        Self {
            use_gps: true,
            manual_latitude: 0.0,
            manual_longitude: 0.0,
            angle_mode: AngleMode::Fixed,
        }
    }
}

impl GuidanceSettings {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        let angle_mode = store
            .get(KEY_ANGLE_MODE)
            .and_then(|raw| serde_json::from_value(serde_json::Value::String(raw)).ok())
            .unwrap_or(defaults.angle_mode);
        Self {
            use_gps: parse_or(store, KEY_USE_GPS, defaults.use_gps),
            manual_latitude: parse_or(store, KEY_MANUAL_LATITUDE, defaults.manual_latitude),
            manual_longitude: parse_or(store, KEY_MANUAL_LONGITUDE, defaults.manual_longitude),
            angle_mode,
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        store.set(KEY_USE_GPS, self.use_gps.to_string());
        store.set(KEY_MANUAL_LATITUDE, self.manual_latitude.to_string());
        store.set(KEY_MANUAL_LONGITUDE, self.manual_longitude.to_string());
        if let Ok(serde_json::Value::String(mode)) = serde_json::to_value(self.angle_mode) {
            store.set(KEY_ANGLE_MODE, mode);
        }
    }
}

/// Last successful remote estimate.
///
/// Only a successful fetch writes one. Stale entries stay in the store and
/// remain usable as a fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCacheEntry {
    pub angle: Option<f64>,
    /// `None` when the stored location record is unreadable
    pub location: Option<GeoPoint>,
    pub fetched_at: DateTime<Utc>,
    /// Raw JSON response body
    pub payload: String,
}

impl RemoteCacheEntry {
    /// Reads the entry back; absent when no payload was ever stored.
    pub fn load(store: &dyn KeyValueStore) -> Option<Self> {
        let payload = store.get(KEY_CACHE_PAYLOAD)?;
        let fetched_at = store
            .get(KEY_CACHE_FETCHED_AT)
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(DateTime::UNIX_EPOCH);
        let location = store.get(KEY_CACHE_LOCATION).and_then(|raw| parse_location(&raw));
        let angle = store.get(KEY_CACHE_ANGLE).and_then(|raw| raw.parse().ok());
        Some(Self {
            angle,
            location,
            fetched_at,
            payload,
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        store.set(KEY_CACHE_PAYLOAD, self.payload.clone());
        store.set(KEY_CACHE_FETCHED_AT, self.fetched_at.timestamp_millis().to_string());
        match self.location {
            Some(loc) => store.set(
                KEY_CACHE_LOCATION,
                format!("{},{}", loc.latitude(), loc.longitude()),
            ),
            None => store.remove(KEY_CACHE_LOCATION),
        }
        match self.angle {
            Some(angle) => store.set(KEY_CACHE_ANGLE, angle.to_string()),
            None => store.remove(KEY_CACHE_ANGLE),
        }
    }
}

fn parse_location(raw: &str) -> Option<GeoPoint> {
    let (lat, lon) = raw.split_once(',')?;
    GeoPoint::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?).ok()
}
