use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GeoError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Rejects coordinates outside the physical range. Inputs are never
    /// clamped since they key the remote cache.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn is_northern(&self) -> bool {
        self.latitude >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Summer,
    Winter,
    Spring,
    Fall,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    pub altitude: f64,
    pub azimuth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalTilts {
    pub summer: f64,
    pub spring_fall: f64,
    pub winter: f64,
    pub year_round: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeasonNote {
    LowerSummerTilt,
    HigherWinterTilt,
    Transition,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyTilt {
    pub month: u32,
    pub angle: f64,
    pub note: SeasonNote,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyTilt {
    pub day_of_year: i32,
    pub month: u32,
    pub day: u32,
    pub angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarRadiation {
    pub daily: f64,
    pub monthly: f64,
    pub yearly: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PvOutput {
    pub daily: f64,
    pub monthly: f64,
    pub yearly: f64,
    /// Per-month breakdown, only present for remote estimates
    pub monthly_breakdown: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleMode {
    #[default]
    Fixed,
    Daily,
    NextThirtyDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSource {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltTarget {
    angle: f64,
    pub source: TargetSource,
    pub mode: AngleMode,
    pub computed_at: DateTime<Utc>,
    pub valid_for: GeoPoint,
}

impl TiltTarget {
    pub fn new(
        angle: f64,
        source: TargetSource,
        mode: AngleMode,
        computed_at: DateTime<Utc>,
        valid_for: GeoPoint,
    ) -> Self {
        Self {
            angle: angle.clamp(0.0, 90.0),
            source,
            mode,
            computed_at,
            valid_for,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Compass bearing the device should face: 0° north of the equator,
    /// 180° south of it.
    pub fn azimuth(&self) -> f64 {
        if self.valid_for.is_northern() {
            0.0
        } else {
            180.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorKind {
    Accelerometer,
    Magnetometer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    pub kind: SensorKind,
    pub values: [f64; 3],
    // monotonic, arbitrary origin
    pub timestamp: Duration,
}

impl OrientationSample {
    pub fn accelerometer(values: [f64; 3], timestamp: Duration) -> Self {
        Self {
            kind: SensorKind::Accelerometer,
            values,
            timestamp,
        }
    }

    pub fn magnetometer(values: [f64; 3], timestamp: Duration) -> Self {
        Self {
            kind: SensorKind::Magnetometer,
            values,
            timestamp,
        }
    }
}

/// Smoothed device orientation in degrees; azimuth in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationReading {
    pub pitch: f64,
    pub roll: f64,
    pub azimuth: f64,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignmentState {
    Searching,
    NearTarget,
    OnTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TiltHint {
    LiftUp,
    TiltDown,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackCadence {
    Continuous,
    Fast,
    Slow,
    Silent,
}

impl FeedbackCadence {
    pub fn pulse(&self) -> Option<Duration> {
        match self {
            FeedbackCadence::Continuous => Some(Duration::from_millis(150)),
            FeedbackCadence::Fast | FeedbackCadence::Slow => Some(Duration::from_millis(80)),
            FeedbackCadence::Silent => None,
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            FeedbackCadence::Continuous => Duration::from_millis(150),
            FeedbackCadence::Fast => Duration::from_millis(300),
            FeedbackCadence::Slow => Duration::from_millis(600),
            FeedbackCadence::Silent => Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceUpdate {
    pub state: AlignmentState,
    pub target: TiltTarget,
    pub panel_tilt: f64,
    pub tilt_discrepancy: f64,
    pub azimuth_discrepancy: f64,
    pub combined_error: f64,
    pub is_vertical: bool,
    pub hint: TiltHint,
    /// Bubble-level offsets in [-1, 1]: (azimuth, tilt)
    pub bubble: (f64, f64),
    pub cadence: FeedbackCadence,
}
