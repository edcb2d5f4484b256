pub mod angles;
pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod guidance;
pub mod location;
pub mod orientation;
pub mod remote;
pub mod series;
pub mod store;
pub mod types;

pub use angles::{
    check_day_of_year, day_of_year, days_in_months, days_in_year, deg_to_rad, estimate_pv_output,
    estimate_radiation, hour_angle, leap_year, monthly_optimal_tilt, normalize_angle,
    optimal_tilt, rad_to_deg, season_note, seasonal_tilt, seasonal_tilts,
    signed_angle_difference, solar_declination, sun_position, sun_position_at, try_optimal_tilt,
    try_sun_position, year_round_tilt, DEGREES_PER_HOUR, EARTH_AXIAL_TILT, EQUINOX_REFERENCE_DAY,
    MID_MONTH_DAYS,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, EngineConfig, EstimatorConfig, GuidanceConfig, PVGIS_ENDPOINT};
pub use error::{Error, FetchError, GeoError, Result, SensorError, SolarError};
pub use geo::{haversine_km, EARTH_RADIUS_KM};

pub use guidance::{
    cadence_for, classify, evaluate, local_target, run_feedback, AlignmentGuidanceEngine,
    FeedbackSink,
};

pub use location::{resolve_location, FixedLocation, LocationSource};
pub use orientation::{OrientationEstimator, SensorCapabilities};
pub use remote::{
    EstimateProvider, Freshness, PvgisEstimate, PvgisProvider, RemoteEstimateCache, RemoteTilt,
};
pub use series::{daily_series, doy_to_month_day, monthly_series, window_average_tilt, DailySeries};
pub use store::{GuidanceSettings, KeyValueStore, MemoryStore, RemoteCacheEntry};

pub use types::{
    AlignmentState, AngleMode, DailyTilt, FeedbackCadence, GeoPoint, GuidanceUpdate, MonthlyTilt,
    OrientationReading, OrientationSample, PvOutput, Season, SeasonNote, SeasonalTilts,
    SensorKind, SolarRadiation, SunPosition, TargetSource, TiltHint, TiltTarget,
};
