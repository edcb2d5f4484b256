use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike};

use crate::error::SolarError;
use crate::types::{
    PvOutput, Season, SeasonNote, SeasonalTilts, SolarRadiation, SunPosition,
};

pub const EARTH_AXIAL_TILT: f64 = 23.45;
pub const DEGREES_PER_HOUR: f64 = 15.0;
pub const EQUINOX_REFERENCE_DAY: i32 = 81; // spring equinox
pub const SEASONAL_OFFSET: f64 = 15.0;
pub const PERFORMANCE_RATIO: f64 = 0.85;

pub const MID_MONTH_DAYS: [i32; 12] = [15, 46, 74, 105, 135, 166, 196, 227, 258, 288, 319, 349];

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * (std::f64::consts::PI / 180.0)
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * (180.0 / std::f64::consts::PI)
}

pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Shortest signed difference `to - from`, in (-180, 180].
pub fn signed_angle_difference(from: f64, to: f64) -> f64 {
    let d = normalize_angle(to - from);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

pub fn leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> i32 {
    if leap_year(year) {
        366
    } else {
        365
    }
}

pub fn days_in_months(year: i32) -> [u32; 12] {
    [
        31,
        if leap_year(year) { 29 } else { 28 },
        31, 30, 31, 30, 31, 31, 30, 31, 30, 31,
    ]
}

pub fn day_of_year(year: i32, month: u32, day: u32) -> Result<i32, SolarError> {
    if !(1..=12).contains(&month) {
        return Err(SolarError::InvalidMonth(month));
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.ordinal() as i32)
        .ok_or(SolarError::InvalidDay { month, day })
}

pub fn check_day_of_year(day_of_year: i32) -> Result<i32, SolarError> {
    if (1..=366).contains(&day_of_year) {
        Ok(day_of_year)
    } else {
        Err(SolarError::InvalidDayOfYear(day_of_year))
    }
}

pub fn hour_angle(hour_of_day: f64) -> f64 {
    DEGREES_PER_HOUR * (hour_of_day - 12.0)
}

pub fn solar_declination(day_of_year: i32) -> f64 {
    EARTH_AXIAL_TILT
        * (2.0 * std::f64::consts::PI / 365.0 * (day_of_year - EQUINOX_REFERENCE_DAY) as f64).sin()
}

/// `hour_of_day` is local solar time, so longitude is unused. Azimuth is 0°
/// where it is undefined (sun at the zenith, observer at a pole).
pub fn sun_position(latitude: f64, _longitude: f64, day_of_year: i32, hour_of_day: f64) -> SunPosition {
    let lat_rad = deg_to_rad(latitude);
    let dec_rad = deg_to_rad(solar_declination(day_of_year));
    let ha = hour_angle(hour_of_day);
    let ha_rad = deg_to_rad(ha);

    let sin_alt = (lat_rad.sin() * dec_rad.sin() + lat_rad.cos() * dec_rad.cos() * ha_rad.cos())
        .clamp(-1.0, 1.0);
    let alt_rad = sin_alt.asin();
    let altitude = rad_to_deg(alt_rad).clamp(-90.0, 90.0);

    let denom = lat_rad.cos() * alt_rad.cos();
    if denom.abs() < 1e-9 {
        return SunPosition {
            altitude,
            azimuth: 0.0,
        };
    }
    let cos_az = ((dec_rad.sin() - lat_rad.sin() * sin_alt) / denom).clamp(-1.0, 1.0);
    let mut azimuth = rad_to_deg(cos_az.acos());
    if ha > 0.0 {
        azimuth = 360.0 - azimuth;
    }

    SunPosition {
        altitude,
        azimuth: normalize_angle(azimuth),
    }
}

pub fn sun_position_at<Tz: TimeZone>(latitude: f64, longitude: f64, dt: &DateTime<Tz>) -> SunPosition {
    let n = dt.ordinal() as i32;
    let hour = dt.hour() as f64 + dt.minute() as f64 / 60.0 + dt.second() as f64 / 3600.0;
    sun_position(latitude, longitude, n, hour)
}

pub fn optimal_tilt(latitude: f64, day_of_year: i32) -> f64 {
    (latitude - solar_declination(day_of_year)).abs().clamp(0.0, 90.0)
}

pub fn try_optimal_tilt(latitude: f64, day_of_year: i32) -> Result<f64, SolarError> {
    check_day_of_year(day_of_year).map(|n| optimal_tilt(latitude, n))
}

pub fn try_sun_position(
    latitude: f64,
    longitude: f64,
    day_of_year: i32,
    hour_of_day: f64,
) -> Result<SunPosition, SolarError> {
    check_day_of_year(day_of_year).map(|n| sun_position(latitude, longitude, n, hour_of_day))
}

pub fn monthly_optimal_tilt(latitude: f64, month: u32) -> Result<f64, SolarError> {
    let idx = month
        .checked_sub(1)
        .filter(|i| *i < 12)
        .ok_or(SolarError::InvalidMonth(month))?;
    Ok(optimal_tilt(latitude, MID_MONTH_DAYS[idx as usize]))
}

pub fn year_round_tilt(latitude: f64) -> f64 {
    latitude.abs().clamp(0.0, 90.0)
}

pub fn seasonal_tilt(latitude: f64, season: Season) -> f64 {
    match season {
        Season::Summer => latitude.abs() - SEASONAL_OFFSET,
        Season::Winter => latitude.abs() + SEASONAL_OFFSET,
        Season::Spring | Season::Fall => latitude.abs(),
    }
}

pub fn seasonal_tilts(latitude: f64) -> SeasonalTilts {
    SeasonalTilts {
        summer: seasonal_tilt(latitude, Season::Summer),
        spring_fall: seasonal_tilt(latitude, Season::Spring),
        winter: seasonal_tilt(latitude, Season::Winter),
        year_round: latitude.abs(),
    }
}

pub fn season_note(latitude: f64, month: u32) -> SeasonNote {
    let june_to_aug = matches!(month, 6..=8);
    let dec_to_feb = matches!(month, 12 | 1 | 2);
    if latitude > 0.0 && june_to_aug || latitude < 0.0 && dec_to_feb {
        SeasonNote::LowerSummerTilt
    } else if latitude > 0.0 && dec_to_feb || latitude < 0.0 && june_to_aug {
        SeasonNote::HigherWinterTilt
    } else {
        SeasonNote::Transition
    }
}

pub fn estimate_radiation(latitude: f64) -> SolarRadiation {
    let abs_lat = latitude.abs();
    let daily = if abs_lat < 25.0 {
        6.5
    } else if abs_lat < 35.0 {
        5.5
    } else if abs_lat < 45.0 {
        4.5
    } else if abs_lat < 55.0 {
        3.5
    } else {
        2.5
    };
    SolarRadiation {
        daily,
        monthly: daily * 30.0,
        yearly: daily * 365.0,
    }
}

pub fn estimate_pv_output(latitude: f64, panel_watts: u32, panel_count: u32, efficiency: f64) -> PvOutput {
    let radiation = estimate_radiation(latitude);
    let system_kw = (panel_watts as f64 * panel_count as f64) / 1000.0;
    let daily = system_kw * radiation.daily * efficiency * PERFORMANCE_RATIO;
    PvOutput {
        daily,
        monthly: daily * 30.0,
        yearly: daily * 365.0,
        monthly_breakdown: Vec::new(),
    }
}
