use chrono::TimeZone;
use chrono_tz::America::Chicago;

use solar_alignment::angles::*;
use solar_alignment::error::SolarError;
use solar_alignment::types::{Season, SeasonNote};

macro_rules! assert_approx {
    ($left:expr, $right:expr, $tol:expr) => {
        let (l, r) = ($left as f64, $right as f64);
        assert!(
            (l - r).abs() <= $tol,
            "assert_approx failed: left={}, right={}, diff={}, tol={}",
            l, r, (l - r).abs(), $tol
        );
    };
}

// ── DayOfYear ──

#[test]
fn test_day_of_year_known_dates() {
    assert_eq!(day_of_year(2026, 1, 1), Ok(1));
    assert_eq!(day_of_year(2026, 3, 22), Ok(81));
    assert_eq!(day_of_year(2026, 12, 31), Ok(365));
}

#[test]
fn test_day_of_year_leap_year() {
    assert_eq!(day_of_year(2024, 2, 29), Ok(60));
    assert_eq!(day_of_year(2024, 12, 31), Ok(366));
}

#[test]
fn test_day_of_year_rejects_bad_dates() {
    assert_eq!(day_of_year(2026, 0, 1), Err(SolarError::InvalidMonth(0)));
    assert_eq!(day_of_year(2026, 13, 1), Err(SolarError::InvalidMonth(13)));
    assert_eq!(day_of_year(2026, 2, 29), Err(SolarError::InvalidDay { month: 2, day: 29 }));
    assert_eq!(day_of_year(2026, 4, 0), Err(SolarError::InvalidDay { month: 4, day: 0 }));
}

#[test]
fn test_day_of_year_range_checked() {
    assert_eq!(check_day_of_year(1), Ok(1));
    assert_eq!(check_day_of_year(366), Ok(366));
    assert_eq!(check_day_of_year(0), Err(SolarError::InvalidDayOfYear(0)));
    assert_eq!(check_day_of_year(367), Err(SolarError::InvalidDayOfYear(367)));
    assert_eq!(try_optimal_tilt(40.0, 0), Err(SolarError::InvalidDayOfYear(0)));
    assert_eq!(try_optimal_tilt(40.0, 367), Err(SolarError::InvalidDayOfYear(367)));
    assert_eq!(try_optimal_tilt(40.0, 81), Ok(optimal_tilt(40.0, 81)));
    assert!(try_sun_position(40.0, 0.0, -5, 12.0).is_err());
    assert_eq!(
        try_sun_position(40.0, 0.0, 172, 12.0),
        Ok(sun_position(40.0, 0.0, 172, 12.0))
    );
}

#[test]
fn test_leap_year_century_rules() {
    assert!(leap_year(2024));
    assert!(leap_year(2000));
    assert!(!leap_year(1900));
    assert!(!leap_year(2023));
    assert_eq!(days_in_year(2024), 366);
    assert_eq!(days_in_year(2100), 365);
}

// ── NormalizeAngle ──

#[test]
fn test_normalize_angle_basic() {
    let cases: &[(f64, f64)] = &[
        (0.0, 0.0),
        (360.0, 0.0),
        (361.0, 1.0),
        (-1.0, 359.0),
        (-90.0, 270.0),
        (720.0, 0.0),
        (-450.0, 270.0),
    ];
    for &(input, expected) in cases {
        assert_approx!(normalize_angle(input), expected, 1e-9);
    }
}

#[test]
fn test_normalize_angle_never_returns_360() {
    let a = normalize_angle(-1e-20);
    assert!((0.0..360.0).contains(&a), "a={}", a);
}

#[test]
fn test_signed_angle_difference_shortest_way() {
    assert_approx!(signed_angle_difference(350.0, 10.0), 20.0, 1e-9);
    assert_approx!(signed_angle_difference(10.0, 350.0), -20.0, 1e-9);
    assert_approx!(signed_angle_difference(90.0, 90.0), 0.0, 1e-9);
}

#[test]
fn test_signed_angle_difference_half_turn_is_positive() {
    assert_approx!(signed_angle_difference(0.0, 180.0), 180.0, 1e-9);
    assert_approx!(signed_angle_difference(180.0, 0.0), 180.0, 1e-9);
}

// ── Declination ──

#[test]
fn test_declination_reference_days() {
    assert_approx!(solar_declination(EQUINOX_REFERENCE_DAY), 0.0, 1e-9);
    assert_approx!(solar_declination(172), 23.45, 0.01);
    assert_approx!(solar_declination(355), -23.45, 0.01);
    assert_approx!(solar_declination(264), 0.0, 0.5);
}

#[test]
fn test_declination_bounded_all_days() {
    for n in 1..=366 {
        let decl = solar_declination(n);
        assert!((-EARTH_AXIAL_TILT..=EARTH_AXIAL_TILT).contains(&decl), "Day {}: {}", n, decl);
    }
}

// ── HourAngle ──

#[test]
fn test_hour_angle_known_values() {
    assert_approx!(hour_angle(12.0), 0.0, 1e-9);
    assert_approx!(hour_angle(13.0), 15.0, 1e-9);
    assert_approx!(hour_angle(9.0), -45.0, 1e-9);
}

// ── SunPosition ──

#[test]
fn test_equator_sun_overhead_at_equinox_noon() {
    let pos = sun_position(0.0, 0.0, 81, 12.0);
    assert_approx!(pos.altitude, 90.0, 1e-6);
    // azimuth undefined at the zenith, reported as 0
    assert_eq!(pos.azimuth, 0.0);
    assert!(!pos.azimuth.is_nan());
}

#[test]
fn test_springfield_equinox_noon() {
    let pos = sun_position(39.8, -89.6, 81, 12.0);
    assert_approx!(pos.altitude, 50.2, 0.01);
    assert_approx!(pos.azimuth, 180.0, 0.5);
}

#[test]
fn test_morning_afternoon_fold() {
    let am = sun_position(39.8, -89.6, 81, 9.0);
    let pm = sun_position(39.8, -89.6, 81, 15.0);
    assert_approx!(am.altitude, pm.altitude, 1e-9);
    assert!(am.azimuth > 90.0 && am.azimuth < 180.0, "am={}", am.azimuth);
    assert!(pm.azimuth > 180.0 && pm.azimuth < 270.0, "pm={}", pm.azimuth);
    assert_approx!(am.azimuth + pm.azimuth, 360.0, 1e-6);
}

#[test]
fn test_midnight_below_horizon() {
    let pos = sun_position(39.8, -89.6, 81, 0.0);
    assert!(pos.altitude < 0.0);
}

#[test]
fn test_pole_reports_sentinel_azimuth() {
    let pos = sun_position(90.0, 0.0, 172, 12.0);
    assert_approx!(pos.altitude, 23.45, 0.01);
    assert_eq!(pos.azimuth, 0.0);
}

#[test]
fn test_sun_position_ranges() {
    for &lat in &[-89.0, -45.0, 0.0, 23.0, 51.5, 89.0] {
        for n in (1..=365).step_by(30) {
            for h in 0..24 {
                let pos = sun_position(lat, 0.0, n, h as f64 + 0.5);
                assert!((-90.0..=90.0).contains(&pos.altitude));
                assert!((0.0..360.0).contains(&pos.azimuth), "azimuth={}", pos.azimuth);
            }
        }
    }
}

#[test]
fn test_southern_hemisphere_reversed_seasons() {
    let june = sun_position(-33.9, 151.2, 172, 12.0);
    let december = sun_position(-33.9, 151.2, 355, 12.0);
    assert!(june.altitude < december.altitude);
}

#[test]
fn test_sun_position_at_uses_local_clock() {
    let dt = Chicago.with_ymd_and_hms(2026, 3, 22, 12, 0, 0).unwrap();
    let pos = sun_position_at(39.8, -89.6, &dt);
    assert_eq!(pos, sun_position(39.8, -89.6, 81, 12.0));
}

// ── OptimalTilt ──

#[test]
fn test_optimal_tilt_equinox() {
    assert_approx!(optimal_tilt(40.0, 81), 40.0, 1e-9);
}

#[test]
fn test_optimal_tilt_bounded() {
    let mut lat = -90.0;
    while lat <= 90.0 {
        for n in 1..=366 {
            let t = optimal_tilt(lat, n);
            assert!((0.0..=90.0).contains(&t), "lat={} n={} tilt={}", lat, n, t);
        }
        lat += 7.5;
    }
}

#[test]
fn test_optimal_tilt_clamps_to_ninety() {
    // |-90 - 23.45| would exceed 90
    assert_eq!(optimal_tilt(-90.0, 172), 90.0);
}

#[test]
fn test_optimal_tilt_is_pure() {
    assert_eq!(optimal_tilt(51.5, 200), optimal_tilt(51.5, 200));
}

#[test]
fn test_optimal_tilt_not_symmetric_in_latitude() {
    assert!((optimal_tilt(40.0, 172) - optimal_tilt(-40.0, 172)).abs() > 1.0);
}

#[test]
fn test_summer_lower_than_winter_north() {
    assert!(optimal_tilt(45.0, 172) < optimal_tilt(45.0, 355));
}

// ── Monthly ──

#[test]
fn test_monthly_optimal_tilt_uses_mid_month_table() {
    assert_approx!(monthly_optimal_tilt(40.0, 3).unwrap(), 42.819, 0.01);
    assert_eq!(monthly_optimal_tilt(40.0, 6).unwrap(), optimal_tilt(40.0, 166));
}

#[test]
fn test_monthly_optimal_tilt_rejects_bad_month() {
    assert_eq!(monthly_optimal_tilt(40.0, 0), Err(SolarError::InvalidMonth(0)));
    assert_eq!(monthly_optimal_tilt(40.0, 13), Err(SolarError::InvalidMonth(13)));
}

#[test]
fn test_season_notes() {
    assert_eq!(season_note(40.0, 7), SeasonNote::LowerSummerTilt);
    assert_eq!(season_note(40.0, 1), SeasonNote::HigherWinterTilt);
    assert_eq!(season_note(-33.9, 7), SeasonNote::HigherWinterTilt);
    assert_eq!(season_note(-33.9, 12), SeasonNote::LowerSummerTilt);
    assert_eq!(season_note(40.0, 4), SeasonNote::Transition);
    assert_eq!(season_note(0.0, 7), SeasonNote::Transition);
}

// ── Seasonal ──

#[test]
fn test_seasonal_tilts_basic() {
    let t = seasonal_tilts(40.0);
    assert_approx!(t.summer, 25.0, 1e-9);
    assert_approx!(t.spring_fall, 40.0, 1e-9);
    assert_approx!(t.winter, 55.0, 1e-9);
    assert_approx!(t.year_round, 40.0, 1e-9);
}

#[test]
fn test_seasonal_tilts_unclamped_near_equator() {
    let t = seasonal_tilts(5.0);
    assert_approx!(t.summer, -10.0, 1e-9);
    assert_approx!(seasonal_tilts(85.0).winter, 100.0, 1e-9);
}

#[test]
fn test_seasonal_tilt_southern_uses_abs() {
    assert_eq!(seasonal_tilts(-40.0), seasonal_tilts(40.0));
    assert_approx!(seasonal_tilt(-40.0, Season::Winter), 55.0, 1e-9);
    assert_eq!(seasonal_tilt(40.0, Season::Fall), seasonal_tilt(40.0, Season::Spring));
}

#[test]
fn test_year_round_tilt() {
    assert_eq!(year_round_tilt(-33.9), 33.9);
    assert_eq!(year_round_tilt(0.0), 0.0);
}

// ── Radiation / output ──

#[test]
fn test_radiation_bands() {
    assert_eq!(estimate_radiation(10.0).daily, 6.5);
    assert_eq!(estimate_radiation(-30.0).daily, 5.5);
    assert_eq!(estimate_radiation(40.0).daily, 4.5);
    assert_eq!(estimate_radiation(50.0).daily, 3.5);
    assert_eq!(estimate_radiation(60.0).daily, 2.5);
    let r = estimate_radiation(40.0);
    assert_approx!(r.monthly, 135.0, 1e-9);
    assert_approx!(r.yearly, 1642.5, 1e-9);
}

#[test]
fn test_pv_output_local_estimate() {
    let out = estimate_pv_output(40.0, 400, 10, 0.2);
    assert_approx!(out.daily, 3.06, 1e-9);
    assert_approx!(out.monthly, 91.8, 1e-9);
    assert_approx!(out.yearly, 1116.9, 1e-9);
    assert!(out.monthly_breakdown.is_empty());
}

// ── DegRad ──

#[test]
fn test_deg_rad_roundtrip() {
    for &deg in &[0.0, 45.0, 90.0, 180.0, -45.0, 123.456] {
        assert_approx!(rad_to_deg(deg_to_rad(deg)), deg, 1e-10);
    }
}
