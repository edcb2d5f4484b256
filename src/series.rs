use chrono::{Datelike, NaiveDate};

use crate::angles;
use crate::types::{DailyTilt, MonthlyTilt};

pub fn doy_to_month_day(year: i32, doy: i32) -> (u32, u32) {
    let mut remaining = doy;
    for (month_idx, &dim) in angles::days_in_months(year).iter().enumerate() {
        if remaining <= dim as i32 {
            return (month_idx as u32 + 1, remaining as u32);
        }
        remaining -= dim as i32;
    }
    (12, 31)
}

/// Optimal tilt for every day of `year`, in order.
///
/// The iterator is lazy and can be recreated at will; 366 entries in leap
/// years, 365 otherwise.
pub fn daily_series(latitude: f64, year: i32) -> DailySeries {
    DailySeries {
        latitude,
        year,
        next_day: 1,
        last_day: angles::days_in_year(year),
    }
}

#[derive(Debug, Clone)]
pub struct DailySeries {
    latitude: f64,
    year: i32,
    next_day: i32,
    last_day: i32,
}

impl Iterator for DailySeries {
    type Item = DailyTilt;

    fn next(&mut self) -> Option<DailyTilt> {
        if self.next_day > self.last_day {
            return None;
        }
        let doy = self.next_day;
        self.next_day += 1;
        let (month, day) = doy_to_month_day(self.year, doy);
        Some(DailyTilt {
            day_of_year: doy,
            month,
            day,
            angle: angles::optimal_tilt(self.latitude, doy),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.last_day - self.next_day + 1).max(0) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for DailySeries {}

/// Mid-month optimal tilt for all twelve months with a season note.
pub fn monthly_series(latitude: f64) -> [MonthlyTilt; 12] {
    std::array::from_fn(|i| {
        let month = i as u32 + 1;
        MonthlyTilt {
            month,
            angle: angles::optimal_tilt(latitude, angles::MID_MONTH_DAYS[i]),
            note: angles::season_note(latitude, month),
        }
    })
}

/// Mean optimal tilt over `days` consecutive calendar days from `start`.
///
/// Walks real dates so the window crosses New Year correctly. Returns the
/// start day's tilt when `days` is zero.
pub fn window_average_tilt(latitude: f64, start: NaiveDate, days: u32) -> f64 {
    if days == 0 {
        return angles::optimal_tilt(latitude, start.ordinal() as i32);
    }
    let sum: f64 = start
        .iter_days()
        .take(days as usize)
        .map(|d| angles::optimal_tilt(latitude, d.ordinal() as i32))
        .sum();
    sum / days as f64
}
