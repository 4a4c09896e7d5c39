//! Calendar demand factors.

use hs_core::{SimCalendar, SimTime};

/// Arrival multiplier by hour of day, 00..23.
pub const HOUR_FACTORS: [f64; 24] = [
    0.4, 0.3, 0.2, 0.2, 0.3, 0.4, 0.6, 0.9, 1.3, 1.5, 1.4, 1.3, //
    1.4, 1.3, 1.2, 1.1, 1.2, 1.4, 1.6, 1.5, 1.3, 1.1, 0.8, 0.6,
];

/// Arrival multiplier by weekday, Monday first.
pub const WEEKDAY_FACTORS: [f64; 7] = [1.0, 0.9, 0.9, 1.0, 1.1, 1.4, 1.2];

/// Arrival multiplier by month, January first.
pub const MONTH_FACTORS: [f64; 12] = [1.2, 1.2, 1.1, 1.0, 0.9, 0.8, 0.8, 0.8, 0.9, 1.0, 1.1, 1.2];

/// `((month, day), factor)` for dates with unusual demand.
pub const SPECIAL_DATES: [((u32, u32), f64); 7] = [
    ((12, 31), 1.5),
    ((1, 1), 1.6),
    ((7, 4), 1.4),
    ((10, 31), 1.3),
    ((12, 24), 0.8),
    ((12, 25), 0.7),
    ((11, 26), 1.2),
];

#[inline]
pub fn hour_factor(hour: usize) -> f64 {
    HOUR_FACTORS.get(hour).copied().unwrap_or(1.0)
}

#[inline]
pub fn weekday_factor(weekday: usize) -> f64 {
    WEEKDAY_FACTORS.get(weekday).copied().unwrap_or(1.0)
}

/// `month` is 1-based.
#[inline]
pub fn month_factor(month: u32) -> f64 {
    MONTH_FACTORS.get(month.wrapping_sub(1) as usize).copied().unwrap_or(1.0)
}

pub fn special_date_factor(month: u32, day: u32) -> f64 {
    SPECIAL_DATES
        .iter()
        .find(|(md, _)| *md == (month, day))
        .map_or(1.0, |(_, f)| *f)
}

/// Product of the hour, weekday, month and special-date factors at `t`.
pub fn calendar_factor(calendar: &SimCalendar, t: SimTime) -> f64 {
    let (month, day) = calendar.month_day(t);
    hour_factor(calendar.hour(t))
        * weekday_factor(calendar.weekday(t))
        * month_factor(month)
        * special_date_factor(month, day)
}

// ── Season ────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Meteorological season for a 1-based month.
    pub fn from_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}
