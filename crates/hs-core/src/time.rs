//! Virtual time model.
//!
//! # Design
//!
//! Simulation time is a real-valued count of minutes since the run began.
//! Wake-ups are ordered by `SimTime` and there is no fixed tick: the
//! scheduler jumps straight from one wake-up to the next.  `SimCalendar`
//! maps a `SimTime` onto a calendar instant so demand factors can depend on
//! hour of day, weekday, month and special dates:
//!
//!   instant = start + minutes

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

use crate::{HsError, HsResult};

pub const MINUTES_PER_HOUR: f64 = 60.0;
pub const MINUTES_PER_DAY: f64 = 1_440.0;

// ── SimTime ───────────────────────────────────────────────────────────────────

/// An absolute simulation instant, in minutes.
///
/// Ordering uses `f64::total_cmp`, so `SimTime` is `Ord` and can key a heap.
/// Constructors never produce NaN in practice; the scheduler rejects
/// non-finite durations before they reach the queue.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(pub f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);

    #[inline]
    pub fn minutes(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn from_days(days: f64) -> SimTime {
        SimTime(days * MINUTES_PER_DAY)
    }

    /// Whole days elapsed since the start of the run.
    #[inline]
    pub fn days(self) -> f64 {
        self.0 / MINUTES_PER_DAY
    }

    /// The instant `minutes` after `self`.
    #[inline]
    pub fn after(self, minutes: f64) -> SimTime {
        SimTime(self.0 + minutes)
    }

    /// Minutes elapsed from `earlier` to `self`.
    #[inline]
    pub fn since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.max(0.0);
        let days = (total / MINUTES_PER_DAY).floor();
        let rem = total - days * MINUTES_PER_DAY;
        let hours = (rem / MINUTES_PER_HOUR).floor();
        let mins = rem - hours * MINUTES_PER_HOUR;
        write!(f, "t={:.2} (day {} {:02}:{:05.2})", self.0, days as u64, hours as u32, mins)
    }
}

// ── SimCalendar ───────────────────────────────────────────────────────────────

/// Maps simulation minutes onto calendar instants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimCalendar {
    pub start: NaiveDateTime,
}

impl SimCalendar {
    pub fn new(start: NaiveDateTime) -> Self {
        Self { start }
    }

    /// Calendar instant for `t`.  Saturates at `start` if the offset cannot be
    /// represented.
    pub fn instant(&self, t: SimTime) -> NaiveDateTime {
        TimeDelta::try_milliseconds((t.0 * 60_000.0) as i64)
            .and_then(|d| self.start.checked_add_signed(d))
            .unwrap_or(self.start)
    }

    /// Hour of day, 0..=23.
    pub fn hour(&self, t: SimTime) -> usize {
        self.instant(t).hour() as usize
    }

    /// Day of week counted from the start of the run: day 0 is Monday = 0,
    /// whatever weekday `start` falls on.
    pub fn weekday(&self, t: SimTime) -> usize {
        ((t.0 / MINUTES_PER_DAY).floor() as i64).rem_euclid(7) as usize
    }

    /// Month, 1..=12.
    pub fn month(&self, t: SimTime) -> u32 {
        self.instant(t).month()
    }

    /// `(month, day_of_month)` for special-date lookups.
    pub fn month_day(&self, t: SimTime) -> (u32, u32) {
        let at = self.instant(t);
        (at.month(), at.day())
    }
}

impl Default for SimCalendar {
    fn default() -> Self {
        Self::new(default_start())
    }
}

fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level simulation configuration.
///
/// Usually deserialized from the driver's JSON run file; every field has a
/// default so a partial file is enough.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Calendar instant of `SimTime::ZERO`.
    pub start: NaiveDateTime,

    /// Fleet size.  Fixed for the lifetime of a simulation identity.
    pub num_doctors: usize,

    /// Base arrival rate, patients per hour, before any factor is applied.
    pub arrival_rate: f64,

    /// Master RNG seed.
    pub seed: u64,

    /// Minutes between hospital-state samples.  0 disables sampling.
    pub state_interval_minutes: f64,

    /// Minutes between periodic checkpoints.  0 disables them; a final
    /// checkpoint is still written on shutdown.
    pub checkpoint_interval_minutes: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start:                       default_start(),
            num_doctors:                 30,
            arrival_rate:                20.0,
            seed:                        42,
            state_interval_minutes:      1.0,
            checkpoint_interval_minutes: 60.0,
        }
    }
}

impl SimConfig {
    pub fn calendar(&self) -> SimCalendar {
        SimCalendar::new(self.start)
    }

    /// Reject configurations no run could make progress with.
    pub fn validate(&self) -> HsResult<()> {
        if self.num_doctors == 0 {
            return Err(HsError::Config("num_doctors must be at least 1".into()));
        }
        if !self.arrival_rate.is_finite() || self.arrival_rate <= 0.0 {
            return Err(HsError::Config(format!(
                "arrival_rate must be positive and finite, got {}",
                self.arrival_rate
            )));
        }
        for (name, v) in [
            ("state_interval_minutes", self.state_interval_minutes),
            ("checkpoint_interval_minutes", self.checkpoint_interval_minutes),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(HsError::Config(format!("{name} must be finite and >= 0, got {v}")));
            }
        }
        Ok(())
    }
}
