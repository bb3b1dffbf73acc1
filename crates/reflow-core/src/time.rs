//! Local (zone-less) date/time values and the five-minute search grid.
//!
//! The reflow core never touches `DateTime<Utc>` or a timezone: all of its
//! reasoning happens over wall-clock values with no zone attached. Converting
//! to and from UTC is strictly the façade's job (see [`crate::timezone`]).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minutes are stored as non-negative integers everywhere in the core.
pub type Minutes = i64;

/// Width of the search grid used by flexible domain enumeration and chain
/// derivation. Stored values are minute-precision; search happens on this grid.
pub const SEARCH_GRID_MINUTES: Minutes = 5;

/// Default waking window applied to flexible instances with no explicit
/// `timeWindow`: instances must *end* within `[07:00, 23:00)`.
pub const DEFAULT_WAKING_WINDOW: (LocalTimeConst, LocalTimeConst) = (
    LocalTimeConst(7, 0, 0),
    LocalTimeConst(23, 0, 0),
);

/// A `const`-constructible time-of-day, used only to define compile-time
/// defaults; converted to [`LocalTime`] at the call site.
#[derive(Debug, Clone, Copy)]
pub struct LocalTimeConst(pub u32, pub u32, pub u32);

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid local date/time value: {0}")]
pub struct ParseLocalError(String);

/// `YYYY-MM-DD`, no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct LocalDate(NaiveDate);

impl LocalDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, ParseLocalError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(LocalDate)
            .ok_or_else(|| ParseLocalError(format!("{year:04}-{month:02}-{day:02}")))
    }

    pub fn inner(&self) -> NaiveDate {
        self.0
    }

    /// Wraps an already-computed `NaiveDate`, used by the timezone boundary
    /// (A4) to rebuild a `LocalDate` after converting out of a `DateTime<Tz>`.
    pub fn from_naive(date: NaiveDate) -> Self {
        LocalDate(date)
    }

    pub fn succ(&self) -> LocalDate {
        LocalDate(self.0.succ_opt().expect("date arithmetic in supported range"))
    }

    pub fn pred(&self) -> LocalDate {
        LocalDate(self.0.pred_opt().expect("date arithmetic in supported range"))
    }

    pub fn add_days(&self, days: i64) -> LocalDate {
        LocalDate(self.0 + ChronoDuration::days(days))
    }

    /// 0=Sun..6=Sat, matching the specification's weekly `daysOfWeek` convention.
    pub fn day_of_week_sun0(&self) -> u8 {
        self.0.weekday().num_days_from_sunday() as u8
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn at(&self, time: LocalTime) -> LocalDateTime {
        LocalDateTime(NaiveDateTime::new(self.0, time.0))
    }

    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for LocalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for LocalDate {
    type Err = ParseLocalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(LocalDate)
            .map_err(|_| ParseLocalError(s.to_string()))
    }
}

/// `HH:MM:SS`, no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct LocalTime(NaiveTime);

impl LocalTime {
    pub fn new(hour: u32, minute: u32, second: u32) -> Result<Self, ParseLocalError> {
        NaiveTime::from_hms_opt(hour, minute, second)
            .map(LocalTime)
            .ok_or_else(|| ParseLocalError(format!("{hour:02}:{minute:02}:{second:02}")))
    }

    pub fn from_const(c: LocalTimeConst) -> Self {
        LocalTime::new(c.0, c.1, c.2).expect("DEFAULT_WAKING_WINDOW constants are valid")
    }

    pub fn inner(&self) -> NaiveTime {
        self.0
    }

    /// Wraps an already-computed `NaiveTime`; see [`LocalDate::from_naive`].
    pub fn from_naive(time: NaiveTime) -> Self {
        LocalTime(time)
    }

    pub fn minutes_since_midnight(&self) -> Minutes {
        (self.0.hour() as Minutes) * 60 + self.0.minute() as Minutes
    }

    pub fn to_canonical_string(&self) -> String {
        self.0.format("%H:%M:%S").to_string()
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for LocalTime {
    type Err = ParseLocalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map_err(|_| ParseLocalError(s.to_string()))?;
        Ok(LocalTime(parsed))
    }
}

/// `YYYY-MM-DDTHH:MM:SS`, no zone. Lexicographic comparison on the canonical
/// string form is equivalent to chronological order, so `LocalDateTime`
/// derives its ordering directly from the wrapped `NaiveDateTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct LocalDateTime(NaiveDateTime);

impl LocalDateTime {
    pub fn new(date: LocalDate, time: LocalTime) -> Self {
        LocalDateTime(NaiveDateTime::new(date.0, time.0))
    }

    pub fn inner(&self) -> NaiveDateTime {
        self.0
    }

    /// Wraps an already-computed `NaiveDateTime`; see [`LocalDate::from_naive`].
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        LocalDateTime(dt)
    }

    pub fn date(&self) -> LocalDate {
        LocalDate(self.0.date())
    }

    pub fn time(&self) -> LocalTime {
        LocalTime(self.0.time())
    }

    pub fn add_minutes(&self, minutes: Minutes) -> LocalDateTime {
        LocalDateTime(self.0 + ChronoDuration::minutes(minutes))
    }

    /// Signed difference in minutes: `self - other`.
    pub fn diff_minutes(&self, other: &LocalDateTime) -> Minutes {
        (self.0 - other.0).num_minutes()
    }

    /// Rounds down to the nearest point on the five-minute search grid.
    pub fn floor_to_grid(&self) -> LocalDateTime {
        let minutes_since_midnight = self.0.time().hour() as i64 * 60 + self.0.time().minute() as i64;
        let floored = (minutes_since_midnight / SEARCH_GRID_MINUTES) * SEARCH_GRID_MINUTES;
        let delta = floored - minutes_since_midnight;
        LocalDateTime(self.0 + ChronoDuration::minutes(delta) - ChronoDuration::seconds(self.0.time().second() as i64))
    }

    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

impl fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for LocalDateTime {
    type Err = ParseLocalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(LocalDateTime)
            .map_err(|_| ParseLocalError(s.to_string()))
    }
}

/// A half-open interval `[start, start+duration)` used for overlap tests
/// throughout domain computation, propagation, and the fallback phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: LocalDateTime,
    pub duration: Minutes,
}

impl Interval {
    pub fn new(start: LocalDateTime, duration: Minutes) -> Self {
        Self { start, duration }
    }

    pub fn end(&self) -> LocalDateTime {
        self.start.add_minutes(self.duration)
    }

    /// Equal endpoints count as non-overlap (`[9,10)` and `[10,11)` do not overlap).
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Enumerates every point on the five-minute grid in `[start, end]`
/// (inclusive of both endpoints, per the domain-computation contract).
pub fn grid_points_inclusive(start: LocalDateTime, end: LocalDateTime) -> Vec<LocalDateTime> {
    if start > end {
        return Vec::new();
    }
    let mut points = Vec::new();
    let mut cur = start.floor_to_grid();
    if cur < start {
        cur = cur.add_minutes(SEARCH_GRID_MINUTES);
    }
    while cur <= end {
        points.push(cur);
        cur = cur.add_minutes(SEARCH_GRID_MINUTES);
    }
    points
}
