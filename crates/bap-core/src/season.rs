use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{BapError, Result};

/// Days per month in the leap (366-day) frame.
const LEAP_MONTH_DAYS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Non-leap year used to compute reference ordinals.
const REFERENCE_YEAR: i32 = 2001;

/// Leap year used to compute leap-frame ordinals.
const LEAP_REFERENCE_YEAR: i32 = 2000;

/// Days in the reference (non-leap) calendar.
const REFERENCE_YEAR_DAYS: i64 = 365;

pub fn is_leap(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Ordinal day of `date` within its own year (1..=366).
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

/// A month-day pair (`MM-DD`), valid in at least one calendar year.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeasonDate {
    month: u32,
    day: u32,
}

impl SeasonDate {
    pub fn new(month: u32, day: u32) -> Result<Self> {
        let text = format!("{month:02}-{day:02}");
        if !(1..=12).contains(&month) {
            return Err(BapError::InvalidSeasonDate {
                date: text,
                reason: "month must be between 1 and 12".into(),
            });
        }
        let max_day = LEAP_MONTH_DAYS[(month - 1) as usize];
        if day < 1 || day > max_day {
            return Err(BapError::InvalidSeasonDate {
                date: text,
                reason: format!("in month {month} the day must be between 1 and {max_day}"),
            });
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_feb29(&self) -> bool {
        self.month == 2 && self.day == 29
    }

    /// Ordinal in the leap (366-day) frame, so `03-01` is always 61.
    pub fn day_of_year(&self) -> u32 {
        self.date_in(LEAP_REFERENCE_YEAR).map(|d| d.ordinal()).unwrap_or(0)
    }

    /// Ordinal in the 365-day reference calendar; Feb 29 shares Feb 28's slot.
    pub fn reference_ordinal(&self) -> u32 {
        let day = if self.is_feb29() { 28 } else { self.day };
        NaiveDate::from_ymd_opt(REFERENCE_YEAR, self.month, day)
            .map(|d| d.ordinal())
            .unwrap_or(0)
    }

    fn date_in(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }

    /// This month-day in `year`. Feb 29 in a non-leap year is an error.
    pub fn in_year(&self, year: i32) -> Result<NaiveDate> {
        self.date_in(year).ok_or_else(|| BapError::InvalidSeasonDate {
            date: self.to_string(),
            reason: format!("year {year} is not a leap year, it has no February 29"),
        })
    }

    /// Like [`in_year`](Self::in_year) but Feb 29 falls back to Feb 28 in
    /// non-leap years.
    pub fn in_year_adjusted(&self, year: i32) -> Result<NaiveDate> {
        if self.is_feb29() && !is_leap(year) {
            return SeasonDate { month: 2, day: 28 }.in_year(year);
        }
        self.in_year(year)
    }
}

impl fmt::Display for SeasonDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for SeasonDate {
    type Err = BapError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| BapError::InvalidSeasonDate {
            date: s.to_string(),
            reason: reason.to_string(),
        };
        let (m, d) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| invalid("expected the format MM-DD"))?;
        let month = m.parse::<u32>().map_err(|_| invalid("month is not a number"))?;
        let day = d.parse::<u32>().map_err(|_| invalid("day is not a number"))?;
        Self::new(month, day)
    }
}

impl TryFrom<String> for SeasonDate {
    type Error = BapError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SeasonDate> for String {
    fn from(value: SeasonDate) -> Self {
        value.to_string()
    }
}

/// Inclusive calendar date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Length measured on the 365-day reference calendar: leap days inside
    /// the range are not counted.
    pub fn len_days(&self) -> i64 {
        let raw = (self.end - self.start).num_days();
        let leap_days = (self.start.year()..=self.end.year())
            .filter_map(|y| NaiveDate::from_ymd_opt(y, 2, 29))
            .filter(|d| *d > self.start && *d <= self.end)
            .count() as i64;
        raw - leap_days
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[derive(Deserialize)]
struct RawSeason {
    start: SeasonDate,
    end: SeasonDate,
    best_day: SeasonDate,
}

/// A yearly window of interest with a preferred day.
///
/// When `start` is on or after `end` in the year, the window spans the year
/// boundary ("over end") and the part before new year belongs to the next
/// anchor year.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSeason")]
pub struct Season {
    pub start: SeasonDate,
    pub end: SeasonDate,
    pub best_day: SeasonDate,
}

impl TryFrom<RawSeason> for Season {
    type Error = BapError;

    fn try_from(raw: RawSeason) -> Result<Self> {
        Season::new(raw.start, raw.end, raw.best_day)
    }
}

impl Season {
    pub fn new(start: SeasonDate, end: SeasonDate, best_day: SeasonDate) -> Result<Self> {
        let season = Self {
            start,
            end,
            best_day,
        };
        if !season.in_window(best_day) {
            return Err(BapError::InvalidSeasonDate {
                date: best_day.to_string(),
                reason: format!("best day is outside the season {season}"),
            });
        }
        Ok(season)
    }

    /// Parse three `MM-DD` strings.
    pub fn parse(start: &str, end: &str, best_day: &str) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?, best_day.parse()?)
    }

    /// Southern hemisphere growing season, November 15th to March 15th.
    pub fn growing_south() -> Self {
        Self {
            start: SeasonDate { month: 11, day: 15 },
            end: SeasonDate { month: 3, day: 15 },
            best_day: SeasonDate { month: 1, day: 15 },
        }
    }

    /// Northern hemisphere growing season, May 15th to September 15th.
    pub fn growing_north() -> Self {
        Self {
            start: SeasonDate { month: 5, day: 15 },
            end: SeasonDate { month: 9, day: 15 },
            best_day: SeasonDate { month: 7, day: 15 },
        }
    }

    pub fn over_end(&self) -> bool {
        self.start.day_of_year() >= self.end.day_of_year()
    }

    pub fn year_factor(&self) -> i32 {
        i32::from(self.over_end())
    }

    fn in_window(&self, date: SeasonDate) -> bool {
        let d = date.day_of_year();
        let (s, e) = (self.start.day_of_year(), self.end.day_of_year());
        if self.over_end() {
            d >= s || d <= e
        } else {
            d >= s && d <= e
        }
    }

    /// Season length on the 365-day reference calendar.
    pub fn range_in_days(&self) -> i64 {
        let s = i64::from(self.start.reference_ordinal());
        let e = i64::from(self.end.reference_ordinal());
        if self.over_end() {
            REFERENCE_YEAR_DAYS - s + e
        } else {
            e - s
        }
    }

    /// The window anchored to `year`. Over-end seasons start in `year - 1`.
    pub fn add_year(&self, year: i32) -> Result<DateRange> {
        let start_year = year - self.year_factor();
        let start = self.start.in_year_adjusted(start_year)?;
        let end = self.end.in_year_adjusted(year)?;
        Ok(DateRange::new(start, end))
    }

    /// The best day falling inside the window anchored to `year`.
    pub fn best_date(&self, year: i32) -> Result<NaiveDate> {
        let range = self.add_year(year)?;
        let candidate = self.best_day.in_year_adjusted(year)?;
        if range.contains(candidate) {
            Ok(candidate)
        } else {
            self.best_day.in_year_adjusted(year - 1)
        }
    }

    /// Anchor year whose window contains `date`, if any.
    pub fn season_year(&self, date: NaiveDate) -> Option<i32> {
        let year = date.year();
        [year, year + 1].into_iter().find(|&y| {
            self.add_year(y)
                .map(|range| range.contains(date))
                .unwrap_or(false)
        })
    }

    /// Number of seasons between the one containing `date` and the one
    /// anchored to `target_year`.
    ///
    /// Dates outside every window fail unless `tolerant`, in which case the
    /// date's calendar year stands in for its season year.
    pub fn year_diff(&self, date: NaiveDate, target_year: i32, tolerant: bool) -> Result<i32> {
        match self.season_year(date) {
            Some(year) => Ok(target_year - year),
            None if tolerant => Ok(target_year - date.year()),
            None => Err(BapError::DateOutsideSeason {
                date: date.to_string(),
                season: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {} (best {})", self.start, self.end, self.best_day)
    }
}

impl Default for Season {
    fn default() -> Self {
        Self::growing_south()
    }
}
