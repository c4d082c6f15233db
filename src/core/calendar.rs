//! Calendar conventions and day arithmetic.
//!
//! Climate model output frequently uses idealised calendars, so dates are
//! represented by a plain `SimDate` interpreted under one of three
//! conventions rather than by `chrono` types directly.

use crate::error::{DownscaleError, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;

const NOLEAP_MONTH_DAYS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Calendar convention shared by every series in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Calendar {
    /// Proleptic Gregorian calendar with leap days (366 code).
    #[default]
    Gregorian,
    /// 365-day calendar without leap days.
    NoLeap,
    /// Twelve 30-day months.
    Days360,
}

impl Calendar {
    /// Year-length code written to parameter and manifest files.
    pub fn year_length(&self) -> u32 {
        match self {
            Calendar::Gregorian => 366,
            Calendar::NoLeap => 365,
            Calendar::Days360 => 360,
        }
    }

    /// Parse a year-length code.
    pub fn from_year_length(code: u32) -> Option<Self> {
        match code {
            366 => Some(Calendar::Gregorian),
            365 => Some(Calendar::NoLeap),
            360 => Some(Calendar::Days360),
            _ => None,
        }
    }

    /// Number of days in `month` of `year`.
    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match self {
            Calendar::Days360 => 30,
            Calendar::NoLeap => NOLEAP_MONTH_DAYS[(month as usize - 1) % 12] as u32,
            Calendar::Gregorian => {
                if month == 2 && is_leap_year(year) {
                    29
                } else {
                    NOLEAP_MONTH_DAYS[(month as usize - 1) % 12] as u32
                }
            }
        }
    }

    fn days_in_year(&self, year: i32) -> i64 {
        match self {
            Calendar::Days360 => 360,
            Calendar::NoLeap => 365,
            Calendar::Gregorian => {
                if is_leap_year(year) {
                    366
                } else {
                    365
                }
            }
        }
    }

    /// Day number of `date` counted from 1 January of year 0.
    fn ordinal(&self, date: SimDate) -> i64 {
        match self {
            Calendar::Days360 => {
                date.year as i64 * 360 + (date.month as i64 - 1) * 30 + (date.day as i64 - 1)
            }
            Calendar::NoLeap => {
                let before: i64 = NOLEAP_MONTH_DAYS[..(date.month as usize - 1)]
                    .iter()
                    .map(|&d| d as i64)
                    .sum();
                date.year as i64 * 365 + before + (date.day as i64 - 1)
            }
            Calendar::Gregorian => match NaiveDate::from_ymd_opt(date.year, date.month, date.day) {
                Some(d) => d.num_days_from_ce() as i64,
                None => 0,
            },
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// A calendar date, validated against a [`Calendar`] on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimDate {
    year: i32,
    month: u32,
    day: u32,
}

impl SimDate {
    /// Create a date, checking it exists in `calendar`.
    pub fn new(year: i32, month: u32, day: u32, calendar: Calendar) -> Result<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > calendar.days_in_month(year, month) {
            return Err(DownscaleError::Validation(format!(
                "{day:02}/{month:02}/{year:04} does not exist in the {calendar:?} calendar"
            )));
        }
        Ok(Self { year, month, day })
    }

    /// Parse `dd/mm/yyyy`.
    pub fn parse(text: &str, calendar: Calendar) -> Result<Self> {
        let parts: Vec<&str> = text.trim().split('/').collect();
        if parts.len() != 3 {
            return Err(DownscaleError::Validation(format!(
                "date '{}' is not in dd/mm/yyyy form",
                text.trim()
            )));
        }
        let parse = |s: &str| {
            s.trim().parse::<i64>().map_err(|_| {
                DownscaleError::Validation(format!("date '{}' has a non-numeric field", text.trim()))
            })
        };
        let day = parse(parts[0])?;
        let month = parse(parts[1])?;
        let year = parse(parts[2])?;
        if day < 0 || month < 0 {
            return Err(DownscaleError::Validation(format!(
                "date '{}' has a negative field",
                text.trim()
            )));
        }
        Self::new(year as i32, month as u32, day as u32, calendar)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// The following day.
    pub fn succ(&self, calendar: Calendar) -> Self {
        if self.day < calendar.days_in_month(self.year, self.month) {
            Self {
                day: self.day + 1,
                ..*self
            }
        } else if self.month < 12 {
            Self {
                month: self.month + 1,
                day: 1,
                ..*self
            }
        } else {
            Self {
                year: self.year + 1,
                month: 1,
                day: 1,
            }
        }
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_until(&self, other: SimDate, calendar: Calendar) -> i64 {
        calendar.ordinal(other) - calendar.ordinal(*self)
    }

    /// Date `days` days after `self`.
    pub fn add_days(&self, days: usize, calendar: Calendar) -> Self {
        let mut date = *self;
        let mut remaining = days as i64;
        // Skip whole years first; the remainder walks day by day.
        loop {
            let year_len = calendar.days_in_year(date.year + 1).min(calendar.days_in_year(date.year));
            if remaining <= year_len {
                break;
            }
            let next = date.same_day_next_year(calendar);
            let step = date.days_until(next, calendar);
            if step <= 0 || step > remaining {
                break;
            }
            remaining -= step;
            date = next;
        }
        for _ in 0..remaining {
            date = date.succ(calendar);
        }
        date
    }

    fn same_day_next_year(&self, calendar: Calendar) -> Self {
        let year = self.year + 1;
        let day = self.day.min(calendar.days_in_month(year, self.month));
        Self {
            year,
            month: self.month,
            day,
        }
    }
}

impl fmt::Display for SimDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day, self.month, self.year)
    }
}
