//! Period granularity: annual, seasonal or monthly model rows.

use crate::core::calendar::SimDate;
use std::fmt;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Number of separately calibrated periods per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// One model for the whole year.
    #[default]
    Annual,
    /// One model per meteorological season.
    Seasonal,
    /// One model per calendar month.
    Monthly,
}

impl Granularity {
    /// Number of parameter rows (1, 4 or 12).
    pub fn period_count(&self) -> usize {
        match self {
            Granularity::Annual => 1,
            Granularity::Seasonal => 4,
            Granularity::Monthly => 12,
        }
    }

    /// Inverse of [`period_count`](Self::period_count).
    pub fn from_period_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Granularity::Annual),
            4 => Some(Granularity::Seasonal),
            12 => Some(Granularity::Monthly),
            _ => None,
        }
    }

    /// Period a date belongs to.
    pub fn period_of(&self, date: SimDate) -> Period {
        match self {
            Granularity::Annual => Period::Annual,
            Granularity::Seasonal => Period::Seasonal(Season::of_month(date.month())),
            Granularity::Monthly => Period::Monthly(date.month() as u8),
        }
    }

    /// All periods in row order.
    pub fn periods(&self) -> Vec<Period> {
        match self {
            Granularity::Annual => vec![Period::Annual],
            Granularity::Seasonal => Season::ALL.iter().map(|&s| Period::Seasonal(s)).collect(),
            Granularity::Monthly => (1..=12).map(Period::Monthly).collect(),
        }
    }
}

/// Meteorological seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    /// December, January, February.
    Winter,
    /// March, April, May.
    Spring,
    /// June, July, August.
    Summer,
    /// September, October, November.
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    /// Fixed month-to-season table.
    pub fn of_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    fn index(&self) -> usize {
        match self {
            Season::Winter => 0,
            Season::Spring => 1,
            Season::Summer => 2,
            Season::Autumn => 3,
        }
    }
}

/// A single calibration period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Annual,
    Seasonal(Season),
    /// Month number, 1-based.
    Monthly(u8),
}

impl Period {
    /// Row index within its granularity.
    pub fn index(&self) -> usize {
        match self {
            Period::Annual => 0,
            Period::Seasonal(season) => season.index(),
            Period::Monthly(month) => *month as usize - 1,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Annual => write!(f, "Annual"),
            Period::Seasonal(season) => write!(f, "{season:?}"),
            Period::Monthly(month) => write!(f, "{}", MONTH_NAMES[*month as usize - 1]),
        }
    }
}
