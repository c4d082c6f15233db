//! Core data structures: calendars, periods, settings and aligned series.

mod calendar;
mod cancel;
mod period;
mod series;
mod settings;

pub use calendar::{Calendar, SimDate};
pub use cancel::CancellationToken;
pub use period::{Granularity, Period, Season};
pub use series::AlignedSeries;
pub use settings::{OccurrenceMode, SeedMode, Settings};
