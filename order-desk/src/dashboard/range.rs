//! Dashboard time ranges
//!
//! Resolves "today / 7 days / 30 days / custom" into concrete calendar days
//! in the business timezone. Malformed or reversed ranges are rejected here,
//! before anything touches the store.

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};

use crate::utils::time;

/// Caller-facing range selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Today,
    Last7Days,
    Last30Days,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl TimeRange {
    /// Parse a range kind plus optional `YYYY-MM-DD` bounds (custom only)
    pub fn parse(kind: &str, start: Option<&str>, end: Option<&str>) -> AppResult<Self> {
        match kind.trim() {
            "today" => Ok(TimeRange::Today),
            "7days" => Ok(TimeRange::Last7Days),
            "30days" => Ok(TimeRange::Last30Days),
            "custom" => {
                let (Some(start), Some(end)) = (start, end) else {
                    return Err(AppError::invalid_range(
                        "custom range requires both start and end dates",
                    ));
                };
                Self::custom(time::parse_date(start)?, time::parse_date(end)?)
            }
            other => Err(AppError::invalid_range(format!(
                "Unknown time range '{}', expected today, 7days, 30days or custom",
                other
            ))),
        }
    }

    /// Custom range, rejecting `start > end`
    pub fn custom(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        DateRange::new(start, end)?;
        Ok(TimeRange::Custom { start, end })
    }

    /// Concrete days relative to `today`
    pub fn resolve(&self, today: NaiveDate) -> AppResult<DateRange> {
        match *self {
            TimeRange::Today => DateRange::new(today, today),
            TimeRange::Last7Days => DateRange::new(today - Duration::days(6), today),
            TimeRange::Last30Days => DateRange::new(today - Duration::days(29), today),
            TimeRange::Custom { start, end } => DateRange::new(start, end),
        }
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::invalid_range(format!(
                "Range start {} is after end {}",
                start, end
            ))
            .with_detail("start", start.to_string())
            .with_detail("end", end.to_string()));
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days, always ≥ 1
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day in the range, ascending
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// `[start 00:00:00.000, end 23:59:59.999]` as Unix millis in `tz`
    pub fn bounds_millis(&self, tz: Tz) -> (i64, i64) {
        (
            time::day_start_millis(self.start, tz),
            time::day_end_millis(self.end, tz),
        )
    }
}
