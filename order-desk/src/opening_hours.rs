//! Opening hours
//!
//! "Is the restaurant open now" over a weekly schedule. Fail-open: no
//! schedule at all means open.

use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use chrono_tz::Tz;
use shared::models::{DaySchedule, WeeklySchedule};

use crate::utils::Clock;

/// Pure check of `now` against `schedule`
///
/// - no schedule, or no day configured → open
/// - day missing or `is_open == false` → closed
/// - `close >= open` → open iff `open <= now <= close`
/// - `close < open` (crosses midnight) → open iff `now >= open || now <= close`
pub fn is_open_at<Z: TimeZone>(schedule: Option<&WeeklySchedule>, now: &DateTime<Z>) -> bool {
    let Some(schedule) = schedule.filter(|s| !s.is_empty()) else {
        return true;
    };
    let Some(day) = schedule.day(now.weekday()) else {
        return false;
    };
    let minutes = (now.hour() * 60 + now.minute()) as u16;
    day_contains(day, minutes)
}

fn day_contains(day: &DaySchedule, minutes: u16) -> bool {
    if !day.is_open {
        return false;
    }
    if day.crosses_midnight() {
        minutes >= day.open_time || minutes <= day.close_time
    } else {
        day.open_time <= minutes && minutes <= day.close_time
    }
}

/// Evaluator bound to a schedule, business timezone and clock
#[derive(Clone)]
pub struct OpeningHoursEvaluator {
    schedule: Option<WeeklySchedule>,
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl OpeningHoursEvaluator {
    pub fn new(schedule: Option<WeeklySchedule>, tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            schedule,
            tz,
            clock,
        }
    }

    pub fn is_open_now(&self) -> bool {
        is_open_at(self.schedule.as_ref(), &self.clock.now_in(self.tz))
    }

    pub fn is_open_at(&self, now: &DateTime<Tz>) -> bool {
        is_open_at(self.schedule.as_ref(), now)
    }

    pub fn is_configured(&self) -> bool {
        self.schedule.as_ref().is_some_and(|s| !s.is_empty())
    }
}
