//! Restaurant Settings Model
//!
//! Owned by the admin layer; the order desk only reads it.

use chrono::Weekday;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AppError, AppResult};
use crate::util::{format_hhmm, parse_hhmm};

/// Restaurant settings (singleton)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantSettings {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    /// Default delivery fee offered at checkout
    #[serde(default)]
    pub delivery_fee: Decimal,
    /// Currency symbol used in notifications and receipts
    #[serde(default = "default_currency")]
    pub currency_symbol: String,
    /// Weekly opening hours. `None` means not configured (treated as open).
    #[serde(default, alias = "openingHours")]
    pub opening_hours: Option<WeeklySchedule>,
}

fn default_currency() -> String {
    "R$".to_string()
}

impl Default for RestaurantSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: None,
            address: None,
            logo_url: None,
            delivery_fee: Decimal::ZERO,
            currency_symbol: default_currency(),
            opening_hours: None,
        }
    }
}

impl RestaurantSettings {
    /// Parse settings from JSON text
    pub fn from_json(text: &str) -> AppResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| AppError::invalid_schedule(format!("Invalid restaurant settings: {}", e)))
    }
}

/// One day of the weekly schedule
///
/// Times are minutes since midnight (0..=1439). Serialized as "HH:MM".
/// `close_time < open_time` means the window crosses midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(alias = "isOpen")]
    pub is_open: bool,
    #[serde(alias = "openTime", with = "hhmm")]
    pub open_time: u16,
    #[serde(alias = "closeTime", with = "hhmm")]
    pub close_time: u16,
}

impl DaySchedule {
    /// Create an open day, validating both times
    pub fn open(open_time: u16, close_time: u16) -> AppResult<Self> {
        for t in [open_time, close_time] {
            if t > 1439 {
                return Err(AppError::invalid_schedule(format!(
                    "time must be within 0..=1439 minutes, got {}",
                    t
                )));
            }
        }
        Ok(Self {
            is_open: true,
            open_time,
            close_time,
        })
    }

    pub fn closed() -> Self {
        Self {
            is_open: false,
            open_time: 0,
            close_time: 0,
        }
    }

    /// Window crosses midnight (e.g. 22:00 → 02:00)
    pub fn crosses_midnight(&self) -> bool {
        self.close_time < self.open_time
    }
}

/// Weekly opening hours, one optional entry per weekday
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DaySchedule>,
}

impl WeeklySchedule {
    /// Same schedule every day of the week
    pub fn every_day(day: DaySchedule) -> Self {
        let mut schedule = Self::default();
        for wd in ALL_WEEKDAYS {
            schedule.set(wd, day);
        }
        schedule
    }

    pub fn day(&self, weekday: Weekday) -> Option<&DaySchedule> {
        match weekday {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    pub fn set(&mut self, weekday: Weekday, day: DaySchedule) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = Some(day);
    }

    pub fn with_day(mut self, weekday: Weekday, day: DaySchedule) -> Self {
        self.set(weekday, day);
        self
    }

    /// No weekday configured at all
    pub fn is_empty(&self) -> bool {
        ALL_WEEKDAYS.iter().all(|wd| self.day(*wd).is_none())
    }
}

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// serde helpers for "HH:MM" ↔ minutes since midnight
mod hhmm {
    use super::*;

    pub fn serialize<S: Serializer>(minutes: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hhmm(*minutes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_hhmm(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }
}
