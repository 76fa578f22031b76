//! 时间工具函数 - 时钟与业务时区转换
//!
//! 仪表盘日期 → 时间戳的转换统一在这里完成，
//! store 层只接收 `i64` Unix millis。

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Offset, TimeDelta, Utc};
use chrono_tz::Tz;

use super::{AppError, AppResult};

// ============================================================================
// Clock
// ============================================================================

/// Source of "now", injectable for tests
pub trait Clock: Send + Sync {
    /// Current time as Unix millis
    fn now_millis(&self) -> i64;

    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_millis()).unwrap_or_default()
    }

    /// Current time in the business timezone
    fn now_in(&self, tz: Tz) -> DateTime<Tz> {
        self.now_utc().with_timezone(&tz)
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock
#[derive(Debug, Default)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn at(at: DateTime<Utc>) -> Self {
        Self::new(at.timestamp_millis())
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.millis.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Date helpers
// ============================================================================

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::invalid_range(format!("Invalid date format: {}", date)))
}

/// 解析时区名称，失败返回 UTC
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|e| {
        tracing::warn!("Failed to parse timezone '{}': {}, falling back to UTC", name, e);
        Tz::UTC
    })
}

/// 日期 + 时分秒毫秒 → Unix millis (业务时区)
fn date_hms_milli_to_millis(date: NaiveDate, h: u32, m: u32, s: u32, ms: u32, tz: Tz) -> i64 {
    let naive = date
        .and_hms_milli_opt(h, m, s, ms)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
    local_to_millis(naive, tz)
}

/// 本地时间 → Unix millis
///
/// 本地时间落在夏令时跳跃区间内 (如 America/Santiago 的午夜跳到 01:00) 时，
/// 按跳跃前的偏移换算，得到跳跃后的第一个有效时刻。
fn local_to_millis(naive: NaiveDateTime, tz: Tz) -> i64 {
    if let Some(dt) = naive.and_local_timezone(tz).earliest() {
        return dt.timestamp_millis();
    }
    let offset_before = (naive - TimeDelta::days(1))
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.offset().fix().local_minus_utc())
        .unwrap_or(0);
    naive.and_utc().timestamp_millis() - i64::from(offset_before) * 1000
}

/// 日期开始 (00:00:00.000) → Unix millis (业务时区)
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    date_hms_milli_to_millis(date, 0, 0, 0, 0, tz)
}

/// 日期结束 (23:59:59.999) → Unix millis (业务时区)
///
/// 含端点，调用方使用 `<= end` 语义。
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    match date.succ_opt() {
        Some(next) => day_start_millis(next, tz) - 1,
        None => date_hms_milli_to_millis(date, 23, 59, 59, 999, tz),
    }
}

/// Unix millis → 业务时区的日历日期
pub fn local_date(millis: i64, tz: Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(&tz).date_naive())
}
