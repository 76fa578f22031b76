use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use shared::error::{AppError, AppResult};
use shared::models::RestaurantSettings;

use crate::notify::NotificationPermission;
use crate::utils::time::parse_timezone;

/// 终端配置 - 订单台的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_PATH | orders.db | SQLite 数据库文件 |
/// | LIVE_POLL_INTERVAL_MS | 3000 | 订单看板轮询间隔(毫秒) |
/// | DASHBOARD_POLL_INTERVAL_MS | 30000 | 仪表盘轮询间隔(毫秒) |
/// | TIMEZONE | America/Sao_Paulo | 业务时区 (IANA) |
/// | SETTINGS_PATH | - | 餐厅设置 JSON 文件 |
/// | NOTIFICATION_PERMISSION | granted | 无界面终端的通知权限 (default/granted/denied) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// DATABASE_PATH=/data/orders.db LIVE_POLL_INTERVAL_MS=5000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 数据库路径
    pub database_path: String,
    /// 订单看板轮询间隔 (毫秒)
    pub live_poll_interval_ms: u64,
    /// 仪表盘轮询间隔 (毫秒)
    pub dashboard_poll_interval_ms: u64,
    /// 业务时区
    pub timezone: Tz,
    /// 餐厅设置文件 (可选)
    pub settings_path: Option<String>,
    /// 无界面终端的通知权限，由运维在部署时给定
    pub notification_permission: NotificationPermission,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key/value 来源加载配置 (测试用)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "orders.db".into()),
            live_poll_interval_ms: parse_or(&lookup, "LIVE_POLL_INTERVAL_MS", 3000),
            dashboard_poll_interval_ms: parse_or(&lookup, "DASHBOARD_POLL_INTERVAL_MS", 30000),
            timezone: lookup("TIMEZONE")
                .map(|name| parse_timezone(&name))
                .unwrap_or(chrono_tz::America::Sao_Paulo),
            settings_path: lookup("SETTINGS_PATH").filter(|p| !p.trim().is_empty()),
            notification_permission: parse_or(
                &lookup,
                "NOTIFICATION_PERMISSION",
                NotificationPermission::Granted,
            ),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: lookup("LOG_DIR").filter(|p| !p.trim().is_empty()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".into()),
        }
    }

    pub fn live_poll_interval(&self) -> Duration {
        Duration::from_millis(self.live_poll_interval_ms.max(1))
    }

    pub fn dashboard_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dashboard_poll_interval_ms.max(1))
    }

    /// 读取餐厅设置；未配置 SETTINGS_PATH 时返回默认值
    pub fn load_settings(&self) -> AppResult<RestaurantSettings> {
        let Some(path) = &self.settings_path else {
            return Ok(RestaurantSettings::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read settings '{}': {}", path, e)))?;
        RestaurantSettings::from_json(&text)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value '{}' for {}, falling back to {}", raw, key, default);
            default
        }),
    }
}
