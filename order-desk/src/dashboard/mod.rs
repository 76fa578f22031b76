//! 仪表盘模块 - 营业额与订单统计
//!
//! - [`range`] - 时间范围解析 (today / 7days / 30days / custom)
//! - [`aggregator`] - 纯函数统计
//! - [`service`] - 从 store 拉取并统计
//! - [`watcher`] - 定时刷新

pub mod aggregator;
pub mod range;
pub mod service;
pub mod watcher;

pub use aggregator::{DailyRevenue, DashboardAggregator, DashboardStats, TodayStats, TopProduct};
pub use range::{DateRange, TimeRange};
pub use service::DashboardService;
pub use watcher::{DashboardListener, DashboardWatcher};
