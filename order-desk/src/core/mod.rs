//! 核心模块 - 配置与轮询运行时
//!
//! - [`Config`] - 终端配置
//! - [`poll_loop`] - 订单看板与仪表盘共用的轮询循环

pub mod config;
pub mod poll_loop;

pub use config::Config;
pub use poll_loop::{PollHandle, PollJob, RefreshTrigger, spawn_poll_loop};
