//! 工具模块 - 通用工具函数和类型
//!
//! - [`logger`] - 日志初始化
//! - [`time`] - 时钟与业务时区转换

pub mod logger;
pub mod time;

pub use shared::error::{AppError, AppResult, ErrorCode};
pub use time::{Clock, FixedClock, SystemClock};
