//! Order Desk - 餐厅订单台核心
//!
//! # 架构概述
//!
//! 无推送通道的准实时订单同步：各员工终端独立轮询订单库，
//! 对比活跃订单集合，发现新订单时弹出通知。
//!
//! - **订单库** (`store`): SQLite / 内存实现
//! - **订单同步** (`orders`): 快照对比、轮询同步器、状态流转
//! - **通知** (`notify`): 权限门控的新订单通知
//! - **仪表盘** (`dashboard`): 营业额与订单统计
//! - **营业时间** (`opening_hours`): 当前是否营业
//!
//! # 模块结构
//!
//! ```text
//! order-desk/src/
//! ├── core/           # 配置、轮询循环
//! ├── store/          # 订单库
//! ├── orders/         # 快照对比、同步器、订单服务
//! ├── notify/         # 通知平台与分发
//! ├── dashboard/      # 统计
//! ├── opening_hours   # 营业时间
//! └── utils/          # 日志、时间
//! ```

pub mod core;
pub mod dashboard;
pub mod notify;
pub mod opening_hours;
pub mod orders;
pub mod store;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, PollHandle, RefreshTrigger};
pub use dashboard::{DashboardService, DashboardStats, DashboardWatcher, TimeRange};
pub use notify::{NotificationDispatcher, NotificationPermission, NotificationPlatform};
pub use opening_hours::OpeningHoursEvaluator;
pub use orders::{OrderService, PollingReconciler, ReconcilerConfig, ReconcilerListener};
pub use store::{MemoryOrderStore, OrderStore, SqliteOrderStore, StoreError};
pub use utils::{AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 加载 .env、读取配置并初始化日志
pub fn setup_environment() -> Config {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    config
}
