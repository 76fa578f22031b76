//! 通知模块
//!
//! - [`platform`] - 平台通知边界 (权限 / 弹出)
//! - [`dispatcher`] - 新订单通知分发

pub mod dispatcher;
pub mod platform;

pub use dispatcher::{DispatchOutcome, NotificationDispatcher};
pub use platform::{
    LogNotificationPlatform, Notification, NotificationPermission, NotificationPlatform,
    NotifyError,
};
