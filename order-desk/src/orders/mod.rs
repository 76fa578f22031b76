//! 订单模块 - 活跃订单同步与生命周期
//!
//! - [`differ`] - 活跃订单快照对比
//! - [`reconciler`] - 轮询同步器
//! - [`service`] - 状态流转与级联删除

pub mod differ;
pub mod reconciler;
pub mod service;

pub use differ::{DiffResult, SnapshotDiffer, diff};
pub use reconciler::{PollingReconciler, ReconcilerConfig, ReconcilerListener, TickOutcome};
pub use service::OrderService;
