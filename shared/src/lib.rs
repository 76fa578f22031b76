//! Shared types for the order desk
//!
//! Plain data models and the unified error type, used by the coordination
//! core and by whatever surface (HTTP, desktop, CLI) exposes it.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};
