//! Data models
//!
//! Shared between the order desk core and the surfaces exposing it.
//! Timestamps are Unix millis; money is `rust_decimal::Decimal`.

pub mod dining_table;
pub mod order;
pub mod restaurant_settings;

// Re-exports
pub use dining_table::*;
pub use order::*;
pub use restaurant_settings::*;
