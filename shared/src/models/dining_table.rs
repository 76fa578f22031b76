//! Dining Table Model

use serde::{Deserialize, Serialize};

use super::order::COUNTER_TABLE;

/// Dining table entity (桌台), read-only for the order desk
///
/// Table 0 is reserved for counter sales (balcão).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: String,
    pub table_number: i32,
    pub capacity: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl DiningTable {
    /// Display label used on order boards and notifications
    pub fn label(table_number: i32) -> String {
        if table_number == COUNTER_TABLE {
            "Counter".to_string()
        } else {
            format!("Table {}", table_number)
        }
    }
}
