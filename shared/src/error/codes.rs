//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 7xxx: Report / schedule errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values so they serialize as plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Invalid format
    InvalidFormat = 6,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Status change not allowed from the current status
    InvalidStatusTransition = 4002,
    /// Cascade delete stopped after removing part of the order
    PartialDeleteFailure = 4003,
    /// Order has no items
    OrderEmpty = 4007,

    // ==================== 7xxx: Report / Schedule ====================
    /// Dashboard date range is malformed or reversed
    InvalidRange = 7301,
    /// Opening hours could not be parsed
    InvalidSchedule = 7401,

    // ==================== 9xxx: System ====================
    /// Order store could not be reached
    StoreUnavailable = 9002,
    /// Configuration error
    ConfigError = 9005,
    /// Stored data could not be decoded
    StorageCorrupted = 9403,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Transient failures that the next polling tick will retry
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::StoreUnavailable)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidFormat => "Invalid format",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidStatusTransition => "Order status change is not allowed",
            ErrorCode::PartialDeleteFailure => "Order was only partially deleted",
            ErrorCode::OrderEmpty => "Order is empty",

            // Report / Schedule
            ErrorCode::InvalidRange => "Invalid date range",
            ErrorCode::InvalidSchedule => "Invalid opening hours",

            // System
            ErrorCode::StoreUnavailable => "Order store is unavailable",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::StorageCorrupted => "Stored data is corrupted",
        }
    }
}

/// Error returned when converting an unknown u16 into [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),
            6 => Ok(ErrorCode::InvalidFormat),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::InvalidStatusTransition),
            4003 => Ok(ErrorCode::PartialDeleteFailure),
            4007 => Ok(ErrorCode::OrderEmpty),

            7301 => Ok(ErrorCode::InvalidRange),
            7401 => Ok(ErrorCode::InvalidSchedule),

            9002 => Ok(ErrorCode::StoreUnavailable),
            9005 => Ok(ErrorCode::ConfigError),
            9403 => Ok(ErrorCode::StorageCorrupted),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
