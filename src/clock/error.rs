//! Clock domain error types
//!
//! Every validation failure in the core surfaces as one of these variants,
//! raised synchronously at the offending call.

use thiserror::Error;

/// Errors raised by the clock synchronization core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// Malformed or out-of-range "HH:MM" string
    #[error("Invalid time format: {0:?}. Expected format: HH:MM")]
    InvalidTimeFormat(String),

    /// Clock id is zero, negative or otherwise not a positive integer
    #[error("Invalid clock ID: {0}. Must be a positive integer")]
    InvalidClockId(i64),

    /// Clock name is empty, whitespace-only or too long
    #[error("Invalid clock name: {0}")]
    InvalidClockName(String),

    /// A clock with this id is already registered
    #[error("Clock with id {0} already exists")]
    DuplicateClockId(u32),

    /// No clock with this id is registered
    #[error("Clock not found: {0}")]
    ClockNotFound(u32),
}

impl ClockError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            ClockError::InvalidTimeFormat(_) => "INVALID_TIME_FORMAT",
            ClockError::InvalidClockId(_) => "INVALID_CLOCK_ID",
            ClockError::InvalidClockName(_) => "INVALID_CLOCK_NAME",
            ClockError::DuplicateClockId(_) => "DUPLICATE_CLOCK_ID",
            ClockError::ClockNotFound(_) => "CLOCK_NOT_FOUND",
        }
    }
}

/// Result type alias for clock operations
pub type ClockResult<T> = Result<T, ClockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClockError::ClockNotFound(7);
        assert_eq!(err.to_string(), "Clock not found: 7");

        let err = ClockError::InvalidTimeFormat("25:00".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid time format: \"25:00\". Expected format: HH:MM"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ClockError::DuplicateClockId(1).code(), "DUPLICATE_CLOCK_ID");
        assert_eq!(ClockError::InvalidClockId(0).code(), "INVALID_CLOCK_ID");
        assert_eq!(
            ClockError::InvalidClockName(String::new()).code(),
            "INVALID_CLOCK_NAME"
        );
    }
}
