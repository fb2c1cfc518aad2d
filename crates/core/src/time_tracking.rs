//! Time entry validation.
//!
//! Durations are whole minutes. A task's `time_spent` is the running sum of
//! its entries' durations; entries are created and deleted together with the
//! matching increment/decrement in one transaction.

use crate::error::CoreError;
use crate::types::Timestamp;

/// A single entry may not exceed one day.
pub const MAX_ENTRY_MINUTES: i32 = 24 * 60;

pub const MAX_ENTRY_DESCRIPTION_LENGTH: usize = 1_000;

pub fn validate_duration(minutes: i32) -> Result<(), CoreError> {
    if minutes <= 0 {
        return Err(CoreError::Validation(
            "Duration must be greater than zero".into(),
        ));
    }
    if minutes > MAX_ENTRY_MINUTES {
        return Err(CoreError::Validation(format!(
            "Duration cannot exceed {MAX_ENTRY_MINUTES} minutes"
        )));
    }
    Ok(())
}

pub fn validate_time_range(
    start: Option<Timestamp>,
    end: Option<Timestamp>,
) -> Result<(), CoreError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(CoreError::Validation(
                "End time cannot be before start time".into(),
            ));
        }
    }
    Ok(())
}

pub fn validate_entry_description(description: &str) -> Result<(), CoreError> {
    if description.chars().count() > MAX_ENTRY_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "Description exceeds maximum length of {MAX_ENTRY_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}
